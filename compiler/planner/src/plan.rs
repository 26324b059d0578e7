//! Client plans
//!
//! A [`ClientPlan`] describes one generated type. For the `Client` kind this
//! is a wrapper that owns a lifecycle controller and routes every operation
//! through it: synchronous variants through `invoke`, asynchronous ones
//! through `invoke_async`, and cancellable ones through `invoke_cancellable`.
//! The `Proxy` kind is a thin pass-through to the channel with no cached
//! channel of its own.

use std::collections::HashSet;

use config::{GenerationOptions, Visibility};
use ir::{OperationDef, ParamDef, ServiceDef, ServiceIR};
use naming::NameTable;
use serde::{Deserialize, Serialize};

use crate::names::{derive_client_name, derive_proxy_name, method_name};
use crate::{PlanError, Result};

/// Which kind of type a plan describes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Wrapper embedding a cached-channel lifecycle controller
    Client,
    /// Thin proxy over a channel
    Proxy,
}

/// One emitted form of an operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Blocking call
    Sync,
    /// Awaitable call
    Async,
    /// Awaitable call taking a cancellation token
    CancellableAsync,
}

/// Controller operation a client variant is routed through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvokeWith {
    /// `invoke`
    Invoke,
    /// `invoke_async`
    InvokeAsync,
    /// `invoke_cancellable`
    InvokeCancellable,
}

impl Variant {
    /// Whether the variant is awaitable
    pub fn is_async(&self) -> bool { !matches!(self, Variant::Sync) }

    /// The controller operation wrapping this variant in a client
    pub fn invoke_with(&self) -> InvokeWith {
        match self {
            Variant::Sync => InvokeWith::Invoke,
            Variant::Async => InvokeWith::InvokeAsync,
            Variant::CancellableAsync => InvokeWith::InvokeCancellable,
        }
    }
}

/// Names of the members a client uses to manage its cached channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemberNames {
    /// Field holding the cached channel
    pub cached_proxy_field: String,
    /// Field holding the channel factory
    pub proxy_factory_field: String,
    /// Acquire
    pub get_proxy: String,
    /// AcquireAsync
    pub get_proxy_async: String,
    /// Public acquire that discards the channel
    pub ensure_proxy: String,
    /// Asynchronous form of `ensure_proxy`
    pub ensure_proxy_async: String,
    /// Shutdown
    pub close_proxy: String,
    /// Asynchronous shutdown
    pub close_proxy_async: String,
}

/// Local names used inside the body of one operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalNames {
    /// Variable holding the acquired channel
    pub proxy: String,
    /// Parameter carrying the cancellation token
    pub cancellation_token: String,
    /// Variable holding the cancellation registration
    pub state: String,
}

/// A single method to emit for an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantPlan {
    /// Emitted form
    pub variant: Variant,
    /// Name of the emitted method
    pub method_name: String,
    /// Set for client plans only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoke_with: Option<InvokeWith>,
}

/// Everything emitted for one remote operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationPlan {
    /// Operation name
    pub name: String,
    /// Parameters, passed through unchanged
    pub params: Vec<ParamDef>,
    /// Return type; `None` for operations returning nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Methods to emit, sync first
    pub variants: Vec<VariantPlan>,
    /// Set for client plans only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locals: Option<LocalNames>,
}

impl OperationPlan {
    /// Get the plan of a variant, if it is emitted
    pub fn variant(&self, variant: Variant) -> Option<&VariantPlan> {
        self.variants.iter().find(|v| v.variant == variant)
    }
}

/// Plan for one generated type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientPlan {
    /// Interface the type is generated for
    pub interface_name: String,
    /// Interface name including its namespace
    pub qualified_interface_name: String,
    /// Client wrapper or thin proxy
    pub kind: PlanKind,
    /// Name of the generated type
    pub type_name: String,
    /// Accessibility of generated constructors
    pub constructor_visibility: Visibility,
    /// Whether "generated code" warning comments are emitted
    pub warning_comments: bool,
    /// Set for client plans only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<MemberNames>,
    /// Operations in declaration order
    pub operations: Vec<OperationPlan>,
}

impl ClientPlan {
    /// Get the plan of an operation by name
    pub fn operation(&self, name: &str) -> Option<&OperationPlan> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Total number of methods the plan emits for operations
    pub fn method_count(&self) -> usize { self.operations.iter().map(|op| op.variants.len()).sum() }
}

/// Builds client plans from service descriptors
#[derive(Debug, Clone, Default)]
pub struct ClientPlanner {
    options: GenerationOptions,
}

impl ClientPlanner {
    /// Create a planner with the given generation options
    pub fn new(options: GenerationOptions) -> Self { Self { options } }

    /// Get the generation options
    pub fn options(&self) -> &GenerationOptions { &self.options }

    /// Plan every selected service in `ir`.
    ///
    /// With `source_interface_name` set only that service is planned
    /// (matched by interface name or qualified name). The `client_name`
    /// override applies when exactly one service is planned.
    pub fn plan(&self, ir: &ServiceIR) -> Result<Vec<ClientPlan>> {
        let selected: Vec<&ServiceDef> = match &self.options.source_interface_name {
            Some(wanted) => {
                let service = ir
                    .services()
                    .iter()
                    .find(|s| &s.interface_name == wanted || &s.qualified_name() == wanted)
                    .ok_or_else(|| PlanError::ServiceNotFound(wanted.clone()))?;
                vec![service]
            }
            None => ir.services().iter().collect(),
        };

        let override_name = if selected.len() == 1 { self.options.client_name.as_deref() } else { None };
        selected.into_iter().map(|service| self.plan_service_named(service, override_name)).collect()
    }

    /// Plan a single service, honouring the `client_name` override.
    pub fn plan_service(&self, service: &ServiceDef) -> Result<ClientPlan> {
        self.plan_service_named(service, self.options.client_name.as_deref())
    }

    fn plan_service_named(&self, service: &ServiceDef, type_name: Option<&str>) -> Result<ClientPlan> {
        if service.interface_name.trim().is_empty() {
            return Err(PlanError::EmptyInterfaceName);
        }
        check_duplicates(service)?;

        let kind = if self.options.wrapper { PlanKind::Client } else { PlanKind::Proxy };
        let type_name = match (type_name, kind) {
            (Some(name), _) => name.to_string(),
            (None, PlanKind::Client) => derive_client_name(&service.interface_name),
            (None, PlanKind::Proxy) => derive_proxy_name(&service.interface_name),
        };

        let mut table = NameTable::new(reserved_member_names(service, &type_name));
        let members = match kind {
            PlanKind::Client => Some(allocate_members(&mut table)),
            PlanKind::Proxy => None,
        };

        let operations = service
            .operations
            .iter()
            .map(|op| self.plan_operation(service, op, kind, &mut table))
            .collect::<Result<Vec<_>>>()?;

        logging::trace(
            "PLANNER",
            &format!(
                "Planned {:?} `{}` for `{}` with {} operations",
                kind,
                type_name,
                service.interface_name,
                operations.len()
            ),
        );

        Ok(ClientPlan {
            interface_name: service.interface_name.clone(),
            qualified_interface_name: service.qualified_name(),
            kind,
            type_name,
            constructor_visibility: self.options.constructor_visibility,
            warning_comments: !self.options.suppress_warning_comments,
            members,
            operations,
        })
    }

    fn plan_operation(
        &self,
        service: &ServiceDef,
        op: &OperationDef,
        kind: PlanKind,
        table: &mut NameTable,
    ) -> Result<OperationPlan> {
        let variants: Vec<VariantPlan> = self
            .variants_for(op, kind)
            .into_iter()
            .map(|variant| VariantPlan {
                variant,
                method_name: method_name(&op.name, variant.is_async()),
                invoke_with: (kind == PlanKind::Client).then(|| variant.invoke_with()),
            })
            .collect();

        if variants.is_empty() {
            return Err(PlanError::NoVariants {
                interface: service.interface_name.clone(),
                operation: op.name.clone(),
            });
        }

        let locals = (kind == PlanKind::Client).then(|| {
            let mut scope = table.enter_scope(op.param_names());
            LocalNames {
                proxy: scope.allocate("proxy"),
                cancellation_token: scope.allocate("cancellationToken"),
                state: scope.allocate("s"),
            }
        });

        Ok(OperationPlan {
            name: op.name.clone(),
            params: op.params.clone(),
            return_type: if op.is_void() { None } else { op.return_type.clone() },
            variants,
            locals,
        })
    }

    fn variants_for(&self, op: &OperationDef, kind: PlanKind) -> Vec<Variant> {
        let emit_async = op.emit_async && !self.options.suppress_async_methods;
        let mut variants = Vec::with_capacity(3);
        if op.emit_sync {
            variants.push(Variant::Sync);
        }
        if emit_async {
            variants.push(Variant::Async);
            if kind == PlanKind::Client && self.options.include_cancellable_async {
                variants.push(Variant::CancellableAsync);
            }
        }
        variants
    }
}

/// Names a generated member must not take: the type itself and every
/// method emitted for an operation.
fn reserved_member_names(service: &ServiceDef, type_name: &str) -> Vec<String> {
    let mut names = vec![type_name.to_string()];
    for op in &service.operations {
        names.push(method_name(&op.name, false));
        names.push(method_name(&op.name, true));
    }
    names
}

fn allocate_members(table: &mut NameTable) -> MemberNames {
    MemberNames {
        close_proxy: table.allocate("CloseProxy"),
        close_proxy_async: table.allocate("CloseProxyAsync"),
        get_proxy_async: table.allocate("GetProxyAsync"),
        get_proxy: table.allocate("GetProxy"),
        ensure_proxy: table.allocate("EnsureProxy"),
        ensure_proxy_async: table.allocate("EnsureProxyAsync"),
        cached_proxy_field: table.allocate("m_cachedProxy"),
        proxy_factory_field: table.allocate("m_proxyFactory"),
    }
}

fn check_duplicates(service: &ServiceDef) -> Result<()> {
    let mut seen = HashSet::new();
    for op in &service.operations {
        if !seen.insert(op.signature()) {
            return Err(PlanError::DuplicateOperation {
                interface: service.interface_name.clone(),
                operation: op.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(ops: Vec<OperationDef>) -> ServiceDef { ServiceDef::new("IOrderService", ops) }

    #[test]
    fn test_variants_follow_options() {
        let op = OperationDef::new("GetOrder", vec![], Some("Order"));

        let planner = ClientPlanner::default();
        assert_eq!(
            planner.variants_for(&op, PlanKind::Client),
            vec![Variant::Sync, Variant::Async, Variant::CancellableAsync]
        );
        assert_eq!(planner.variants_for(&op, PlanKind::Proxy), vec![Variant::Sync, Variant::Async]);

        let planner = ClientPlanner::new(GenerationOptions {
            suppress_async_methods: true,
            ..Default::default()
        });
        assert_eq!(planner.variants_for(&op, PlanKind::Client), vec![Variant::Sync]);

        let planner = ClientPlanner::new(GenerationOptions {
            include_cancellable_async: false,
            ..Default::default()
        });
        assert_eq!(planner.variants_for(&op, PlanKind::Client), vec![Variant::Sync, Variant::Async]);
    }

    #[test]
    fn test_duplicate_signatures_are_rejected() {
        let int_param = || vec![ParamDef::new("id", "int")];
        let overloads = service(vec![
            OperationDef::new("Get", int_param(), None),
            OperationDef::new("Get", vec![ParamDef::new("name", "string")], None),
        ]);
        assert!(check_duplicates(&overloads).is_ok());

        let clash = service(vec![
            OperationDef::new("Get", int_param(), None),
            OperationDef::new("Get", vec![ParamDef::new("other", "int")], None),
        ]);
        assert_eq!(
            check_duplicates(&clash),
            Err(PlanError::DuplicateOperation {
                interface: "IOrderService".to_string(),
                operation: "Get".to_string(),
            })
        );
    }

    #[test]
    fn test_reserved_member_names_include_async_forms() {
        let names = reserved_member_names(&service(vec![OperationDef::new("Ping", vec![], None)]), "X");
        assert_eq!(names, vec!["X", "Ping", "PingAsync"]);
    }
}
