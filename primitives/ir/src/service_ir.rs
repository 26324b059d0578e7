//! Steward service descriptors
//!
//! A [`ServiceIR`] holds one or more remote service interfaces, each a list
//! of operations with their parameters, return type and the variants a
//! generated client must expose.

use serde::{Deserialize, Serialize};

fn default_true() -> bool { true }

/// The Steward IR - every service interface a generation run covers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceIR {
    /// Steward IR format version (e.g., "0.1.0")
    version: String,
    /// Service interfaces
    services: Vec<ServiceDef>,
}

/// A remote service interface
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ServiceDef {
    /// Interface name as declared (e.g., "IOrderService")
    pub interface_name: String,
    /// Enclosing namespace, if the interface is not declared at the top level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Interface description
    #[serde(default)]
    pub description: String,
    /// Remote operations, in declaration order
    #[serde(default)]
    pub operations: Vec<OperationDef>,
}

/// A remote operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationDef {
    /// Operation name without any async suffix (e.g., "GetOrder")
    pub name: String,
    /// Operation description
    #[serde(default)]
    pub description: String,
    /// Operation parameters
    #[serde(default)]
    pub params: Vec<ParamDef>,
    /// Return type name; `None` for operations that return nothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    /// Whether a synchronous variant must be emitted
    #[serde(default = "default_true")]
    pub emit_sync: bool,
    /// Whether an asynchronous variant must be emitted
    #[serde(default = "default_true")]
    pub emit_async: bool,
}

/// An operation parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParamDef {
    /// Parameter name
    pub name: String,
    /// Parameter type name
    pub type_name: String,
}

impl ServiceIR {
    /// Create a new Service IR with the default Steward IR version
    pub fn new(services: Vec<ServiceDef>) -> Self {
        Self::new_with_version("0.1.0".to_string(), services)
    }

    /// Create a new Service IR with a specific IR version
    pub fn new_with_version(version: String, services: Vec<ServiceDef>) -> Self {
        Self { version, services }
    }

    /// Load ServiceIR from a JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let ir: Self = serde_json::from_str(&content)?;
        Ok(ir)
    }

    /// Save ServiceIR to a JSON file with pretty formatting
    pub fn to_file(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        // Ensure file ends with a newline (POSIX standard)
        use std::io::Write;
        writeln!(file)?;
        Ok(())
    }

    /// Get the IR format version
    pub fn version(&self) -> &str { &self.version }

    /// Get all services
    pub fn services(&self) -> &[ServiceDef] { &self.services }

    /// Get a service by interface name
    pub fn get_service(&self, interface_name: &str) -> Option<&ServiceDef> {
        self.services.iter().find(|s| s.interface_name == interface_name)
    }

    /// Get the total number of operations across all services
    pub fn operation_count(&self) -> usize { self.services.iter().map(|s| s.operations.len()).sum() }
}

impl ServiceDef {
    /// Create a new service with no namespace and no description
    pub fn new(interface_name: impl Into<String>, operations: Vec<OperationDef>) -> Self {
        Self { interface_name: interface_name.into(), operations, ..Default::default() }
    }

    /// Get an operation by name
    pub fn operation(&self, name: &str) -> Option<&OperationDef> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Names of all operations, in declaration order
    pub fn operation_names(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.name.as_str()).collect()
    }

    /// Fully qualified interface name
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns, self.interface_name),
            _ => self.interface_name.clone(),
        }
    }
}

impl OperationDef {
    /// Create an operation emitting both sync and async variants
    pub fn new(name: impl Into<String>, params: Vec<ParamDef>, return_type: Option<&str>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            params,
            return_type: return_type.map(str::to_string),
            emit_sync: true,
            emit_async: true,
        }
    }

    /// Check if this operation returns nothing
    pub fn is_void(&self) -> bool {
        self.return_type.as_deref().map_or(true, |t| t.is_empty() || t == "void")
    }

    /// Parameter names, in declaration order
    pub fn param_names(&self) -> Vec<&str> { self.params.iter().map(|p| p.name.as_str()).collect() }

    /// Signature used to detect overload clashes: name and parameter types
    pub fn signature(&self) -> (String, Vec<String>) {
        (self.name.clone(), self.params.iter().map(|p| p.type_name.clone()).collect())
    }
}

impl ParamDef {
    /// Create a new parameter
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self { name: name.into(), type_name: type_name.into() }
    }
}
