#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Steward Client Planner
//!
//! Turns service descriptors into client plans: the name of the generated
//! type, the names of the members that drive its cached channel, and for
//! every remote operation the variants to emit and the collision-free local
//! names their bodies use. A plan is pure data and serializes as JSON.
//!
//! All member and local names come from a [`naming::NameTable`] whose root
//! scope reserves every operation name, so generated members never shadow
//! an operation and locals never shadow a parameter.

use thiserror::Error;

pub mod names;
pub mod plan;

pub use names::{derive_client_name, derive_proxy_name, method_name};
pub use plan::{
    ClientPlan, ClientPlanner, InvokeWith, LocalNames, MemberNames, OperationPlan, PlanKind,
    Variant, VariantPlan,
};

/// Errors raised while planning a client
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The service has no interface name to derive type names from
    #[error("Service interface name is empty")]
    EmptyInterfaceName,
    /// Two operations share a name and parameter types
    #[error("Duplicate operation `{operation}` in `{interface}`")]
    DuplicateOperation {
        /// Interface declaring the operation
        interface: String,
        /// Operation name
        operation: String,
    },
    /// An operation would produce no method at all
    #[error("Operation `{operation}` in `{interface}` emits no variant")]
    NoVariants {
        /// Interface declaring the operation
        interface: String,
        /// Operation name
        operation: String,
    },
    /// The configured source interface is not among the descriptors
    #[error("Service `{0}` not found in the service descriptors")]
    ServiceNotFound(String),
}

/// Result type for planning
pub type Result<T> = std::result::Result<T, PlanError>;
