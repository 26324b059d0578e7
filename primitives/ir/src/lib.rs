#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Steward Intermediate Representation (IR)
//!
//! This crate defines the service descriptors a client plan is built from.
//! They are the hand-off point from whatever front end resolved the remote
//! interface (its operations, parameters, return types, and which sync and
//! async variants to emit) to the planner, and they serialize as JSON so the
//! two sides can run as separate steps.

pub mod service_ir;

// Re-export the main ServiceIR types for convenience
pub use service_ir::*;
