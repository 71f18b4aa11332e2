//! # sqlwright core
//!
//! Domain types, the dialect / error-category classifier, the backend trait
//! and the error taxonomy shared by every other sqlwright crate.
//! This crate performs **no I/O**: it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait or a closed enum defined here. Implementations live
//! in their respective crates. This enables:
//! - Swapping text-generation backends via configuration
//! - Easy testing with fake backends
//! - Clean dependency graph (all crates depend inward on core)

pub mod dialect;
pub mod error;
pub mod provider;
pub mod request;

// Re-export key types at crate root for ergonomics
pub use dialect::{Dialect, ErrorCategory, classify_dialect, classify_error_category, dialect_from_context};
pub use error::{Error, ErrorKind, ErrorReport, ProviderError, Result};
pub use provider::{
    Backend, BackendRequest, BackendResponse, Capabilities, Capability, HealthState, HealthStatus,
};
pub use request::{GenerationRequest, GenerationResult, RequestKind};
