//! Generation contexts and dependency resolution.
//!
//! A context aggregates the fields a test-data task needs, the results
//! generated for them and the dependency edges between them. The store keeps
//! contexts in concurrent maps, resolves dependencies in a deterministic
//! order and scores context readiness.

pub mod errors;
pub mod model;
pub mod resolve;
pub mod store;

pub use errors::{ContextError, Result};
pub use model::{ContextExport, ContextStatus, ContextValidationResult, GenerationContext};
pub use resolve::{build_dependency_context, is_dependency_satisfied, validation_score};
pub use store::ContextStore;
