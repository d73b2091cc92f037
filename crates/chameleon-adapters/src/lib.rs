//! Library adapters and the transformation engine.
//!
//! An adapter maps semantic components onto one target UI library. This
//! crate validates adapter definitions, applies their prop, event and slot
//! rules, and manages which adapter is active.

pub mod adapter;
pub mod engine;
pub mod functions;
pub mod migration;
pub mod predicate;
pub mod registry;
pub mod traits;

pub use adapter::{Adapter, AdapterError, AdapterStats};
pub use engine::TransformationEngine;
pub use functions::{
    is_truthy, stringify, to_kebab_case, ComputeFn, CustomContext, CustomFn, FunctionRegistry,
    PredicateFn,
};
pub use migration::{MigrationReport, MIGRATION_THRESHOLD};
pub use registry::{AdapterRegistry, LibrarySwitch, RegistryError};
pub use traits::{
    CollisionWarning, HandlerWrapper, ResolvedEvent, TransformContext, TransformError,
    TransformOutcome,
};
