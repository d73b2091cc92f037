//! Semantic component and adapter definitions.
//!
//! This crate loads library-agnostic component descriptions and the adapter
//! definitions that map them onto concrete UI libraries, and validates both
//! against structural and integrity rules.

pub mod adapter;
pub mod canonical;
pub mod definition;
pub mod graph;
pub mod rule;
pub mod store;
pub mod validate;

pub use adapter::{AdapterDefinition, Compatibility, ComponentMapping, PerformanceHints};
pub use canonical::{canonicalize, to_canonical_string};
pub use definition::{
    is_pascal_case, EventDefinition, ParameterDefinition, PropDefinition, PropMap, PropType,
    SemanticComponentDefinition, SlotDefinition,
};
pub use graph::{CycleError, DependencyGraph, Traversal};
pub use rule::{EventRule, Operator, Predicate, RuleKind, TransformationRule};
pub use store::{parse_document, ConfigError, ConfigurationStore, LoadedConfig};
pub use validate::{
    check_computed_cycles, validate_adapter, validate_component, validate_mapping,
    ValidationReport,
};
