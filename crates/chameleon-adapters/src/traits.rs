//! Shared types for the transformation engine.

use std::fmt;

use chameleon_config::{AdapterDefinition, PropMap};
use serde::Serialize;
use serde_json::Value;

/// Context for transforming one component.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Semantic component name (e.g. "Button")
    pub component: &'a str,

    /// Adapter the rules belong to
    pub adapter: &'a AdapterDefinition,

    /// Report output collisions as warnings
    pub strict: bool,
}

/// Result of transforming a prop bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransformOutcome {
    /// Target props in output order
    pub props: PropMap,

    /// Collisions seen while merging (strict mode only)
    pub warnings: Vec<CollisionWarning>,
}

/// Two rules wrote the same output prop; the later one won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionWarning {
    pub component: String,

    /// Output prop written twice
    pub target: String,

    /// Semantic prop whose output was overwritten
    pub overwritten: String,

    /// Semantic prop whose output was kept
    pub winner: String,
}

impl fmt::Display for CollisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: '{}' from prop '{}' overwrote the value from prop '{}'",
            self.component, self.target, self.winner, self.overwritten
        )
    }
}

/// A target event binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEvent {
    /// Semantic event name
    pub source: String,

    /// Handler reference
    pub handler: Value,

    /// Wrappers applied around the handler, innermost first
    pub wrappers: Vec<HandlerWrapper>,
}

impl ResolvedEvent {
    /// Whether the handler is already debounced.
    pub fn is_debounced(&self) -> bool {
        self.wrappers
            .iter()
            .any(|w| matches!(w, HandlerWrapper::Debounce { .. }))
    }
}

/// Transform applied around an event handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HandlerWrapper {
    /// Delay the handler until events stop for `delay_ms`
    Debounce {
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },
}

/// Errors that can occur during transformation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error("Unknown transformation type for {component}.{prop}")]
    UnknownTransformationType { component: String, prop: String },

    #[error("Missing computation input for {component}.{prop}: {reason}")]
    MissingComputationInput {
        component: String,
        prop: String,
        reason: String,
    },

    #[error("Function '{function}' used by {component}.{prop} is not registered")]
    UnregisteredFunction {
        component: String,
        prop: String,
        function: String,
    },
}
