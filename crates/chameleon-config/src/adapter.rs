//! Adapter definitions as read from configuration.
//!
//! These are plain data. The validated, immutable runtime form lives in the
//! `chameleon-adapters` crate.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rule::{EventRule, TransformationRule};

/// Mapping of semantic components onto one target library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterDefinition {
    /// Library identifier (e.g. "vuetify")
    #[serde(default)]
    pub name: String,

    /// Semantic version of the adapter
    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Imports every generated component needs
    #[serde(default)]
    pub imports: Vec<String>,

    /// Library-wide performance hints
    #[serde(default)]
    pub performance: PerformanceHints,

    /// Supported library versions and features
    #[serde(default)]
    pub compatibility: Compatibility,

    /// Per-component mappings keyed by semantic component name
    #[serde(default, alias = "componentMappings")]
    pub components: IndexMap<String, ComponentMapping>,
}

/// How one semantic component maps onto the target library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentMapping {
    /// Target component or tag name (e.g. "v-btn")
    #[serde(default, alias = "targetComponent")]
    pub target: String,

    /// Import statement for the target component
    #[serde(default, alias = "importStatement")]
    pub import: Option<String>,

    /// Prop rules keyed by semantic prop name
    #[serde(default, alias = "propTransformations")]
    pub props: Option<IndexMap<String, TransformationRule>>,

    /// Event renames keyed by semantic event name
    #[serde(default, alias = "eventMap")]
    pub events: IndexMap<String, EventRule>,

    /// Slot renames keyed by semantic slot name
    #[serde(default, alias = "slotMap")]
    pub slots: IndexMap<String, String>,

    /// Features of the target component
    #[serde(default, alias = "supportedFeatures")]
    pub features: Vec<String>,

    /// Extra modules the target component requires
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Overrides for the library-wide performance hints
    #[serde(default)]
    pub performance: Option<PerformanceHints>,
}

impl ComponentMapping {
    /// Create a mapping with an import and an empty rule set.
    pub fn new(target: &str, import: &str) -> Self {
        Self {
            target: target.to_string(),
            import: Some(import.to_string()),
            props: Some(IndexMap::new()),
            ..Self::default()
        }
    }

    /// Add a prop rule.
    pub fn with_rule(mut self, source: &str, rule: TransformationRule) -> Self {
        self.props
            .get_or_insert_with(IndexMap::new)
            .insert(source.to_string(), rule);
        self
    }

    /// Add an event rename.
    pub fn with_event(mut self, source: &str, rule: EventRule) -> Self {
        self.events.insert(source.to_string(), rule);
        self
    }

    /// Add a slot rename.
    pub fn with_slot(mut self, source: &str, target: &str) -> Self {
        self.slots.insert(source.to_string(), target.to_string());
        self
    }

    /// Prop rule for a semantic prop, if any.
    pub fn rule(&self, prop: &str) -> Option<&TransformationRule> {
        self.props.as_ref().and_then(|p| p.get(prop))
    }
}

/// Hints consumed by the optimization passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceHints {
    /// Import only what each component uses
    #[serde(default)]
    pub tree_shaking: bool,

    /// Load the component lazily
    #[serde(default)]
    pub lazy: bool,

    /// Debounce delays in milliseconds keyed by semantic event name
    #[serde(default)]
    pub debounce: IndexMap<String, u64>,
}

impl PerformanceHints {
    /// Overlay `other` on top of these hints. Flags are OR-ed, debounce
    /// entries from `other` win.
    pub fn merged(&self, other: &PerformanceHints) -> PerformanceHints {
        let mut debounce = self.debounce.clone();
        for (event, delay) in &other.debounce {
            debounce.insert(event.clone(), *delay);
        }

        PerformanceHints {
            tree_shaking: self.tree_shaking || other.tree_shaking,
            lazy: self.lazy || other.lazy,
            debounce,
        }
    }
}

/// Compatibility descriptor of an adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    /// Supported target library versions (semver requirements)
    #[serde(default)]
    pub versions: Vec<String>,

    /// Features the adapter supports
    #[serde(default)]
    pub features: Vec<String>,
}
