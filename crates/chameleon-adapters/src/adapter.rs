//! Validated adapters.
//!
//! An [`Adapter`] wraps an [`AdapterDefinition`] that passed validation and
//! whose rules only reference registered functions. Construction is the only
//! way to get one, so a partially valid adapter is never observable.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chameleon_config::{
    to_canonical_string, validate_adapter, AdapterDefinition, ComponentMapping, PerformanceHints,
    PropMap, SemanticComponentDefinition,
};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::engine::TransformationEngine;
use crate::functions::FunctionRegistry;
use crate::traits::{ResolvedEvent, TransformContext, TransformError, TransformOutcome};

/// Errors raised by an adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    #[error("Invalid adapter '{adapter}': {}", .errors.join("; "))]
    ConfigInvalid { adapter: String, errors: Vec<String> },

    #[error("Component '{component}' is not supported by adapter '{adapter}'")]
    ComponentNotSupported { adapter: String, component: String },

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Call counters for an adapter instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterStats {
    /// Prop transformations actually evaluated
    pub prop_transforms: usize,

    /// Event transformations evaluated
    pub event_transforms: usize,

    /// Prop transformations answered from the memo
    pub memo_hits: usize,
}

/// A validated adapter with its transformation engine.
#[derive(Debug)]
pub struct Adapter {
    def: AdapterDefinition,
    engine: TransformationEngine,

    /// Memoized prop transformations by (component, canonical props, strict)
    memo: Mutex<HashMap<String, TransformOutcome>>,

    /// Reload generation this instance was built for
    epoch: u64,

    prop_transforms: AtomicUsize,
    event_transforms: AtomicUsize,
    memo_hits: AtomicUsize,
}

impl Adapter {
    /// Validate a definition and build an adapter from it.
    pub fn new(def: AdapterDefinition, functions: Arc<FunctionRegistry>) -> Result<Self, AdapterError> {
        Self::with_components(def, functions, |_| None)
    }

    /// Like [`Adapter::new`], also checking mappings against semantic components.
    ///
    /// `semantic` resolves a component name to its definition; components it
    /// cannot resolve skip the source-existence checks.
    pub fn with_components<F>(
        def: AdapterDefinition,
        functions: Arc<FunctionRegistry>,
        semantic: F,
    ) -> Result<Self, AdapterError>
    where
        F: Fn(&str) -> Option<Arc<SemanticComponentDefinition>>,
    {
        let report = validate_adapter(&def, semantic);
        let mut errors = report.errors;

        for (component, mapping) in &def.components {
            for (prop, rule) in mapping.props.iter().flatten() {
                if let Some(function) = functions.unresolved(&rule.kind) {
                    errors.push(format!(
                        "{component}.{prop} references unregistered function '{function}'"
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(AdapterError::ConfigInvalid {
                adapter: def.name.clone(),
                errors,
            });
        }

        for warning in &report.warnings {
            tracing::warn!(adapter = %def.name, "{}", warning);
        }

        Ok(Self {
            def,
            engine: TransformationEngine::new(functions),
            memo: Mutex::new(HashMap::new()),
            epoch: 0,
            prop_transforms: AtomicUsize::new(0),
            event_transforms: AtomicUsize::new(0),
            memo_hits: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn version(&self) -> &str {
        &self.def.version
    }

    /// Reload generation of this instance; zero for a first load.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn definition(&self) -> &AdapterDefinition {
        &self.def
    }

    /// Mapping for a semantic component.
    pub fn get_component_mapping(&self, component: &str) -> Result<&ComponentMapping, AdapterError> {
        self.def
            .components
            .get(component)
            .ok_or_else(|| AdapterError::ComponentNotSupported {
                adapter: self.def.name.clone(),
                component: component.to_string(),
            })
    }

    pub fn is_component_supported(&self, component: &str) -> bool {
        self.def.components.contains_key(component)
    }

    /// Supported semantic components in declaration order.
    pub fn supported_components(&self) -> Vec<&str> {
        self.def.components.keys().map(String::as_str).collect()
    }

    /// Transform a semantic prop bag for `component`.
    ///
    /// Results are memoized per adapter instance, keyed by the props in their
    /// given order; a reloaded adapter starts with an empty memo.
    pub fn transform_props(
        &self,
        component: &str,
        props: &PropMap,
        strict: bool,
    ) -> Result<TransformOutcome, AdapterError> {
        let mapping = self.get_component_mapping(component)?;

        // Insertion order decides collision winners, so it is part of the key.
        let entries: Vec<(&String, &Value)> = props.iter().collect();
        let key = to_canonical_string(&entries)
            .ok()
            .map(|canonical| format!("{component}\u{0}{canonical}\u{0}{strict}"));

        if let Some(key) = &key {
            if let Some(hit) = self.memo.lock().get(key) {
                self.memo_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(adapter = %self.def.name, component = %component, "Prop transform memo hit");
                return Ok(hit.clone());
            }
        }

        let ctx = TransformContext {
            component,
            adapter: &self.def,
            strict,
        };
        self.prop_transforms.fetch_add(1, Ordering::Relaxed);
        let outcome = self.engine.transform_props(&ctx, mapping, props)?;

        if let Some(key) = key {
            self.memo.lock().insert(key, outcome.clone());
        }

        Ok(outcome)
    }

    /// Rename events and attach configured handler wrappers.
    pub fn transform_events(
        &self,
        component: &str,
        events: &PropMap,
    ) -> Result<IndexMap<String, ResolvedEvent>, AdapterError> {
        let mapping = self.get_component_mapping(component)?;
        self.event_transforms.fetch_add(1, Ordering::Relaxed);
        Ok(self.engine.transform_events(mapping, events))
    }

    /// Rename slots; the result maps target slot names to semantic ones.
    pub fn transform_slots(
        &self,
        component: &str,
        slots: &[String],
    ) -> Result<IndexMap<String, String>, AdapterError> {
        let mapping = self.get_component_mapping(component)?;
        Ok(self.engine.transform_slots(mapping, slots))
    }

    /// Global and component imports, trimmed, de-duplicated and sorted.
    pub fn get_required_imports(&self, component: &str) -> Result<Vec<String>, AdapterError> {
        let mapping = self.get_component_mapping(component)?;

        let imports: BTreeSet<String> = self
            .def
            .imports
            .iter()
            .chain(mapping.import.iter())
            .chain(mapping.dependencies.iter())
            .map(|i| i.trim())
            .filter(|i| !i.is_empty())
            .map(String::from)
            .collect();

        Ok(imports.into_iter().collect())
    }

    /// Global performance hints merged with the component's own.
    pub fn get_performance_hints(&self, component: &str) -> Result<PerformanceHints, AdapterError> {
        let mapping = self.get_component_mapping(component)?;
        Ok(match &mapping.performance {
            Some(own) => self.def.performance.merged(own),
            None => self.def.performance.clone(),
        })
    }

    /// Features this adapter offers: compatibility features plus every
    /// component's supported features.
    pub fn features(&self) -> BTreeSet<String> {
        self.def
            .compatibility
            .features
            .iter()
            .chain(self.def.components.values().flat_map(|m| m.features.iter()))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> AdapterStats {
        AdapterStats {
            prop_transforms: self.prop_transforms.load(Ordering::Relaxed),
            event_transforms: self.event_transforms.load(Ordering::Relaxed),
            memo_hits: self.memo_hits.load(Ordering::Relaxed),
        }
    }
}
