//! Optimization passes over a transformed component.

use chameleon_adapters::{HandlerWrapper, ResolvedEvent};
use chameleon_config::{PerformanceHints, PropMap};
use indexmap::IndexMap;
use serde_json::Value;

use crate::artifact::PropPartition;

pub const DEAD_PROPS: &str = "dead-prop-elimination";
pub const PARTITION: &str = "prop-partition";
pub const IMPORTS: &str = "import-filtering";
pub const DEBOUNCE: &str = "event-debounce";

/// Drop props whose value is null. Returns how many were removed.
pub fn eliminate_dead_props(props: &mut PropMap) -> usize {
    let before = props.len();
    props.retain(|_, v| !v.is_null());
    before - props.len()
}

/// Split props into literal scalars and values that need binding.
pub fn partition_props(props: &PropMap) -> PropPartition {
    let mut partition = PropPartition::default();
    for (name, value) in props {
        match value {
            Value::Array(_) | Value::Object(_) => {
                partition.dynamic_props.insert(name.clone(), value.clone());
            }
            _ => {
                partition.static_props.insert(name.clone(), value.clone());
            }
        }
    }
    partition
}

/// Trim imports, drop empty ones and duplicates, and sort.
pub fn filter_imports(imports: Vec<String>) -> Vec<String> {
    let mut imports: Vec<String> = imports
        .into_iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    imports.sort();
    imports.dedup();
    imports
}

/// Debounce events named in the performance hints.
///
/// Hints may name either the semantic or the target event. Events already
/// debounced by their mapping are left alone. Returns how many were wrapped.
pub fn apply_debounce(events: &mut IndexMap<String, ResolvedEvent>, hints: &PerformanceHints) -> usize {
    let mut wrapped = 0;
    for (target, event) in events.iter_mut() {
        if event.is_debounced() {
            continue;
        }
        let delay = hints
            .debounce
            .get(target)
            .or_else(|| hints.debounce.get(&event.source));
        if let Some(&delay_ms) = delay {
            event.wrappers.push(HandlerWrapper::Debounce { delay_ms });
            wrapped += 1;
        }
    }
    wrapped
}
