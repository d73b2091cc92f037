//! Structural and integrity validation for definitions.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::adapter::{AdapterDefinition, ComponentMapping};
use crate::definition::{is_pascal_case, SemanticComponentDefinition};
use crate::graph::{CycleError, DependencyGraph};
use crate::rule::{RuleKind, TransformationRule};

/// Outcome of validating a definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Problems that make the definition unusable
    pub errors: Vec<String>,

    /// Problems worth reporting that do not block loading
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no errors were recorded.
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Append another report's findings.
    pub fn merge(&mut self, other: ValidationReport) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Validate a semantic component definition on its own.
pub fn validate_component(def: &SemanticComponentDefinition) -> ValidationReport {
    let mut report = ValidationReport::new();

    if def.name.is_empty() {
        report.error("Component is missing a name");
    } else if !is_pascal_case(&def.name) {
        report.error(format!("Component name '{}' must be PascalCase", def.name));
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for prop in &def.props {
        if prop.name.is_empty() {
            report.error(format!("{}: prop is missing a name", def.name));
            continue;
        }
        *seen.entry(prop.name.as_str()).or_default() += 1;

        if let Some(default) = &prop.default {
            if !prop.options.is_empty() && !prop.options.contains(default) {
                report.error(format!(
                    "{}: default of prop '{}' is not one of its enum options",
                    def.name, prop.name
                ));
            }
        }
        if prop.required && prop.default.is_some() {
            report.warn(format!(
                "{}: required prop '{}' declares a default",
                def.name, prop.name
            ));
        }
    }
    for prop in &def.props {
        if seen.remove(prop.name.as_str()).is_some_and(|count| count > 1) {
            report.error(format!("{}: prop '{}' is declared more than once", def.name, prop.name));
        }
    }

    for dep in &def.dependencies {
        if !is_pascal_case(dep) {
            report.error(format!("{}: dependency '{}' must be PascalCase", def.name, dep));
        }
        if dep == &def.name {
            report.error(format!("{}: component depends on itself", def.name));
        }
    }

    report
}

/// Validate one component mapping of an adapter.
///
/// `semantic` is the matching semantic definition when available; without it
/// the source-existence checks are skipped.
pub fn validate_mapping(
    name: &str,
    mapping: &ComponentMapping,
    semantic: Option<&SemanticComponentDefinition>,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    if !is_pascal_case(name) {
        report.error(format!("Component name '{name}' must be PascalCase"));
    }
    if mapping.target.trim().is_empty() {
        report.error(format!("{name}: missing target component"));
    }
    if mapping.import.as_deref().map_or(true, |i| i.trim().is_empty()) {
        report.error(format!("{name}: missing import statement"));
    }

    let Some(props) = &mapping.props else {
        report.error(format!("{name}: missing props map"));
        return report;
    };

    // Output target -> source prop that claimed it
    let mut targets: HashMap<&str, &str> = HashMap::new();

    for (source, rule) in props {
        if rule.target.trim().is_empty() {
            report.error(format!("{name}: rule for prop '{source}' is missing a target"));
        } else if let Some(previous) = targets.insert(rule.target.as_str(), source.as_str()) {
            if !rule.overwrite {
                report.error(format!(
                    "{name}: props '{previous}' and '{source}' both target '{}'",
                    rule.target
                ));
            }
        }

        if rule.kind == RuleKind::Unknown {
            report.error(format!(
                "{name}: rule for prop '{source}' has an unrecognized transformation type"
            ));
        }

        if let Some(def) = semantic {
            if !def.has_prop(source) {
                report.warn(format!("{name}: source prop '{source}' is not declared"));
            }
            if let RuleKind::Computed { inputs, .. } = &rule.kind {
                for input in inputs {
                    if !def.has_prop(input) {
                        report.warn(format!(
                            "{name}: computed prop '{source}' reads undeclared prop '{input}'"
                        ));
                    }
                }
            }
        }
    }

    if let Err(err) = check_computed_cycles(props) {
        report.error(format!("{name}: {err}"));
    }

    if let Some(def) = semantic {
        for event in mapping.events.keys() {
            if !def.has_event(event) {
                report.warn(format!("{name}: mapped event '{event}' is not declared"));
            }
        }
        for slot in mapping.slots.keys() {
            if !def.has_slot(slot) {
                report.warn(format!("{name}: mapped slot '{slot}' is not declared"));
            }
        }
    }

    report
}

/// Reject computed props whose declared inputs form a cycle.
pub fn check_computed_cycles(props: &IndexMap<String, TransformationRule>) -> Result<(), CycleError> {
    let mut graph = DependencyGraph::new();

    for (source, rule) in props {
        if let RuleKind::Computed { inputs, .. } = &rule.kind {
            graph.add_node(source);
            for input in inputs {
                graph.add_edge(source, input);
            }
        }
    }

    graph.topological_order().map(|_| ())
}

/// Validate an adapter definition and each of its component mappings.
pub fn validate_adapter<F>(def: &AdapterDefinition, semantic: F) -> ValidationReport
where
    F: Fn(&str) -> Option<Arc<SemanticComponentDefinition>>,
{
    let mut report = ValidationReport::new();

    if def.name.trim().is_empty() {
        report.error("Adapter is missing a name");
    }
    if def.version.trim().is_empty() {
        report.error(format!("Adapter '{}' is missing a version", def.name));
    } else if semver::Version::parse(&def.version).is_err() {
        report.error(format!(
            "Adapter '{}' has an invalid version '{}'",
            def.name, def.version
        ));
    }
    for requirement in &def.compatibility.versions {
        if semver::VersionReq::parse(requirement).is_err() {
            report.warn(format!(
                "Adapter '{}' lists an unparseable version requirement '{requirement}'",
                def.name
            ));
        }
    }
    if def.components.is_empty() {
        report.error(format!("Adapter '{}' has no component mappings", def.name));
    }

    for (name, mapping) in &def.components {
        let semantic_def = semantic(name);
        report.merge(validate_mapping(name, mapping, semantic_def.as_deref()));
    }

    report
}
