//! Semantic component definitions.
//!
//! A semantic component describes props, events and slots independently of
//! any UI toolkit. Adapters map these onto a concrete library.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered prop bag. Iteration follows insertion order.
pub type PropMap = IndexMap<String, Value>;

static PASCAL_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("Invalid PascalCase regex"));

/// Check whether an identifier is PascalCase (e.g. "Button", "DataTable").
pub fn is_pascal_case(name: &str) -> bool {
    PASCAL_CASE_RE.is_match(name)
}

/// A library-agnostic component description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticComponentDefinition {
    /// Component name (PascalCase, e.g. "Button")
    pub name: String,

    /// Grouping used by tooling (e.g. "form", "layout")
    #[serde(default)]
    pub category: String,

    /// Human readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Props in declaration order
    #[serde(default)]
    pub props: Vec<PropDefinition>,

    /// Events the component emits
    #[serde(default)]
    pub events: Vec<EventDefinition>,

    /// Named content slots
    #[serde(default)]
    pub slots: Vec<SlotDefinition>,

    /// Other semantic components this one composes
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// A declared prop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDefinition {
    pub name: String,

    #[serde(rename = "type", default)]
    pub prop_type: PropType,

    #[serde(default)]
    pub required: bool,

    /// Default value used when a request does not override the prop
    #[serde(default)]
    pub default: Option<Value>,

    /// Allowed values, when the prop is an enumeration
    #[serde(rename = "enum", default)]
    pub options: Vec<Value>,
}

/// Declared type of a semantic prop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    Function,
    #[default]
    #[serde(other)]
    Any,
}

impl PropType {
    /// TypeScript spelling of the type.
    pub fn ts_name(self) -> &'static str {
        match self {
            PropType::String => "string",
            PropType::Number => "number",
            PropType::Boolean => "boolean",
            PropType::Array => "unknown[]",
            PropType::Object => "Record<string, unknown>",
            PropType::Function => "(...args: unknown[]) => unknown",
            PropType::Any => "unknown",
        }
    }
}

/// A declared event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub name: String,

    /// Shape of the event payload
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

/// One parameter of an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,

    #[serde(rename = "type", default)]
    pub param_type: PropType,
}

/// A declared slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

impl SemanticComponentDefinition {
    /// Create an empty definition with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            description: None,
            props: Vec::new(),
            events: Vec::new(),
            slots: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Add a prop with an optional default value.
    pub fn with_prop(mut self, name: &str, prop_type: PropType, default: Option<Value>) -> Self {
        self.props.push(PropDefinition {
            name: name.to_string(),
            prop_type,
            required: false,
            default,
            options: Vec::new(),
        });
        self
    }

    /// Add an event without payload parameters.
    pub fn with_event(mut self, name: &str) -> Self {
        self.events.push(EventDefinition {
            name: name.to_string(),
            parameters: Vec::new(),
        });
        self
    }

    /// Add a slot.
    pub fn with_slot(mut self, name: &str) -> Self {
        self.slots.push(SlotDefinition {
            name: name.to_string(),
            description: None,
        });
        self
    }

    /// Declare a dependency on another semantic component.
    pub fn with_dependency(mut self, name: &str) -> Self {
        self.dependencies.push(name.to_string());
        self
    }

    /// Look up a prop by name.
    pub fn prop(&self, name: &str) -> Option<&PropDefinition> {
        self.props.iter().find(|p| p.name == name)
    }

    /// Whether a prop with this name is declared.
    pub fn has_prop(&self, name: &str) -> bool {
        self.prop(name).is_some()
    }

    /// Whether an event with this name is declared.
    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }

    /// Whether a slot with this name is declared.
    pub fn has_slot(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    /// Props that declare a default value, in declaration order.
    pub fn default_props(&self) -> PropMap {
        self.props
            .iter()
            .filter_map(|p| p.default.clone().map(|v| (p.name.clone(), v)))
            .collect()
    }

    /// Event bag: each declared event bound to a handler of the same name.
    pub fn event_bag(&self) -> PropMap {
        self.events
            .iter()
            .map(|e| (e.name.clone(), Value::String(e.name.clone())))
            .collect()
    }

    /// Declared slot names in order.
    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }
}
