//! Transformation rule declarations.
//!
//! Rules are a closed set of variants. Anything that needs code (computed
//! values, custom transforms, predicate functions) refers to a function
//! registered by id, so configuration files never carry executable code.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A rule converting one semantic prop into one or more target props.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationRule {
    /// Output prop name for scalar results
    #[serde(default)]
    pub target: String,

    /// Acknowledges that this rule may overwrite another rule's target
    #[serde(default)]
    pub overwrite: bool,

    #[serde(flatten)]
    pub kind: RuleKind,
}

/// Rule strategy, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RuleKind {
    /// Pass the value through
    Direct,

    /// Look the value up in a table
    Mapping {
        #[serde(default, deserialize_with = "scalar_keyed")]
        table: IndexMap<String, Value>,
        #[serde(default)]
        default: Option<Value>,
    },

    /// Choose between two values
    Conditional {
        predicate: Predicate,
        #[serde(rename = "trueValue", default)]
        true_value: Value,
        #[serde(rename = "falseValue", default)]
        false_value: Value,
    },

    /// Pure registered function over the value and its siblings
    #[serde(alias = "value", alias = "multi-prop")]
    Computed {
        function: String,
        /// Sibling props the function reads
        #[serde(default)]
        inputs: Vec<String>,
    },

    /// Unrestricted registered function
    #[serde(alias = "library-specific")]
    Custom { function: String },

    /// Any type tag this version does not understand
    #[serde(other)]
    Unknown,
}

/// Table keys may be bare YAML booleans or numbers; they are stored by their
/// JSON text, which is how non-string values are looked up.
fn scalar_keyed<'de, D>(deserializer: D) -> Result<IndexMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let table: IndexMap<TableKey, Value> = IndexMap::deserialize(deserializer)?;
    Ok(table.into_iter().map(|(key, value)| (key.0, value)).collect())
}

#[derive(PartialEq, Eq, Hash)]
struct TableKey(String);

impl<'de> Deserialize<'de> for TableKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = TableKey;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, number or boolean key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TableKey, E> {
                Ok(TableKey(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<TableKey, E> {
                Ok(TableKey(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<TableKey, E> {
                Ok(TableKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TableKey, E> {
                Ok(TableKey(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TableKey, E> {
                Ok(TableKey(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<TableKey, E> {
                serde_json::Number::from_f64(v)
                    .map(|n| TableKey(n.to_string()))
                    .ok_or_else(|| E::custom(format!("mapping key {v} is not a finite number")))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}

impl RuleKind {
    /// The `type` tag of this rule.
    pub fn type_name(&self) -> &'static str {
        match self {
            RuleKind::Direct => "direct",
            RuleKind::Mapping { .. } => "mapping",
            RuleKind::Conditional { .. } => "conditional",
            RuleKind::Computed { .. } => "computed",
            RuleKind::Custom { .. } => "custom",
            RuleKind::Unknown => "unknown",
        }
    }
}

impl TransformationRule {
    /// Direct passthrough renamed to `target`.
    pub fn direct(target: &str) -> Self {
        Self {
            target: target.to_string(),
            overwrite: false,
            kind: RuleKind::Direct,
        }
    }

    /// Table lookup with an optional fallback.
    pub fn mapping(target: &str, table: &[(&str, Value)], default: Option<Value>) -> Self {
        Self {
            target: target.to_string(),
            overwrite: false,
            kind: RuleKind::Mapping {
                table: table
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
                default,
            },
        }
    }

    /// Conditional choice between two values.
    pub fn conditional(target: &str, predicate: Predicate, true_value: Value, false_value: Value) -> Self {
        Self {
            target: target.to_string(),
            overwrite: false,
            kind: RuleKind::Conditional {
                predicate,
                true_value,
                false_value,
            },
        }
    }

    /// Computed value from a registered function.
    pub fn computed(target: &str, function: &str, inputs: &[&str]) -> Self {
        Self {
            target: target.to_string(),
            overwrite: false,
            kind: RuleKind::Computed {
                function: function.to_string(),
                inputs: inputs.iter().map(|s| (*s).to_string()).collect(),
            },
        }
    }

    /// Custom transform from a registered function.
    pub fn custom(target: &str, function: &str) -> Self {
        Self {
            target: target.to_string(),
            overwrite: false,
            kind: RuleKind::Custom {
                function: function.to_string(),
            },
        }
    }

    /// Mark this rule as allowed to overwrite an earlier rule's target.
    pub fn overwriting(mut self) -> Self {
        self.overwrite = true;
        self
    }
}

/// Predicate of a conditional rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    /// Registered predicate function
    Registered { function: String },

    /// Declarative comparison. `prop` defaults to the rule's own value.
    Compare {
        #[serde(default)]
        prop: Option<String>,
        operator: Operator,
        #[serde(default)]
        value: Value,
    },
}

impl Predicate {
    /// Compare the rule's own value against `value`.
    pub fn compare(operator: Operator, value: Value) -> Self {
        Predicate::Compare {
            prop: None,
            operator,
            value,
        }
    }
}

/// Comparison operators for declarative predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!==")]
    StrictNe,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "includes")]
    Includes,
    #[serde(rename = "startsWith")]
    StartsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
}

/// Event mapping: a plain rename or a rename with a handler wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventRule {
    Rename(String),
    Detailed {
        target: String,
        /// Debounce delay in milliseconds
        #[serde(default)]
        debounce: Option<u64>,
    },
}

impl EventRule {
    /// Target event name.
    pub fn target(&self) -> &str {
        match self {
            EventRule::Rename(target) => target,
            EventRule::Detailed { target, .. } => target,
        }
    }

    /// Configured debounce delay, if any.
    pub fn debounce(&self) -> Option<u64> {
        match self {
            EventRule::Rename(_) => None,
            EventRule::Detailed { debounce, .. } => *debounce,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mapping_rule() {
        let rule: TransformationRule = serde_yaml::from_str(
            "type: mapping\ntarget: severity\ntable:\n  primary: primary\n  secondary: outlined\n",
        )
        .unwrap();

        assert_eq!(rule.target, "severity");
        match rule.kind {
            RuleKind::Mapping { table, default } => {
                assert_eq!(table.get("secondary"), Some(&json!("outlined")));
                assert!(default.is_none());
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn parses_scalar_table_keys() {
        let rule: TransformationRule =
            serde_yaml::from_str("type: mapping\ntarget: variant\ntable:\n  true: elevated\n  1: small\n  md: medium\n")
                .unwrap();

        match rule.kind {
            RuleKind::Mapping { table, .. } => {
                assert_eq!(table.get("true"), Some(&json!("elevated")));
                assert_eq!(table.get("1"), Some(&json!("small")));
                assert_eq!(table.get("md"), Some(&json!("medium")));
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn parses_conditional_with_declarative_predicate() {
        let rule: TransformationRule = serde_json::from_value(json!({
            "type": "conditional",
            "target": "icon",
            "predicate": {"operator": "===", "value": "right"},
            "trueValue": {"appendIcon": "X"},
            "falseValue": {"prependIcon": "X"}
        }))
        .unwrap();

        match rule.kind {
            RuleKind::Conditional { predicate, .. } => {
                assert_eq!(predicate, Predicate::compare(Operator::StrictEq, json!("right")));
            }
            other => panic!("unexpected rule {other:?}"),
        }
    }

    #[test]
    fn parses_registered_predicate() {
        let predicate: Predicate = serde_json::from_value(json!({"function": "is-dense"})).unwrap();

        assert_eq!(
            predicate,
            Predicate::Registered {
                function: "is-dense".to_string()
            }
        );
    }

    #[test]
    fn accepts_type_aliases() {
        let rule: TransformationRule =
            serde_json::from_value(json!({"type": "multi-prop", "target": "icon", "function": "icon-placement"}))
                .unwrap();
        assert_eq!(rule.kind.type_name(), "computed");

        let rule: TransformationRule =
            serde_json::from_value(json!({"type": "library-specific", "target": "class", "function": "scoped-class"}))
                .unwrap();
        assert_eq!(rule.kind.type_name(), "custom");
    }

    #[test]
    fn unknown_type_is_preserved_as_unknown() {
        let rule: TransformationRule =
            serde_json::from_value(json!({"type": "template", "target": "x"})).unwrap();

        assert_eq!(rule.kind, RuleKind::Unknown);
    }

    #[test]
    fn parses_event_rules() {
        let events: IndexMap<String, EventRule> = serde_json::from_value(json!({
            "click": "click",
            "input": {"target": "update:modelValue", "debounce": 300}
        }))
        .unwrap();

        assert_eq!(events["click"].target(), "click");
        assert_eq!(events["click"].debounce(), None);
        assert_eq!(events["input"].target(), "update:modelValue");
        assert_eq!(events["input"].debounce(), Some(300));
    }
}
