//! Registered transformation functions.
//!
//! Computed, custom and predicate rules name a function id instead of
//! embedding code. Ids are resolved against a [`FunctionRegistry`] when an
//! adapter is constructed, so an adapter never references a missing function.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use chameleon_config::{AdapterDefinition, Predicate, PropMap, RuleKind};
use regex::Regex;
use serde_json::{json, Value};

/// Pure function over a value and its sibling props.
pub type ComputeFn = Arc<dyn Fn(&Value, &PropMap) -> Result<Value, String> + Send + Sync>;

/// Unrestricted function that also sees the component and adapter.
pub type CustomFn =
    Arc<dyn Fn(&Value, &PropMap, &CustomContext<'_>) -> Result<Value, String> + Send + Sync>;

/// Predicate for conditional rules.
pub type PredicateFn = Arc<dyn Fn(&Value, &PropMap) -> bool + Send + Sync>;

/// Extra context handed to custom functions.
#[derive(Debug, Clone, Copy)]
pub struct CustomContext<'a> {
    pub component: &'a str,
    pub adapter: &'a AdapterDefinition,
}

/// Functions available to transformation rules, by id.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    computed: HashMap<String, ComputeFn>,
    custom: HashMap<String, CustomFn>,
    predicates: HashMap<String, PredicateFn>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut computed: Vec<&String> = self.computed.keys().collect();
        let mut custom: Vec<&String> = self.custom.keys().collect();
        let mut predicates: Vec<&String> = self.predicates.keys().collect();
        computed.sort();
        custom.sort();
        predicates.sort();

        f.debug_struct("FunctionRegistry")
            .field("computed", &computed)
            .field("custom", &custom)
            .field("predicates", &predicates)
            .finish()
    }
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_computed("icon-placement", icon_placement);
        registry.register_computed("negate", negate);
        registry.register_computed("stringify", |value, _| Ok(Value::String(stringify(value))));
        registry.register_custom("scoped-class", scoped_class);
        registry.register_predicate("truthy", |value, _| is_truthy(value));
        registry
    }

    pub fn register_computed<F>(&mut self, id: &str, f: F)
    where
        F: Fn(&Value, &PropMap) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.computed.insert(id.to_string(), Arc::new(f));
    }

    pub fn register_custom<F>(&mut self, id: &str, f: F)
    where
        F: Fn(&Value, &PropMap, &CustomContext<'_>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.custom.insert(id.to_string(), Arc::new(f));
    }

    pub fn register_predicate<F>(&mut self, id: &str, f: F)
    where
        F: Fn(&Value, &PropMap) -> bool + Send + Sync + 'static,
    {
        self.predicates.insert(id.to_string(), Arc::new(f));
    }

    pub fn computed(&self, id: &str) -> Option<&ComputeFn> {
        self.computed.get(id)
    }

    pub fn custom(&self, id: &str) -> Option<&CustomFn> {
        self.custom.get(id)
    }

    pub fn predicate(&self, id: &str) -> Option<&PredicateFn> {
        self.predicates.get(id)
    }

    /// The function id a rule refers to that is not registered, if any.
    pub fn unresolved<'k>(&self, kind: &'k RuleKind) -> Option<&'k str> {
        match kind {
            RuleKind::Computed { function, .. } if !self.computed.contains_key(function) => {
                Some(function)
            }
            RuleKind::Custom { function } if !self.custom.contains_key(function) => Some(function),
            RuleKind::Conditional {
                predicate: Predicate::Registered { function },
                ..
            } if !self.predicates.contains_key(function) => Some(function),
            _ => None,
        }
    }
}

/// Place an icon before or after the content depending on `iconPosition`.
fn icon_placement(value: &Value, props: &PropMap) -> Result<Value, String> {
    if value.is_null() {
        return Ok(json!({}));
    }

    let position = props
        .get("iconPosition")
        .and_then(Value::as_str)
        .unwrap_or("left");

    Ok(match position {
        "right" | "end" | "append" => json!({ "appendIcon": value }),
        _ => json!({ "prependIcon": value }),
    })
}

fn negate(value: &Value, _props: &PropMap) -> Result<Value, String> {
    value
        .as_bool()
        .map(|b| Value::Bool(!b))
        .ok_or_else(|| format!("expected a boolean, got {value}"))
}

/// Class name scoped to the adapter and component, e.g. `vuetify-data-table-dense`.
fn scoped_class(value: &Value, _props: &PropMap, ctx: &CustomContext<'_>) -> Result<Value, String> {
    let suffix = stringify(value);
    if suffix.is_empty() {
        return Err("empty class suffix".to_string());
    }

    Ok(Value::String(format!(
        "{}-{}-{}",
        ctx.adapter.name,
        to_kebab_case(ctx.component),
        suffix
    )))
}

/// Strings as-is, everything else as JSON text.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

static CASE_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("Invalid case boundary regex"));

/// Convert PascalCase to kebab-case.
pub fn to_kebab_case(s: &str) -> String {
    CASE_BOUNDARY_RE.replace_all(s, "$1-$2").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, Value)]) -> PropMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn to_kebab_case_works() {
        assert_eq!(to_kebab_case("Button"), "button");
        assert_eq!(to_kebab_case("DataTable"), "data-table");
        assert_eq!(to_kebab_case("Tab2Panel"), "tab2-panel");
    }

    #[test]
    fn icon_placement_uses_position() {
        let registry = FunctionRegistry::with_builtins();
        let f = registry.computed("icon-placement").unwrap();

        let right = f(&json!("mdi-star"), &props(&[("iconPosition", json!("right"))])).unwrap();
        let left = f(&json!("mdi-star"), &props(&[("iconPosition", json!("left"))])).unwrap();

        assert_eq!(right, json!({"appendIcon": "mdi-star"}));
        assert_eq!(left, json!({"prependIcon": "mdi-star"}));
    }

    #[test]
    fn negate_rejects_non_booleans() {
        let registry = FunctionRegistry::with_builtins();
        let f = registry.computed("negate").unwrap();

        assert_eq!(f(&json!(true), &PropMap::new()).unwrap(), json!(false));
        assert!(f(&json!("yes"), &PropMap::new()).is_err());
    }

    #[test]
    fn scoped_class_includes_adapter_and_component() {
        let registry = FunctionRegistry::with_builtins();
        let f = registry.custom("scoped-class").unwrap();
        let adapter = AdapterDefinition {
            name: "vuetify".to_string(),
            ..Default::default()
        };
        let ctx = CustomContext {
            component: "DataTable",
            adapter: &adapter,
        };

        let class = f(&json!("dense"), &PropMap::new(), &ctx).unwrap();

        assert_eq!(class, json!("vuetify-data-table-dense"));
    }

    #[test]
    fn reports_unresolved_ids() {
        let registry = FunctionRegistry::with_builtins();

        let known = RuleKind::Computed {
            function: "negate".to_string(),
            inputs: vec![],
        };
        let unknown = RuleKind::Custom {
            function: "tailwind-merge".to_string(),
        };

        assert_eq!(registry.unresolved(&known), None);
        assert_eq!(registry.unresolved(&unknown), Some("tailwind-merge"));
    }

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([])));
    }
}
