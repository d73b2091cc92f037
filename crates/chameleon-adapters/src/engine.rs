//! Rule evaluation for props, events and slots.

use std::collections::HashMap;
use std::sync::Arc;

use chameleon_config::{ComponentMapping, Predicate, PropMap, RuleKind, TransformationRule};
use indexmap::IndexMap;
use serde_json::Value;

use crate::functions::{CustomContext, FunctionRegistry};
use crate::traits::{
    CollisionWarning, HandlerWrapper, ResolvedEvent, TransformContext, TransformError,
    TransformOutcome,
};

/// Placeholder replaced with the source value inside conditional results.
const VALUE_PLACEHOLDER: &str = "$value";

/// Applies an adapter's transformation rules to prop, event and slot bags.
#[derive(Debug, Clone)]
pub struct TransformationEngine {
    functions: Arc<FunctionRegistry>,
}

impl TransformationEngine {
    pub fn new(functions: Arc<FunctionRegistry>) -> Self {
        Self { functions }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Transform a semantic prop bag into target props.
    ///
    /// Props are visited in the bag's order. Each rule only reads the raw
    /// semantic bag, never the output of another rule. When two props write
    /// the same output key the later one wins.
    pub fn transform_props(
        &self,
        ctx: &TransformContext<'_>,
        mapping: &ComponentMapping,
        props: &PropMap,
    ) -> Result<TransformOutcome, TransformError> {
        let mut output = Accumulator::new(ctx);

        for (source, value) in props {
            let Some(rule) = mapping.rule(source) else {
                output.write(source, source, value.clone());
                continue;
            };

            let result = self.apply_rule(ctx, source, rule, value, props)?;
            let target = if rule.target.is_empty() {
                source.as_str()
            } else {
                rule.target.as_str()
            };

            match result {
                Value::Object(partial) if merges_objects(&rule.kind) => {
                    for (key, v) in partial {
                        output.write(&key, source, v);
                    }
                }
                other => output.write(target, source, other),
            }
        }

        Ok(output.finish())
    }

    fn apply_rule(
        &self,
        ctx: &TransformContext<'_>,
        source: &str,
        rule: &TransformationRule,
        value: &Value,
        props: &PropMap,
    ) -> Result<Value, TransformError> {
        match &rule.kind {
            RuleKind::Direct => Ok(value.clone()),

            RuleKind::Mapping { table, default } => Ok(table
                .get(&lookup_key(value))
                .or(default.as_ref())
                .unwrap_or(value)
                .clone()),

            RuleKind::Conditional {
                predicate,
                true_value,
                false_value,
            } => {
                let chosen = if self.evaluate(ctx, source, predicate, value, props)? {
                    true_value
                } else {
                    false_value
                };
                Ok(substitute(chosen, value))
            }

            RuleKind::Computed { function, inputs } => {
                check_inputs(ctx, source, inputs, props)?;
                let f = self
                    .functions
                    .computed(function)
                    .ok_or_else(|| unregistered(ctx, source, function))?;
                f(value, props).map_err(|reason| missing_input(ctx, source, reason))
            }

            RuleKind::Custom { function } => {
                let f = self
                    .functions
                    .custom(function)
                    .ok_or_else(|| unregistered(ctx, source, function))?;
                let custom_ctx = CustomContext {
                    component: ctx.component,
                    adapter: ctx.adapter,
                };
                f(value, props, &custom_ctx).map_err(|reason| missing_input(ctx, source, reason))
            }

            RuleKind::Unknown => Err(TransformError::UnknownTransformationType {
                component: ctx.component.to_string(),
                prop: source.to_string(),
            }),
        }
    }

    fn evaluate(
        &self,
        ctx: &TransformContext<'_>,
        source: &str,
        predicate: &Predicate,
        value: &Value,
        props: &PropMap,
    ) -> Result<bool, TransformError> {
        match predicate {
            Predicate::Registered { function } => {
                let f = self
                    .functions
                    .predicate(function)
                    .ok_or_else(|| unregistered(ctx, source, function))?;
                Ok(f(value, props))
            }
            Predicate::Compare {
                prop,
                operator,
                value: expected,
            } => {
                let subject = match prop {
                    Some(name) => props.get(name).unwrap_or(&Value::Null),
                    None => value,
                };
                Ok(crate::predicate::compare(*operator, subject, expected))
            }
        }
    }

    /// Rename events and attach handler wrappers.
    ///
    /// `events` maps semantic event names to handler references. The result is
    /// keyed by target event name.
    pub fn transform_events(
        &self,
        mapping: &ComponentMapping,
        events: &PropMap,
    ) -> IndexMap<String, ResolvedEvent> {
        events
            .iter()
            .map(|(source, handler)| {
                let (target, wrappers) = match mapping.events.get(source) {
                    Some(rule) => {
                        let wrappers = rule
                            .debounce()
                            .map(|delay_ms| vec![HandlerWrapper::Debounce { delay_ms }])
                            .unwrap_or_default();
                        (rule.target().to_string(), wrappers)
                    }
                    None => (source.clone(), Vec::new()),
                };

                (
                    target,
                    ResolvedEvent {
                        source: source.clone(),
                        handler: handler.clone(),
                        wrappers,
                    },
                )
            })
            .collect()
    }

    /// Rename slots. The result maps target slot names to semantic slot names.
    pub fn transform_slots(&self, mapping: &ComponentMapping, slots: &[String]) -> IndexMap<String, String> {
        slots
            .iter()
            .map(|source| {
                let target = mapping.slots.get(source).unwrap_or(source);
                (target.clone(), source.clone())
            })
            .collect()
    }
}

/// Output props plus the semantic prop that last wrote each key.
struct Accumulator<'c> {
    ctx: &'c TransformContext<'c>,
    props: PropMap,
    writers: HashMap<String, String>,
    warnings: Vec<CollisionWarning>,
}

impl<'c> Accumulator<'c> {
    fn new(ctx: &'c TransformContext<'c>) -> Self {
        Self {
            ctx,
            props: PropMap::new(),
            writers: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    fn write(&mut self, key: &str, source: &str, value: Value) {
        if let Some(previous) = self.writers.insert(key.to_string(), source.to_string()) {
            if self.ctx.strict && previous != source {
                tracing::warn!(
                    component = %self.ctx.component,
                    prop = %key,
                    "output prop written by '{previous}' and '{source}'"
                );
                self.warnings.push(CollisionWarning {
                    component: self.ctx.component.to_string(),
                    target: key.to_string(),
                    overwritten: previous,
                    winner: source.to_string(),
                });
            }
        }
        self.props.insert(key.to_string(), value);
    }

    fn finish(self) -> TransformOutcome {
        TransformOutcome {
            props: self.props,
            warnings: self.warnings,
        }
    }
}

/// Rules whose object results are partial prop bags.
fn merges_objects(kind: &RuleKind) -> bool {
    matches!(
        kind,
        RuleKind::Conditional { .. } | RuleKind::Computed { .. } | RuleKind::Custom { .. }
    )
}

/// Table key for a value: strings as-is, anything else as JSON text.
fn lookup_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace every `"$value"` string inside `template` with `value`.
fn substitute(template: &Value, value: &Value) -> Value {
    match template {
        Value::String(s) if s == VALUE_PLACEHOLDER => value.clone(),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, value)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn check_inputs(
    ctx: &TransformContext<'_>,
    source: &str,
    inputs: &[String],
    props: &PropMap,
) -> Result<(), TransformError> {
    match inputs.iter().find(|input| !props.contains_key(input.as_str())) {
        Some(input) => Err(missing_input(ctx, source, format!("input '{input}' is not set"))),
        None => Ok(()),
    }
}

fn missing_input(ctx: &TransformContext<'_>, source: &str, reason: String) -> TransformError {
    TransformError::MissingComputationInput {
        component: ctx.component.to_string(),
        prop: source.to_string(),
        reason,
    }
}

fn unregistered(ctx: &TransformContext<'_>, source: &str, function: &str) -> TransformError {
    TransformError::UnregisteredFunction {
        component: ctx.component.to_string(),
        prop: source.to_string(),
        function: function.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chameleon_config::{AdapterDefinition, EventRule, Operator};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn engine() -> TransformationEngine {
        TransformationEngine::new(Arc::new(FunctionRegistry::with_builtins()))
    }

    fn adapter() -> AdapterDefinition {
        AdapterDefinition {
            name: "primevue".to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        }
    }

    fn props(pairs: &[(&str, Value)]) -> PropMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn run(mapping: &ComponentMapping, bag: &PropMap, strict: bool) -> Result<TransformOutcome, TransformError> {
        let adapter = adapter();
        let ctx = TransformContext {
            component: "Button",
            adapter: &adapter,
            strict,
        };
        engine().transform_props(&ctx, mapping, bag)
    }

    #[test]
    fn passes_unmapped_props_through() {
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'");

        let out = run(&mapping, &props(&[("disabled", json!(true))]), false).unwrap();

        assert_eq!(out.props, props(&[("disabled", json!(true))]));
    }

    #[test]
    fn renames_direct_props() {
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule("label", TransformationRule::direct("text"));

        let out = run(&mapping, &props(&[("label", json!("Save"))]), false).unwrap();

        assert_eq!(out.props, props(&[("text", json!("Save"))]));
    }

    #[test]
    fn mapping_falls_back_to_default_then_value() {
        let table = [("primary", json!("primary")), ("secondary", json!("outlined"))];
        let without_default = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule("variant", TransformationRule::mapping("severity", &table, None));
        let with_default = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule(
                "variant",
                TransformationRule::mapping("severity", &table, Some(json!("elevated"))),
            );
        let bag = props(&[("variant", json!("tertiary"))]);

        assert_eq!(run(&without_default, &bag, false).unwrap().props["severity"], json!("tertiary"));
        assert_eq!(run(&with_default, &bag, false).unwrap().props["severity"], json!("elevated"));
    }

    #[test]
    fn mapping_looks_up_non_strings_by_json_text() {
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule(
                "raised",
                TransformationRule::mapping("variant", &[("true", json!("elevated"))], None),
            );

        let out = run(&mapping, &props(&[("raised", json!(true))]), false).unwrap();

        assert_eq!(out.props["variant"], json!("elevated"));
    }

    #[test]
    fn conditional_uses_registered_predicate() {
        let mut functions = FunctionRegistry::with_builtins();
        functions.register_predicate("icon-on-right", |_, props| {
            props.get("iconPosition") == Some(&json!("right"))
        });
        let engine = TransformationEngine::new(Arc::new(functions));
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule(
                "icon",
                TransformationRule::conditional(
                    "icon",
                    Predicate::Registered {
                        function: "icon-on-right".to_string(),
                    },
                    json!({"appendIcon": "$value"}),
                    json!({"prependIcon": "$value"}),
                ),
            );
        let adapter = adapter();
        let ctx = TransformContext {
            component: "Button",
            adapter: &adapter,
            strict: false,
        };
        let right = props(&[("icon", json!("mdi-star")), ("iconPosition", json!("right"))]);
        let left = props(&[("icon", json!("mdi-star")), ("iconPosition", json!("left"))]);

        let out_right = engine.transform_props(&ctx, &mapping, &right).unwrap();
        let out_left = engine.transform_props(&ctx, &mapping, &left).unwrap();

        assert_eq!(out_right.props["appendIcon"], json!("mdi-star"));
        assert!(!out_right.props.contains_key("prependIcon"));
        assert_eq!(out_left.props["prependIcon"], json!("mdi-star"));
        assert!(!out_left.props.contains_key("appendIcon"));
    }

    #[test]
    fn conditional_uses_builtin_truthy_predicate() {
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule(
                "loading",
                TransformationRule::conditional(
                    "state",
                    Predicate::Registered {
                        function: "truthy".to_string(),
                    },
                    json!("busy"),
                    json!("idle"),
                ),
            );

        let busy = run(&mapping, &props(&[("loading", json!(true))]), false).unwrap();
        let idle = run(&mapping, &props(&[("loading", json!(""))]), false).unwrap();

        assert_eq!(busy.props["state"], json!("busy"));
        assert_eq!(idle.props["state"], json!("idle"));
    }

    #[test]
    fn conditional_substitutes_value() {
        let predicate = Predicate::Compare {
            prop: Some("iconPosition".to_string()),
            operator: Operator::StrictEq,
            value: json!("right"),
        };
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule(
                "icon",
                TransformationRule::conditional(
                    "icon",
                    predicate,
                    json!({"appendIcon": "$value"}),
                    json!({"prependIcon": "$value"}),
                ),
            );
        let right = props(&[("icon", json!("mdi-star")), ("iconPosition", json!("right"))]);
        let left = props(&[("icon", json!("mdi-star")), ("iconPosition", json!("left"))]);

        let out_right = run(&mapping, &right, false).unwrap();
        let out_left = run(&mapping, &left, false).unwrap();

        assert_eq!(out_right.props["appendIcon"], json!("mdi-star"));
        assert!(!out_right.props.contains_key("prependIcon"));
        assert_eq!(out_left.props["prependIcon"], json!("mdi-star"));
    }

    #[test]
    fn conditional_defaults_to_own_value() {
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule(
                "size",
                TransformationRule::conditional(
                    "large",
                    Predicate::compare(Operator::StrictEq, json!("lg")),
                    json!(true),
                    json!(false),
                ),
            );

        let out = run(&mapping, &props(&[("size", json!("lg"))]), false).unwrap();

        assert_eq!(out.props, props(&[("large", json!(true))]));
    }

    #[test]
    fn computed_object_results_merge() {
        let mapping = ComponentMapping::new("Button", "import { VBtn } from 'vuetify/components'")
            .with_rule(
                "icon",
                TransformationRule::computed("icon", "icon-placement", &["iconPosition"]),
            );
        let bag = props(&[("icon", json!("mdi-star")), ("iconPosition", json!("end"))]);

        let out = run(&mapping, &bag, false).unwrap();

        assert_eq!(out.props["appendIcon"], json!("mdi-star"));
        assert_eq!(out.props["iconPosition"], json!("end"));
    }

    #[test]
    fn computed_requires_declared_inputs() {
        let mapping = ComponentMapping::new("Button", "import { VBtn } from 'vuetify/components'")
            .with_rule(
                "icon",
                TransformationRule::computed("icon", "icon-placement", &["iconPosition"]),
            );

        let err = run(&mapping, &props(&[("icon", json!("mdi-star"))]), false).unwrap_err();

        assert!(matches!(
            err,
            TransformError::MissingComputationInput { ref prop, .. } if prop == "icon"
        ));
    }

    #[test]
    fn function_errors_become_missing_input() {
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule("disabled", TransformationRule::computed("enabled", "negate", &[]));

        let err = run(&mapping, &props(&[("disabled", json!("no"))]), false).unwrap_err();

        assert!(matches!(err, TransformError::MissingComputationInput { .. }));
    }

    #[test]
    fn unknown_rule_type_fails() {
        let mut rule = TransformationRule::direct("x");
        rule.kind = RuleKind::Unknown;
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule("variant", rule);

        let err = run(&mapping, &props(&[("variant", json!("primary"))]), false).unwrap_err();

        assert_eq!(
            err,
            TransformError::UnknownTransformationType {
                component: "Button".to_string(),
                prop: "variant".to_string(),
            }
        );
    }

    #[test]
    fn later_writes_win_and_warn_in_strict_mode() {
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule("variant", TransformationRule::direct("severity"))
            .with_rule("tone", TransformationRule::direct("severity").overwriting());
        let bag = props(&[("variant", json!("primary")), ("tone", json!("danger"))]);

        let lenient = run(&mapping, &bag, false).unwrap();
        let strict = run(&mapping, &bag, true).unwrap();

        assert_eq!(lenient.props["severity"], json!("danger"));
        assert!(lenient.warnings.is_empty());
        assert_eq!(strict.props["severity"], json!("danger"));
        assert_eq!(strict.warnings.len(), 1);
        assert_eq!(strict.warnings[0].overwritten, "variant");
        assert_eq!(strict.warnings[0].winner, "tone");
    }

    #[test]
    fn rules_read_raw_input_only() {
        // `caption` is computed from `label`, not from the renamed `text`.
        let mapping = ComponentMapping::new("Button", "import Button from 'primevue/button'")
            .with_rule("label", TransformationRule::direct("text"))
            .with_rule("caption", TransformationRule::computed("caption", "stringify", &["label"]));
        let bag = props(&[("label", json!("Save")), ("caption", json!(3))]);

        let out = run(&mapping, &bag, false).unwrap();

        assert_eq!(out.props["text"], json!("Save"));
        assert_eq!(out.props["caption"], json!("3"));
    }

    #[test]
    fn renames_events_with_debounce() {
        let mapping = ComponentMapping::new("Input", "import InputText from 'primevue/inputtext'")
            .with_event("click", EventRule::Rename("onClick".to_string()))
            .with_event(
                "change",
                EventRule::Detailed {
                    target: "update:modelValue".to_string(),
                    debounce: Some(300),
                },
            );
        let events = props(&[("click", json!("click")), ("change", json!("change")), ("focus", json!("focus"))]);

        let out = engine().transform_events(&mapping, &events);

        assert_eq!(
            out.keys().collect::<Vec<_>>(),
            vec!["onClick", "update:modelValue", "focus"]
        );
        assert!(!out["onClick"].is_debounced());
        assert_eq!(
            out["update:modelValue"].wrappers,
            vec![HandlerWrapper::Debounce { delay_ms: 300 }]
        );
    }

    #[test]
    fn renames_slots() {
        let mapping = ComponentMapping::new("Card", "import Card from 'primevue/card'")
            .with_slot("header", "title");

        let out = engine().transform_slots(&mapping, &["header".to_string(), "default".to_string()]);

        assert_eq!(out.get("title"), Some(&"header".to_string()));
        assert_eq!(out.get("default"), Some(&"default".to_string()));
    }
}
