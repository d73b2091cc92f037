//! Evaluation of declarative comparison predicates.

use std::cmp::Ordering;

use chameleon_config::Operator;
use serde_json::Value;

use crate::functions::stringify;

/// Evaluate `left <operator> right`.
pub fn compare(operator: Operator, left: &Value, right: &Value) -> bool {
    match operator {
        Operator::StrictEq => strict_eq(left, right),
        Operator::StrictNe => !strict_eq(left, right),
        Operator::Eq => loose_eq(left, right),
        Operator::Ne => !loose_eq(left, right),
        Operator::Gt => order(left, right) == Some(Ordering::Greater),
        Operator::Ge => matches!(order(left, right), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => order(left, right) == Some(Ordering::Less),
        Operator::Le => matches!(order(left, right), Some(Ordering::Less | Ordering::Equal)),
        Operator::Includes => includes(left, right),
        Operator::StartsWith => match (left.as_str(), right.as_str()) {
            (Some(l), Some(r)) => l.starts_with(r),
            _ => false,
        },
        Operator::EndsWith => match (left.as_str(), right.as_str()) {
            (Some(l), Some(r)) => l.ends_with(r),
            _ => false,
        },
    }
}

/// Same type and same value. Numbers compare numerically so `1` equals `1.0`.
fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        _ => left == right,
    }
}

/// Equality with string/number/boolean coercion.
fn loose_eq(left: &Value, right: &Value) -> bool {
    if strict_eq(left, right) {
        return true;
    }

    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => match (as_number(left), as_number(right)) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => as_number(left)?.partial_cmp(&as_number(right)?),
    }
}

fn includes(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => s.contains(&stringify(needle)),
        Value::Array(items) => items.iter().any(|item| strict_eq(item, needle)),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strict_equality_respects_types() {
        assert!(compare(Operator::StrictEq, &json!("lg"), &json!("lg")));
        assert!(compare(Operator::StrictEq, &json!(1), &json!(1.0)));
        assert!(!compare(Operator::StrictEq, &json!("1"), &json!(1)));
        assert!(compare(Operator::StrictNe, &json!("1"), &json!(1)));
    }

    #[test]
    fn loose_equality_coerces() {
        assert!(compare(Operator::Eq, &json!("1"), &json!(1)));
        assert!(compare(Operator::Eq, &json!(true), &json!(1)));
        assert!(!compare(Operator::Eq, &json!(null), &json!(0)));
        assert!(compare(Operator::Ne, &json!("a"), &json!("b")));
    }

    #[test]
    fn orders_numbers_and_strings() {
        assert!(compare(Operator::Gt, &json!(10), &json!(2)));
        assert!(compare(Operator::Le, &json!("3"), &json!(3)));
        assert!(compare(Operator::Lt, &json!("apple"), &json!("banana")));
        assert!(!compare(Operator::Gt, &json!("x"), &json!(1)));
    }

    #[test]
    fn string_and_array_operators() {
        assert!(compare(Operator::Includes, &json!("outlined-primary"), &json!("primary")));
        assert!(compare(Operator::Includes, &json!(["a", "b"]), &json!("b")));
        assert!(compare(Operator::StartsWith, &json!("mdi-star"), &json!("mdi-")));
        assert!(compare(Operator::EndsWith, &json!("icon.svg"), &json!(".svg")));
        assert!(!compare(Operator::StartsWith, &json!(5), &json!("5")));
    }
}
