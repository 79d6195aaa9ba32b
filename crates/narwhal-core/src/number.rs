//! Numeric ingestion.
//!
//! Upstream payloads carry counts as plain numbers, numeric strings, or boxed 64-bit integers
//! (`{ "low": 42, "high": 0 }`). Every numeric field goes through [`normalize_number`] so the rest
//! of the workspace only ever sees finite `f64`/`i64` values.

use serde_json::Value;

/// Normalizes an arbitrary JSON value to a finite number.
///
/// - `null` (and absent fields, see [`normalize_field`]) map to `0`
/// - numbers are taken as-is
/// - objects exposing `low` use `Number(low)`
/// - strings are parsed, `0` when they are not numeric
/// - anything else is coerced the way `Number(value)` would, `0` on `NaN`
pub fn normalize_number(value: &Value) -> f64 {
    let n = match value {
        Value::Null => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Object(map) => match map.get("low") {
            Some(low) => coerce(low),
            None => f64::NAN,
        },
        Value::String(s) => parse_numeric_str(s),
        other => coerce(other),
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Same as [`normalize_number`], for an optional (possibly absent) field.
pub fn normalize_field(value: Option<&Value>) -> f64 {
    value.map(normalize_number).unwrap_or(0.0)
}

/// Vote counts are integers; fractional inputs are truncated toward zero.
pub fn normalize_count(value: Option<&Value>) -> i64 {
    normalize_field(value).trunc() as i64
}

// `Number(x)` for the non-object cases.
fn coerce(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric_str(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => coerce(single),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

fn parse_numeric_str(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn boxed_integers_use_low_word() {
        assert_eq!(normalize_number(&json!({"low": 42, "high": 0})), 42.0);
        assert_eq!(normalize_number(&json!({"low": "17", "high": 0})), 17.0);
        assert_eq!(normalize_number(&json!({"high": 3})), 0.0);
    }

    #[test]
    fn strings_parse_or_fall_back_to_zero() {
        assert_eq!(normalize_number(&json!("7")), 7.0);
        assert_eq!(normalize_number(&json!(" 7 ")), 7.0);
        assert_eq!(normalize_number(&json!("abc")), 0.0);
        assert_eq!(normalize_number(&json!("")), 0.0);
    }

    #[test]
    fn null_and_absent_are_zero() {
        assert_eq!(normalize_number(&Value::Null), 0.0);
        assert_eq!(normalize_field(None), 0.0);
        assert_eq!(normalize_count(None), 0);
    }

    #[test]
    fn other_values_coerce_like_number() {
        assert_eq!(normalize_number(&json!(true)), 1.0);
        assert_eq!(normalize_number(&json!([5])), 5.0);
        assert_eq!(normalize_number(&json!([1, 2])), 0.0);
        assert_eq!(normalize_number(&json!(-3)), -3.0);
    }

    #[test]
    fn counts_truncate() {
        assert_eq!(normalize_count(Some(&json!(4.9))), 4);
        assert_eq!(normalize_count(Some(&json!("-2.5"))), -2);
    }
}
