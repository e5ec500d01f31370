//! Flattening of untrusted backend values into display text
//!
//! Backend replies carry follow-ups, titles and answers in whatever shape the
//! model felt like producing. Everything shown to the user goes through
//! [`normalize`], which is total: it never fails and never panics.

use serde_json::{Number, Value};

/// Separator between normalized array elements
pub const LIST_SEPARATOR: &str = " | ";

/// Cap on the JSON fallback rendering, in characters
pub const MAX_ENCODED_CHARS: usize = 800;

/// Conventional fields probed, in order, on keyed values
const PROBE_FIELDS: [&str; 4] = ["text", "question", "title", "prompt"];

/// Convert an arbitrary value into a single display string
pub fn normalize(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => number_text(n),
        Value::Array(items) => items
            .iter()
            .map(normalize)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR),
        Value::Object(map) => PROBE_FIELDS
            .iter()
            .find_map(|field| map.get(*field).filter(|v| is_truthy(v)))
            .map(normalize)
            .unwrap_or_else(|| encode_capped(value)),
    }
}

/// Normalize every element and join them one per line
pub fn join_lines(items: &[Value]) -> String {
    items.iter().map(normalize).collect::<Vec<_>>().join("\n")
}

/// Normalize a follow-up list: trimmed, empties dropped
pub fn normalize_followups(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .map(normalize)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whether a value counts as present when probing fields
///
/// Empty strings, zero, `false` and null are absent; every array and object
/// is present, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Integers print plainly; floats switch to exponent form (`1e+21`,
/// `1.5e-7`) outside `[1e-6, 1e21)` and drop a zero fraction.
fn number_text(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f != 0.0 && (f.abs() >= 1e21 || f.abs() < 1e-6) => exponent_text(f),
        Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn exponent_text(f: f64) -> String {
    let text = format!("{:e}", f);
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => text,
    }
}

fn encode_capped(value: &Value) -> String {
    match serde_json::to_string(value) {
        Ok(encoded) => encoded.chars().take(MAX_ENCODED_CHARS).collect(),
        Err(_) => "[object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_values_are_empty() {
        assert_eq!(normalize(&Value::Null), "");
        assert_eq!(normalize(&json!(false)), "");
        assert_eq!(normalize(&json!("")), "");
    }

    #[test]
    fn test_zero_is_preserved() {
        assert_eq!(normalize(&json!(0)), "0");
        assert_eq!(normalize(&json!(0.0)), "0");
    }

    #[test]
    fn test_strings_are_verbatim() {
        for s in ["plain", "  padded  ", "line\nbreak", "ünïcødé", "{\"looks\":\"json\"}"] {
            assert_eq!(normalize(&json!(s)), s);
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(normalize(&json!(42)), "42");
        assert_eq!(normalize(&json!(-7)), "-7");
        assert_eq!(normalize(&json!(3.0)), "3");
        assert_eq!(normalize(&json!(0.25)), "0.25");
        assert_eq!(normalize(&json!(true)), "true");
    }

    #[test]
    fn test_extreme_floats_use_exponent_form() {
        assert_eq!(normalize(&json!(1e21)), "1e+21");
        assert_eq!(normalize(&json!(-2.5e22)), "-2.5e+22");
        assert_eq!(normalize(&json!(1.5e-7)), "1.5e-7");
        assert_eq!(normalize(&json!(1e20)), "100000000000000000000");
        assert_eq!(normalize(&json!(0.000001)), "0.000001");
    }

    #[test]
    fn test_array_join_and_drop_empty() {
        assert_eq!(normalize(&json!(["a", "b"])), "a | b");
        assert_eq!(normalize(&json!(["", "x"])), "x");
        assert_eq!(normalize(&json!([null, 1, [2, ""], {"title": "t"}])), "1 | 2 | t");
        assert_eq!(normalize(&json!([])), "");
    }

    #[test]
    fn test_object_field_probe_order() {
        assert_eq!(normalize(&json!({"question": "Why?"})), "Why?");
        assert_eq!(normalize(&json!({"title": "T", "text": "X"})), "X");
        assert_eq!(normalize(&json!({"prompt": "P", "question": "Q"})), "Q");
        // falsy probes fall through to the next field
        assert_eq!(normalize(&json!({"text": "", "title": "T"})), "T");
        assert_eq!(normalize(&json!({"text": 0, "prompt": 5})), "5");
    }

    #[test]
    fn test_object_without_known_fields_is_encoded() {
        assert_eq!(normalize(&json!({"foo": 1})), "{\"foo\":1}");
        assert_eq!(normalize(&json!({})), "{}");
    }

    #[test]
    fn test_encoding_is_capped() {
        let long = "y".repeat(2000);
        let out = normalize(&json!({ "blob": long }));
        assert_eq!(out.chars().count(), MAX_ENCODED_CHARS);
        assert!(out.starts_with("{\"blob\":\"yyy"));
    }

    #[test]
    fn test_deeply_nested_value_is_total() {
        let mut value = json!("leaf");
        for _ in 0..64 {
            value = json!([{ "other": value }]);
        }
        let out = normalize(&value);
        assert!(!out.is_empty());
    }

    #[test]
    fn test_normalize_followups() {
        let items = vec![json!({"question": "Why?"}), json!("Because"), json!("   "), Value::Null];
        assert_eq!(normalize_followups(&items), vec!["Why?", "Because"]);
    }

    #[test]
    fn test_join_lines() {
        let items = vec![json!("one"), json!({"text": "two"}), json!(3)];
        assert_eq!(join_lines(&items), "one\ntwo\n3");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("a")));
    }
}
