//! Best-guess typing of raw flat field values
//!
//! Multipart and urlencoded transports carry every scalar as text. The
//! server turns each leaf back into a typed value by walking an ordered
//! rule table; the first rule that claims the input wins.

use serde_json::{Number, Value};

/// A raw field value as received from a flat transport
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// The field was present without a value
    Absent,
    /// A single text value
    Text(String),
    /// Already structured (repeated fields, pre-parsed JSON)
    Structured(Value),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

/// Outcome of a single text rule
enum Rule {
    Claimed(Value),
    Pass,
}

type TextRule = fn(original: &str, trimmed: &str) -> Rule;

/// Text rules in precedence order
const TEXT_RULES: &[TextRule] = &[empty_text, literal_keyword, json_structure, numeric];

/// Coerce one raw value into its typed form
///
/// Never fails: a value no rule claims is returned as the original string.
pub fn coerce(raw: RawValue) -> Value {
    match raw {
        RawValue::Absent => Value::Null,
        RawValue::Structured(value) => value,
        RawValue::Text(text) => coerce_text(&text),
    }
}

/// Coerce a single text scalar
pub fn coerce_text(text: &str) -> Value {
    let trimmed = text.trim();
    for rule in TEXT_RULES {
        if let Rule::Claimed(value) = rule(text, trimmed) {
            return value;
        }
    }
    Value::String(text.to_string())
}

fn empty_text(_original: &str, trimmed: &str) -> Rule {
    if trimmed.is_empty() {
        Rule::Claimed(Value::String(String::new()))
    } else {
        Rule::Pass
    }
}

fn literal_keyword(_original: &str, trimmed: &str) -> Rule {
    match trimmed {
        "true" => Rule::Claimed(Value::Bool(true)),
        "false" => Rule::Claimed(Value::Bool(false)),
        "null" => Rule::Claimed(Value::Null),
        _ => Rule::Pass,
    }
}

fn json_structure(_original: &str, trimmed: &str) -> Rule {
    let bounded = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if !bounded {
        return Rule::Pass;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Rule::Claimed(value),
        // Malformed structure falls through to the remaining rules
        Err(_) => Rule::Pass,
    }
}

fn numeric(_original: &str, trimmed: &str) -> Rule {
    if let Ok(int) = trimmed.parse::<i64>() {
        return Rule::Claimed(Value::Number(int.into()));
    }
    // f64 parsing also accepts "inf"/"NaN", which JSON cannot carry
    match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(number) => Rule::Claimed(Value::Number(number)),
        None => Rule::Pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keywords() {
        assert_eq!(coerce_text("true"), json!(true));
        assert_eq!(coerce_text("false"), json!(false));
        assert_eq!(coerce_text("null"), Value::Null);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce_text("42"), json!(42));
        assert_eq!(coerce_text("3.14"), json!(3.14));
        assert_eq!(coerce_text(" -7 "), json!(-7));
        assert_eq!(coerce_text("1e3"), json!(1000.0));
    }

    #[test]
    fn test_non_finite_stays_text() {
        assert_eq!(coerce_text("NaN"), json!("NaN"));
        assert_eq!(coerce_text("inf"), json!("inf"));
    }

    #[test]
    fn test_structures() {
        assert_eq!(coerce_text(r#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(coerce_text("[1, 2]"), json!([1, 2]));
    }

    #[test]
    fn test_malformed_structure_falls_through() {
        assert_eq!(coerce_text("{not json}"), json!("{not json}"));
        assert_eq!(coerce_text("[oops"), json!("[oops"));
    }

    #[test]
    fn test_empty_and_plain_text() {
        assert_eq!(coerce_text(""), json!(""));
        assert_eq!(coerce_text("   "), json!(""));
        assert_eq!(coerce_text("hello"), json!("hello"));
        // Unclaimed text keeps its surrounding whitespace
        assert_eq!(coerce_text(" Pune "), json!(" Pune "));
    }

    #[test]
    fn test_absent_and_structured() {
        assert_eq!(coerce(RawValue::Absent), Value::Null);
        let list = json!(["passion", "business"]);
        assert_eq!(coerce(RawValue::Structured(list.clone())), list);
    }
}
