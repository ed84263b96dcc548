//! Runtime values.
//!
//! All data flowing through a template — loop variables, scope bindings,
//! function arguments and results — is a `Value`. The union is closed and
//! every coercion rule is a single named function, so behavior like
//! truthiness and the dual `+` semantic is testable in isolation.
//!
//! Heap variants (`Str`, `Array`, `Object`) are `Arc`-backed and constructed
//! only through the factory methods; values are cheap to clone and safe to
//! store in shared frames.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Runtime value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Arc<str>),
    Array(Arc<Vec<Value>>),
    /// String-keyed map. `BTreeMap` keeps iteration and serialization
    /// deterministic, which the memoization key depends on.
    Object(Arc<BTreeMap<String, Value>>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Arc::from(s.into()))
    }

    /// Create an array value.
    #[inline]
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    /// Create an object value.
    #[inline]
    pub fn object(entries: BTreeMap<String, Value>) -> Self {
        Value::Object(Arc::new(entries))
    }

    /// Create a number value.
    #[inline]
    pub fn number(n: f64) -> Self {
        Value::Number(n)
    }

    /// Type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness: `null`, `false`, `0`, `""`, and empty arrays/objects are
    /// falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(entries) => !entries.is_empty(),
            Value::Date(_) | Value::DateTime(_) => true,
        }
    }

    /// Numeric coercion.
    ///
    /// Numbers pass through; booleans map to 1/0; strings parse after
    /// trimming. Everything else (including `Null`) does not coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(true) => Some(1.0),
            Value::Bool(false) => Some(0.0),
            Value::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()
            }
            _ => None,
        }
    }

    /// Rendering coercion, used for text interpolation and `{a}{b}` concat.
    ///
    /// `Null` renders as the empty string; numbers with an integral value
    /// render without a fraction; temporal values render as ISO-8601;
    /// arrays and objects render as their canonical JSON.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Str(s) => s.to_string(),
            Value::Array(_) | Value::Object(_) => self.to_json().to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    /// Convert into the JSON-compatible interchange representation.
    ///
    /// `Date`/`DateTime` become ISO-8601 strings. Non-finite numbers become
    /// `null` (JSON has no representation for them).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            Value::DateTime(dt) => {
                serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
        }
    }

    /// Convert from the JSON interchange representation.
    ///
    /// Narrowing: temporal values serialized by `to_json` come back as
    /// `Str` — JSON has no date type, and the string form is identical
    /// either way.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
            serde_json::Value::String(s) => Value::string(s.clone()),
            serde_json::Value::Array(items) => {
                Value::array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => Value::object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Format a number, dropping the fraction when it is integral.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)] // integral and bounded by 1e15
        return format!("{}", n as i64);
    }
    format!("{n}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truthiness_table() {
        // Falsy
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(!Value::array(vec![]).is_truthy());
        assert!(!Value::object(BTreeMap::new()).is_truthy());

        // Truthy — note "0" and "false" are non-empty strings
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Number(-1.0).is_truthy());
        assert!(Value::string("0").is_truthy());
        assert!(Value::string("false").is_truthy());
        assert!(Value::array(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::Number(2.5).as_number(), Some(2.5));
        assert_eq!(Value::string(" 42 ").as_number(), Some(42.0));
        assert_eq!(Value::Bool(true).as_number(), Some(1.0));
        assert_eq!(Value::string("abc").as_number(), None);
        assert_eq!(Value::Null.as_number(), None);
        assert_eq!(Value::array(vec![]).as_number(), None);
    }

    #[test]
    fn test_display_integral_numbers() {
        assert_eq!(Value::Number(3.0).to_display_string(), "3");
        assert_eq!(Value::Number(3.5).to_display_string(), "3.5");
        assert_eq!(Value::Number(-0.0).to_display_string(), "0");
        assert_eq!(Value::Null.to_display_string(), "");
    }

    #[test]
    fn test_json_round_trip_scalars() {
        let values = [
            Value::Null,
            Value::Bool(true),
            Value::Number(1.5),
            Value::string("hi"),
        ];
        for value in values {
            assert_eq!(Value::from_json(&value.to_json()), value);
        }
    }

    #[test]
    fn test_json_round_trip_composite() {
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), Value::array(vec![Value::Number(1.0)]));
        entries.insert("b".to_string(), Value::Null);
        let value = Value::object(entries);
        assert_eq!(Value::from_json(&value.to_json()), value);
    }

    #[test]
    fn test_date_serializes_to_iso8601() {
        let date = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(date.to_json(), serde_json::json!("2024-03-09"));
        // Narrowing on the way back: dates become strings
        assert_eq!(Value::from_json(&date.to_json()), Value::string("2024-03-09"));
    }
}
