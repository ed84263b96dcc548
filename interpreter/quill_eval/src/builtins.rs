//! Builtin function library.
//!
//! Builtins are plain Rust over `Value`s, take positional arguments only,
//! and are consulted after the user-defined registry, so a template can
//! shadow any of them with its own definition.

use std::fmt::Write as _;

use chrono::{NaiveDate, Utc};

use crate::errors::{
    external_error, missing_required_param, param_rule_violation, type_mismatch, EvalError,
};
use crate::operators::loose_eq;
use crate::Value;

/// Whether a builtin with this name exists, without calling it.
pub fn exists(name: &str) -> bool {
    matches!(
        name,
        "len"
            | "abs"
            | "round"
            | "floor"
            | "ceiling"
            | "min"
            | "max"
            | "trim"
            | "uppercase"
            | "lowercase"
            | "replace"
            | "contains"
            | "listToArray"
            | "arrayContains"
            | "now"
            | "createDate"
            | "dateFormat"
    )
}

/// Dispatch a builtin by name. `None` means no builtin with that name
/// exists; the caller reports `UndefinedFunction`.
pub fn call(name: &str, args: &[Value]) -> Option<Result<Value, EvalError>> {
    Some(match name {
        "len" => len(args),
        "abs" => numeric_unary(name, args, f64::abs),
        "round" => numeric_unary(name, args, f64::round),
        "floor" => numeric_unary(name, args, f64::floor),
        "ceiling" => numeric_unary(name, args, f64::ceil),
        "min" => fold_numeric(name, args, f64::min),
        "max" => fold_numeric(name, args, f64::max),
        "trim" => string_unary(name, args, |s| s.trim().to_string()),
        "uppercase" => string_unary(name, args, |s| s.to_uppercase()),
        "lowercase" => string_unary(name, args, |s| s.to_lowercase()),
        "replace" => replace(args),
        "contains" => contains(args),
        "listToArray" => list_to_array(args),
        "arrayContains" => array_contains(args),
        "now" => Ok(Value::DateTime(Utc::now())),
        "createDate" => create_date(args),
        "dateFormat" => date_format(args),
        _ => return None,
    })
}

fn arg<'a>(name: &str, args: &'a [Value], idx: usize, label: &str) -> Result<&'a Value, EvalError> {
    args.get(idx).ok_or_else(|| missing_required_param(name, label))
}

fn numeric(name: &str, args: &[Value], idx: usize, label: &str) -> Result<f64, EvalError> {
    let value = arg(name, args, idx, label)?;
    value.as_number().ok_or_else(|| type_mismatch("number", value))
}

fn text(name: &str, args: &[Value], idx: usize, label: &str) -> Result<String, EvalError> {
    Ok(arg(name, args, idx, label)?.to_display_string())
}

#[allow(clippy::cast_precision_loss)]
fn len(args: &[Value]) -> Result<Value, EvalError> {
    let value = arg("len", args, 0, "value")?;
    let n = match value {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(entries) => entries.len(),
        other => return Err(type_mismatch("string, array, or object", other)),
    };
    Ok(Value::Number(n as f64))
}

fn numeric_unary(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, EvalError> {
    Ok(Value::Number(f(numeric(name, args, 0, "value")?)))
}

fn fold_numeric(name: &str, args: &[Value], f: fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    let mut acc = numeric(name, args, 0, "value")?;
    for value in &args[1..] {
        let n = value.as_number().ok_or_else(|| type_mismatch("number", value))?;
        acc = f(acc, n);
    }
    Ok(Value::Number(acc))
}

fn string_unary(name: &str, args: &[Value], f: impl Fn(&str) -> String) -> Result<Value, EvalError> {
    Ok(Value::string(f(&text(name, args, 0, "value")?)))
}

fn replace(args: &[Value]) -> Result<Value, EvalError> {
    let haystack = text("replace", args, 0, "value")?;
    let search = text("replace", args, 1, "search")?;
    let replacement = text("replace", args, 2, "replacement")?;
    Ok(Value::string(haystack.replace(&search, &replacement)))
}

fn contains(args: &[Value]) -> Result<Value, EvalError> {
    let haystack = arg("contains", args, 0, "value")?;
    let needle = arg("contains", args, 1, "search")?;
    let found = match haystack {
        Value::Str(s) => s.contains(&needle.to_display_string()),
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        Value::Object(entries) => entries.contains_key(&needle.to_display_string()),
        other => return Err(type_mismatch("string, array, or object", other)),
    };
    Ok(Value::Bool(found))
}

fn list_to_array(args: &[Value]) -> Result<Value, EvalError> {
    let list = text("listToArray", args, 0, "list")?;
    let delimiter = match args.get(1) {
        Some(value) => value.to_display_string(),
        None => ",".to_string(),
    };
    if list.is_empty() {
        return Ok(Value::array(Vec::new()));
    }
    let items = if delimiter.is_empty() {
        list.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        list.split(&delimiter)
            .map(|item| Value::string(item.trim()))
            .collect()
    };
    Ok(Value::array(items))
}

fn array_contains(args: &[Value]) -> Result<Value, EvalError> {
    let value = arg("arrayContains", args, 0, "array")?;
    let Value::Array(items) = value else {
        return Err(type_mismatch("array", value));
    };
    let needle = arg("arrayContains", args, 1, "search")?;
    Ok(Value::Bool(items.iter().any(|item| loose_eq(item, needle))))
}

fn create_date(args: &[Value]) -> Result<Value, EvalError> {
    let year = numeric("createDate", args, 0, "year")?;
    let month = numeric("createDate", args, 1, "month")?;
    let day = numeric("createDate", args, 2, "day")?;
    #[allow(clippy::cast_possible_truncation)]
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
        .ok_or_else(|| param_rule_violation("createDate", "day", "a valid calendar date"))?;
    Ok(Value::Date(date))
}

fn date_format(args: &[Value]) -> Result<Value, EvalError> {
    let value = arg("dateFormat", args, 0, "date")?;
    let format = text("dateFormat", args, 1, "format")?;
    let mut out = String::new();
    let result = match value {
        Value::Date(d) => write!(out, "{}", d.format(&format)),
        Value::DateTime(dt) => write!(out, "{}", dt.format(&format)),
        other => return Err(type_mismatch("date", other)),
    };
    result.map_err(|_| external_error(format!("invalid date format `{format}`")))?;
    Ok(Value::string(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn len_counts_chars_items_and_keys() {
        assert_eq!(call("len", &[Value::string("héllo")]).unwrap().unwrap(), Value::Number(5.0));
        let arr = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(call("len", &[arr]).unwrap().unwrap(), Value::Number(2.0));
    }

    #[test]
    fn min_max_fold_all_arguments() {
        let args = [Value::Number(4.0), Value::string("2"), Value::Number(9.0)];
        assert_eq!(call("min", &args).unwrap().unwrap(), Value::Number(2.0));
        assert_eq!(call("max", &args).unwrap().unwrap(), Value::Number(9.0));
    }

    #[test]
    fn list_to_array_trims_items() {
        let got = call("listToArray", &[Value::string("a, b ,c")]).unwrap().unwrap();
        let want = Value::array(vec![
            Value::string("a"),
            Value::string("b"),
            Value::string("c"),
        ]);
        assert_eq!(got, want);
    }

    #[test]
    fn date_format_renders_created_date() {
        let date = call(
            "createDate",
            &[Value::Number(2024.0), Value::Number(3.0), Value::Number(9.0)],
        )
        .unwrap()
        .unwrap();
        let got = call("dateFormat", &[date, Value::string("%d/%m/%Y")])
            .unwrap()
            .unwrap();
        assert_eq!(got, Value::string("09/03/2024"));
    }

    #[test]
    fn unknown_name_is_not_a_builtin() {
        assert!(call("definitelyNot", &[]).is_none());
    }

    #[test]
    fn missing_argument_is_a_validation_error() {
        let err = call("replace", &[Value::string("x")]).unwrap().unwrap_err();
        assert!(err.to_string().contains("requires parameter"));
    }
}
