//! Value helpers shared by conditions and variable output

use serde_json::{Number, Value};

static NULL: Value = Value::Null;

/// Follow the remaining path segments through nested objects.
/// Any missing segment yields `None`.
pub fn walk<'v, 'p>(root: &'v Value, segments: impl IntoIterator<Item = &'p str>) -> Option<&'v Value> {
    segments
        .into_iter()
        .try_fold(root, |value, segment| value.as_object()?.get(segment))
}

/// Parse a comparison operand as a literal.
///
/// Tries a quoted string, then a number (float when it contains a dot,
/// integer otherwise), then a case-insensitive boolean. `None` means the
/// text should be treated as a path.
pub fn parse_literal(text: &str) -> Option<Value> {
    let text = text.trim();

    if text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')))
    {
        return Some(Value::String(text[1..text.len() - 1].to_string()));
    }

    if text.contains('.') {
        if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Some(Value::Number(number));
        }
    } else if let Ok(integer) = text.parse::<i64>() {
        return Some(Value::Number(integer.into()));
    }

    if text.eq_ignore_ascii_case("true") {
        Some(Value::Bool(true))
    } else if text.eq_ignore_ascii_case("false") {
        Some(Value::Bool(false))
    } else {
        None
    }
}

/// Truthiness: absent, null, false, zero and empty values are false
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Equality with absent treated as null and numbers compared by value
pub fn values_equal(lhs: Option<&Value>, rhs: Option<&Value>) -> bool {
    let lhs = lhs.unwrap_or(&NULL);
    let rhs = rhs.unwrap_or(&NULL);

    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => lhs == rhs,
    }
}

/// Text output for a resolved value
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
