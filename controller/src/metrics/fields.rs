//! Lenient JSON field lookup. Every accessor returns `None` for a missing,
//! null, non-finite or wrongly typed field instead of failing.

use serde_json::Value;

pub(crate) fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .filter(|found| !found.is_null())
}

pub(crate) fn object<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    at(value, path).filter(|found| found.is_object())
}

/// Numbers and numeric strings both count; the service has sent either.
pub(crate) fn number(value: &Value, path: &[&str]) -> Option<f64> {
    let parsed = match at(value, path)? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// First present number in `candidates`, most specific first.
pub(crate) fn first_number(value: &Value, candidates: &[&[&str]]) -> Option<f64> {
    candidates.iter().find_map(|path| number(value, path))
}

pub(crate) fn text(value: &Value, path: &[&str]) -> Option<String> {
    match at(value, path)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn first_text(value: &Value, candidates: &[&[&str]]) -> Option<String> {
    candidates.iter().find_map(|path| text(value, path))
}

/// A list of strings, or a single string promoted to a one-element list.
pub(crate) fn string_list(value: &Value, path: &[&str]) -> Vec<String> {
    match at(value, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(Value::String(text)) if !text.trim().is_empty() => vec![text.clone()],
        _ => Vec::new(),
    }
}

pub(crate) fn has_any_number(value: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|key| number(value, &[key]).is_some())
}

/// Sum of the present values, or `None` when none are present.
pub(crate) fn sum_present(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .copied()
        .reduce(|total, value| total + value)
}
