//! Empty-vs-absent normalization applied before any comparison.
//!
//! The remote API reports "not set" in several ways: an omitted field, an
//! empty string, `false`, an empty nested object, or the JSON literal `null`.
//! Every helper here collapses those onto `None` / empty so two values that
//! mean the same thing compare equal.

use serde_json::Value;

/// Empty string → `None`.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

pub fn non_empty_owned(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Optional strings equal under empty-vs-absent.
pub fn same_str(a: Option<&str>, b: Option<&str>) -> bool {
    non_empty(a) == non_empty(b)
}

/// `Some(false)` → `None`; the remote sends `cluster: false` for "not a cluster resource".
pub fn flag(value: Option<bool>) -> Option<bool> {
    value.filter(|v| *v)
}

/// Free-form JSON where `null` and `{}` both mean absent.
pub fn json_value(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        Some(Value::String(s)) if s.is_empty() || s == "null" => None,
        Some(v) => Some(v),
    }
}

/// Remote masks secrets down to their last four characters.
pub fn secret_tail(value: Option<&str>) -> Option<&str> {
    let value = non_empty(value)?;
    let count = value.chars().count();
    if count <= 4 {
        return Some(value);
    }
    let start = value
        .char_indices()
        .nth(count - 4)
        .map(|(i, _)| i)
        .unwrap_or(0);
    Some(&value[start..])
}

pub fn same_secret(a: Option<&str>, b: Option<&str>) -> bool {
    secret_tail(a) == secret_tail(b)
}

/// Compare string lists ignoring order.
pub fn same_set(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut left: Vec<&str> = a.iter().map(String::as_str).collect();
    let mut right: Vec<&str> = b.iter().map(String::as_str).collect();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_string_is_absent() {
        assert!(same_str(Some(""), None));
        assert!(!same_str(Some("a"), None));
    }

    #[test]
    fn test_false_flag_is_absent() {
        assert_eq!(flag(Some(false)), None);
        assert_eq!(flag(Some(true)), Some(true));
    }

    #[test]
    fn test_json_null_literals() {
        let null = Value::Null;
        let empty = json!({});
        let literal = json!("null");
        let real = json!({"a": 1});
        assert!(json_value(Some(&null)).is_none());
        assert!(json_value(Some(&empty)).is_none());
        assert!(json_value(Some(&literal)).is_none());
        assert!(json_value(Some(&real)).is_some());
    }

    #[test]
    fn test_secret_tail_matches_masked_value() {
        assert!(same_secret(Some("supersecretabcd"), Some("****************abcd")));
        assert!(!same_secret(Some("supersecretabcd"), Some("****wxyz")));
        assert_eq!(secret_tail(Some("abc")), Some("abc"));
    }

    #[test]
    fn test_same_set_ignores_order() {
        let a = vec!["GROUP_OWNER".to_string(), "GROUP_READ_ONLY".to_string()];
        let b = vec!["GROUP_READ_ONLY".to_string(), "GROUP_OWNER".to_string()];
        assert!(same_set(&a, &b));
        assert!(!same_set(&a, &b[..1]));
    }
}
