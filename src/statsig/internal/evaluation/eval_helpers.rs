use std::cmp::{max, Ordering};

use chrono::{DateTime, Datelike, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

pub fn compare_numbers(left: &Value, right: &Value, op: &str) -> Option<bool> {
    let left_num = value_to_f64(left)?;
    let right_num = value_to_f64(right)?;
    match op {
        "gt" => Some(left_num > right_num),
        "gte" => Some(left_num >= right_num),
        "lt" => Some(left_num < right_num),
        "lte" => Some(left_num <= right_num),
        _ => None,
    }
}

pub fn compare_versions(left: &Value, right: &Value, op: &str) -> Option<bool> {
    let left_str = strip_prerelease(value_to_string(left)?);
    let right_str = strip_prerelease(value_to_string(right)?);

    let result = version_ordering(&left_str, &right_str)?;
    match op {
        "version_gt" => Some(result == Ordering::Greater),
        "version_gte" => Some(result != Ordering::Less),
        "version_lt" => Some(result == Ordering::Less),
        "version_lte" => Some(result != Ordering::Greater),
        "version_eq" => Some(result == Ordering::Equal),
        "version_neq" => Some(result != Ordering::Equal),
        _ => None,
    }
}

// "1.2.3-beta" -> "1.2.3". A leading dash is left alone.
fn strip_prerelease(version: String) -> String {
    match version.find('-') {
        Some(index) if index > 0 => version[0..index].to_string(),
        _ => version,
    }
}

// Missing segments count as zero, so "1.2" == "1.2.0". Any non-numeric segment yields None.
fn version_ordering(left: &str, right: &str) -> Option<Ordering> {
    let left_parts: Vec<&str> = left.split('.').collect();
    let right_parts: Vec<&str> = right.split('.').collect();

    for i in 0..max(left_parts.len(), right_parts.len()) {
        let left_count: i64 = match left_parts.get(i) {
            Some(part) => part.parse().ok()?,
            None => 0,
        };
        let right_count: i64 = match right_parts.get(i) {
            Some(part) => part.parse().ok()?,
            None => 0,
        };

        match left_count.cmp(&right_count) {
            Ordering::Equal => continue,
            ordering => return Some(ordering),
        }
    }

    Some(Ordering::Equal)
}

pub fn compare_strings_in_array(value: &Value, array: &Value, op: &str, ignore_case: bool) -> bool {
    let comparison = || {
        let value_str = value_to_string(value)?;
        let left = if ignore_case {
            value_str.to_lowercase()
        } else {
            value_str
        };

        Some(array.as_array()?.iter().any(|current| {
            let curr_str = match value_to_string(current) {
                Some(s) => s,
                _ => return false,
            };
            let right = if ignore_case {
                curr_str.to_lowercase()
            } else {
                curr_str
            };

            match op {
                "any" | "none" | "any_case_sensitive" | "none_case_sensitive" => left == right,
                "str_starts_with_any" => left.starts_with(&right),
                "str_ends_with_any" => left.ends_with(&right),
                "str_contains_any" | "str_contains_none" => left.contains(&right),
                _ => false,
            }
        }))
    };

    let res = comparison().unwrap_or(false);

    if op == "none" || op == "none_case_sensitive" || op == "str_contains_none" {
        return !res;
    }
    res
}

pub fn compare_str_with_regex(value: &Value, regex_value: &Value) -> bool {
    let comparison = || {
        let value_str = value_to_string(value)?;
        let regex_str = value_to_string(regex_value)?;
        let regex = Regex::new(&regex_str).ok()?;
        Some(regex.is_match(&value_str))
    };

    comparison().unwrap_or(false)
}

pub fn compare_time(left: &Value, right: &Value, op: &str) -> Option<bool> {
    let left_time = value_to_date_time(left)?;
    let right_time = value_to_date_time(right)?;

    match op {
        "before" => Some(left_time < right_time),
        "after" => Some(left_time > right_time),
        "on" => Some(
            left_time.year() == right_time.year() && left_time.ordinal() == right_time.ordinal(),
        ),
        _ => None,
    }
}

pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        _ => Some(format!("{}", value)),
    }
}

// Epoch milliseconds (number or numeric string), or an RFC 3339 timestamp.
fn value_to_date_time(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(millis) = value_to_i64(value) {
        return Utc.timestamp_millis_opt(millis).single();
    }

    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_compare_across_strings_and_numbers() {
        assert_eq!(compare_numbers(&json!("10"), &json!(9), "gt"), Some(true));
        assert_eq!(compare_numbers(&json!(9.5), &json!("9.5"), "gte"), Some(true));
        assert_eq!(compare_numbers(&json!(1), &json!(2), "lte"), Some(true));
        assert_eq!(compare_numbers(&json!("abc"), &json!(2), "lt"), None);
        assert_eq!(compare_numbers(&Value::Null, &json!(2), "lt"), None);
    }

    #[test]
    fn versions_ignore_prerelease_suffix() {
        assert_eq!(compare_versions(&json!("1.2.3-beta"), &json!("1.2.3"), "version_eq"), Some(true));
        assert_eq!(compare_versions(&json!("1.10"), &json!("1.9.9"), "version_gt"), Some(true));
        assert_eq!(compare_versions(&json!("1.2"), &json!("1.2.0"), "version_eq"), Some(true));
        assert_eq!(compare_versions(&json!("2.0"), &json!("10.0"), "version_lt"), Some(true));
        assert_eq!(compare_versions(&json!("3.0.1"), &json!("3.0.0"), "version_neq"), Some(true));
        assert_eq!(compare_versions(&json!("3.0.0"), &json!("3.0.0"), "version_lte"), Some(true));
    }

    #[test]
    fn non_numeric_version_segment_is_not_comparable() {
        assert_eq!(compare_versions(&json!("1.a.3"), &json!("1.2.3"), "version_gt"), None);
        assert_eq!(compare_versions(&json!("v1.0"), &json!("1.0"), "version_lt"), None);
        assert_eq!(compare_versions(&Value::Null, &json!("1.0"), "version_lt"), None);
    }

    #[test]
    fn string_array_membership() {
        let targets = json!(["Apple", "banana", 42]);

        assert!(compare_strings_in_array(&json!("apple"), &targets, "any", true));
        assert!(!compare_strings_in_array(&json!("apple"), &targets, "any_case_sensitive", false));
        assert!(compare_strings_in_array(&json!(42), &targets, "any", true));
        assert!(compare_strings_in_array(&json!("cherry"), &targets, "none", true));
        assert!(compare_strings_in_array(&json!("apple"), &targets, "none_case_sensitive", false));
        assert!(compare_strings_in_array(&json!("Bananarama"), &targets, "str_starts_with_any", true));
        assert!(compare_strings_in_array(&json!("pineapple"), &targets, "str_ends_with_any", true));
        assert!(compare_strings_in_array(&json!("a banana split"), &targets, "str_contains_any", true));
        assert!(!compare_strings_in_array(&json!("a banana split"), &targets, "str_contains_none", true));
    }

    #[test]
    fn missing_value_matches_nothing() {
        let targets = json!(["a"]);
        assert!(!compare_strings_in_array(&Value::Null, &targets, "any", true));
        assert!(compare_strings_in_array(&Value::Null, &targets, "none", true));
        assert!(!compare_strings_in_array(&json!("a"), &json!("a"), "any", true));
    }

    #[test]
    fn regex_tests_containment() {
        assert!(compare_str_with_regex(&json!("user@statsig.com"), &json!("@statsig\\.com$")));
        assert!(compare_str_with_regex(&json!("abc123"), &json!("[0-9]+")));
        assert!(!compare_str_with_regex(&json!("abc"), &json!("[0-9]+")));
        assert!(!compare_str_with_regex(&json!("abc"), &json!("(unclosed")));
    }

    #[test]
    fn time_comparisons() {
        // 2024-01-15T10:00:00Z and 2024-01-15T23:00:00Z
        let morning = json!(1705312800000i64);
        let night = json!("1705359600000");

        assert_eq!(compare_time(&morning, &night, "before"), Some(true));
        assert_eq!(compare_time(&night, &morning, "after"), Some(true));
        assert_eq!(compare_time(&morning, &night, "on"), Some(true));
        assert_eq!(compare_time(&morning, &json!("2024-01-16T01:00:00Z"), "on"), Some(false));
        assert_eq!(compare_time(&morning, &json!("not a date"), "before"), None);
    }
}
