//! Change summaries between two snapshots
//!
//! A summary lists one `path: before -> after` line per changed field. The
//! shallow form stops at top-level fields; the detailed form follows nested
//! objects and equal-length arrays down to the changed leaves.

use serde_json::Value;

const MAX_TEXT_CHARS: usize = 47;

/// Summarise the changes between two snapshots, `None` if nothing changed
pub fn summarize(before: &Value, after: &Value, detailed: bool) -> Option<String> {
    let changes = changes(before, after, detailed);
    if changes.is_empty() {
        None
    } else {
        Some(changes.join(", "))
    }
}

/// One line per changed field
pub fn changes(before: &Value, after: &Value, detailed: bool) -> Vec<String> {
    let mut out = Vec::new();
    collect(before, after, "", detailed, &mut out);
    out
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn describe(path: &str, before: &str, after: &str) -> String {
    if path.is_empty() {
        format!("{} -> {}", before, after)
    } else {
        format!("{}: {} -> {}", path, before, after)
    }
}

fn collect(before: &Value, after: &Value, path: &str, detailed: bool, out: &mut Vec<String>) {
    if before == after {
        return;
    }

    // Only the root is always descended into; deeper levels need `detailed`
    let descend = detailed || path.is_empty();

    match (before, after) {
        (Value::Object(old), Value::Object(new)) if descend => {
            for (key, old_value) in old {
                let field = join_path(path, key);
                match new.get(key) {
                    Some(new_value) => collect(old_value, new_value, &field, detailed, out),
                    None => out.push(describe(&field, &format_value(old_value), "(removed)")),
                }
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    let field = join_path(path, key);
                    out.push(describe(&field, "(added)", &format_value(new_value)));
                }
            }
        }
        (Value::Array(old), Value::Array(new)) if detailed && old.len() == new.len() => {
            for (i, (old_item, new_item)) in old.iter().zip(new).enumerate() {
                collect(old_item, new_item, &format!("{}[{}]", path, i), detailed, out);
            }
        }
        _ => out.push(describe(path, &format_value(before), &format_value(after))),
    }
}

/// Short display form of a value
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.chars().count() > MAX_TEXT_CHARS + 3 => {
            let head: String = s.chars().take(MAX_TEXT_CHARS).collect();
            format!("\"{}...\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(fields) => format!("{{{} fields}}", fields.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_field_only() {
        let before = json!({"id": "42", "name": "alice", "level": 1});
        let after = json!({"id": "42", "name": "alice", "level": 2});

        assert_eq!(summarize(&before, &after, false).unwrap(), "level: 1 -> 2");
    }

    #[test]
    fn test_added_and_removed_fields() {
        let before = json!({"name": "alice", "nickname": "al"});
        let after = json!({"name": "alice", "email": "a@x.io"});

        let summary = summarize(&before, &after, false).unwrap();
        assert!(summary.contains("nickname: \"al\" -> (removed)"));
        assert!(summary.contains("email: (added) -> \"a@x.io\""));
    }

    #[test]
    fn test_no_changes() {
        let value = json!({"name": "alice", "level": 1});
        assert!(summarize(&value, &value, true).is_none());
    }

    #[test]
    fn test_shallow_summary_collapses_nested_values() {
        let before = json!({"profile": {"bio": "old"}, "roles": [1, 2]});
        let after = json!({"profile": {"bio": "new"}, "roles": [1, 2, 3]});

        let summary = summarize(&before, &after, false).unwrap();
        assert!(summary.contains("profile: {1 fields} -> {1 fields}"));
        assert!(summary.contains("roles: [2 items] -> [3 items]"));
    }

    #[test]
    fn test_detailed_summary_reaches_leaves() {
        let before = json!({"profile": {"bio": "old"}, "roles": [{"code": "A"}, {"code": "B"}]});
        let after = json!({"profile": {"bio": "new"}, "roles": [{"code": "A"}, {"code": "C"}]});

        let lines = changes(&before, &after, true);
        assert_eq!(
            lines,
            vec![
                "profile.bio: \"old\" -> \"new\"".to_string(),
                "roles[1].code: \"B\" -> \"C\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_object_snapshots() {
        assert_eq!(summarize(&json!(1), &json!(2), false).unwrap(), "1 -> 2");
    }

    #[test]
    fn test_long_text_is_truncated() {
        let before = json!({"bio": "é".repeat(100)});
        let after = json!({"bio": "short"});

        let summary = summarize(&before, &after, false).unwrap();
        assert!(summary.contains("...\""));
        assert!(summary.contains("\"short\""));
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(null)), "null");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!("x")), "\"x\"");
        assert_eq!(format_value(&json!([1, 2, 3])), "[3 items]");
        assert_eq!(format_value(&json!({"a": 1, "b": 2})), "{2 fields}");
    }
}
