//! Record evaluation helpers for the in-memory session
//!
//! Field paths are dotted; arrays along a path are flattened so that
//! `roles.name` reaches the name of every role.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::Regex;
use serde_json::Value;

use crate::error::{RepoError, RepoResult};
use crate::query::{Order, Restriction};

/// Value at a dotted path, without descending into arrays
pub fn field<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |value, segment| value.as_object()?.get(segment))
}

/// Every value reachable at a dotted path, flattening arrays on the way
pub fn values_at<'a>(record: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current = vec![record];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(child) = map.get(segment) {
                        next.push(child);
                    }
                }
                Value::Array(items) => {
                    for item in items {
                        if let Some(child) = item.as_object().and_then(|m| m.get(segment)) {
                            next.push(child);
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    current
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        })
        .collect()
}

/// Plain text of a scalar value
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Lower-cased alphanumeric tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order used for sorting: null < bool < number < string < array < object
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Equality that treats `1` and `1.0` as the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Bool(_), Value::Bool(_))
    )
}

/// Compile a `%`/`_` pattern into an anchored regex
pub fn like_to_regex(pattern: &str) -> RepoResult<Regex> {
    let mut expr = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| RepoError::Query(format!("Invalid like pattern '{}': {}", pattern, e)))
}

/// Restrictions ready to run against records
///
/// Like patterns are compiled once, when the filter is built. Evaluation uses
/// SQL's three-valued logic. A comparison involving a missing or null field
/// is unknown, and negating unknown leaves it unknown. Only rows whose
/// restrictions are all true pass.
pub struct Filter<'a> {
    restrictions: &'a [Restriction],
    patterns: HashMap<&'a str, Regex>,
}

impl<'a> Filter<'a> {
    pub fn new(restrictions: &'a [Restriction]) -> RepoResult<Self> {
        let mut patterns = HashMap::new();
        for restriction in restrictions {
            compile_patterns(restriction, &mut patterns)?;
        }
        Ok(Self {
            restrictions,
            patterns,
        })
    }

    /// Check a record against every restriction
    pub fn matches(&self, record: &Value) -> bool {
        self.restrictions
            .iter()
            .all(|restriction| self.truth(record, restriction) == Some(true))
    }

    /// `None` is SQL's unknown
    fn truth(&self, record: &Value, restriction: &Restriction) -> Option<bool> {
        match restriction {
            Restriction::Eq(name, value) => {
                let actual = present(record, name)?;
                (!value.is_null()).then(|| values_equal(actual, value))
            }
            Restriction::Ne(name, value) => {
                let actual = present(record, name)?;
                (!value.is_null()).then(|| !values_equal(actual, value))
            }
            Restriction::Gt(name, value) => ordered(record, name, value, Ordering::is_gt),
            Restriction::Ge(name, value) => ordered(record, name, value, Ordering::is_ge),
            Restriction::Lt(name, value) => ordered(record, name, value, Ordering::is_lt),
            Restriction::Le(name, value) => ordered(record, name, value, Ordering::is_le),
            Restriction::Like(name, pattern) => {
                let actual = present(record, name)?;
                let regex = self.patterns.get(pattern.as_str())?;
                Some(actual.as_str().is_some_and(|text| regex.is_match(text)))
            }
            Restriction::In(name, values) => {
                let actual = present(record, name)?;
                Some(values.iter().any(|candidate| values_equal(actual, candidate)))
            }
            Restriction::IsNull(name) => Some(present(record, name).is_none()),
            Restriction::IsNotNull(name) => Some(present(record, name).is_some()),
            Restriction::Not(inner) => self.truth(record, inner).map(|hit| !hit),
            Restriction::And(all) => {
                let mut result = Some(true);
                for inner in all {
                    match self.truth(record, inner) {
                        Some(false) => return Some(false),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Restriction::Or(any) => {
                let mut result = Some(false);
                for inner in any {
                    match self.truth(record, inner) {
                        Some(true) => return Some(true),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
        }
    }
}

fn compile_patterns<'a>(
    restriction: &'a Restriction,
    patterns: &mut HashMap<&'a str, Regex>,
) -> RepoResult<()> {
    match restriction {
        Restriction::Like(_, pattern) => {
            if !patterns.contains_key(pattern.as_str()) {
                patterns.insert(pattern.as_str(), like_to_regex(pattern)?);
            }
        }
        Restriction::Not(inner) => compile_patterns(inner, patterns)?,
        Restriction::And(all) | Restriction::Or(all) => {
            for inner in all {
                compile_patterns(inner, patterns)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Non-null value at a path
fn present<'a>(record: &'a Value, name: &str) -> Option<&'a Value> {
    field(record, name).filter(|value| !value.is_null())
}

fn ordered(record: &Value, name: &str, value: &Value, accept: fn(Ordering) -> bool) -> Option<bool> {
    let actual = present(record, name)?;
    if value.is_null() {
        return None;
    }
    Some(comparable(actual, value) && accept(compare(actual, value)))
}

/// Stable sort by a list of order keys
pub fn sort_records(records: &mut [Value], orders: &[Order]) {
    if orders.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for order in orders {
            let left = field(a, &order.property).unwrap_or(&Value::Null);
            let right = field(b, &order.property).unwrap_or(&Value::Null);
            let ordering = compare(left, right);
            let ordering = if order.ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(record: &Value, restriction: Restriction) -> bool {
        let restrictions = [restriction];
        Filter::new(&restrictions).unwrap().matches(record)
    }

    fn record() -> Value {
        json!({
            "name": "Alice Smith",
            "level": 3,
            "email": null,
            "roles": [{"name": "Admin"}, {"name": "Editor"}],
            "profile": {"bio": "Rust developer"}
        })
    }

    #[test]
    fn test_field_paths() {
        let r = record();
        assert_eq!(field(&r, "level"), Some(&json!(3)));
        assert_eq!(field(&r, "profile.bio"), Some(&json!("Rust developer")));
        assert_eq!(field(&r, "missing"), None);
        assert_eq!(
            values_at(&r, "roles.name"),
            vec![&json!("Admin"), &json!("Editor")]
        );
    }

    #[test]
    fn test_null_and_missing_fields() {
        let r = record();
        assert!(check(&r, Restriction::is_null("email")));
        assert!(check(&r, Restriction::is_null("missing")));
        assert!(!check(&r, Restriction::is_not_null("email")));
        assert!(!check(&r, Restriction::ne("email", "x")));
        assert!(!check(&r, Restriction::eq("email", "x")));
    }

    #[test]
    fn test_comparisons() {
        let r = record();
        assert!(check(&r, Restriction::eq("level", 3.0)));
        assert!(check(&r, Restriction::gt("level", 2)));
        assert!(!check(&r, Restriction::gt("level", "2")));
        assert!(check(&r, Restriction::le("level", 3)));
        assert!(check(&r, Restriction::is_in("level", [1, 3])));
    }

    #[test]
    fn test_like_and_boolean_combinators() {
        let r = record();
        assert!(check(&r, Restriction::like("name", "Ali%")));
        assert!(check(&r, Restriction::like("name", "Alice_Smith")));
        assert!(!check(&r, Restriction::like("name", "Bob%")));
        assert!(check(
            &r,
            Restriction::or([Restriction::eq("level", 1), Restriction::like("name", "%Smith")])
        ));
        assert!(!check(&r, Restriction::not(Restriction::eq("level", 3))));
    }

    #[test]
    fn test_negation_over_null_stays_unknown() {
        let r = record();
        assert!(!check(&r, Restriction::not(Restriction::eq("email", "a@x.io"))));
        assert!(!check(&r, Restriction::not(Restriction::like("email", "a%"))));
        assert!(!check(&r, Restriction::not(Restriction::is_in("missing", ["x"]))));
        assert!(!check(&r, Restriction::not(Restriction::gt("email", 1))));

        // Unknown or true is true; unknown and false is false
        assert!(check(
            &r,
            Restriction::or([Restriction::eq("email", "x"), Restriction::eq("level", 3)])
        ));
        assert!(check(
            &r,
            Restriction::not(Restriction::and([
                Restriction::eq("email", "x"),
                Restriction::eq("level", 1),
            ]))
        ));
        assert!(!check(
            &r,
            Restriction::not(Restriction::or([
                Restriction::eq("email", "x"),
                Restriction::eq("level", 1),
            ]))
        ));
    }

    #[test]
    fn test_like_patterns_compile_once() {
        let restrictions = [Restriction::like("name", "Ali%"), Restriction::like("name", "Ali%")];
        let filter = Filter::new(&restrictions).unwrap();
        assert_eq!(filter.patterns.len(), 1);
        assert!(filter.matches(&record()));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Hello, World-42!"), vec!["hello", "world", "42"]);
    }

    #[test]
    fn test_sort_records() {
        let mut records = vec![
            json!({"name": "b", "level": 1}),
            json!({"name": "a", "level": 2}),
            json!({"name": "c"}),
        ];
        sort_records(&mut records, &[Order::desc("level")]);
        assert_eq!(records[0]["name"], "a");
        assert_eq!(records[2]["name"], "c");

        sort_records(&mut records, &[Order::asc("name")]);
        assert_eq!(records[0]["name"], "a");
    }
}
