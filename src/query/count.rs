//! Row-count rewriting for query strings
//!
//! Only simple single-range queries are handled. Queries with subqueries,
//! unions, or several independent range declarations may be rewritten
//! incorrectly; write their count query by hand.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{RepoError, RepoResult};

fn from_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bfrom\b").expect("static pattern"))
}

fn order_by_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\border\s+by\b").expect("static pattern"))
}

/// Rewrite a list query into its row-count form
///
/// Keeps everything from the first `from` onward, drops a trailing
/// `order by` clause, and prefixes `select count(*)`.
pub fn count_query_for(query: &str) -> RepoResult<String> {
    let from = from_keyword()
        .find(query)
        .ok_or_else(|| RepoError::Query(format!("No 'from' clause in query: {}", query)))?;

    let mut range = &query[from.start()..];
    if let Some(order_by) = order_by_keyword().find(range) {
        range = &range[..order_by.start()];
    }

    Ok(format!("select count(*) {}", range.trim_end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_range() {
        assert_eq!(
            count_query_for("from User").unwrap(),
            "select count(*) from User"
        );
    }

    #[test]
    fn test_select_clause_and_order_by_removed() {
        assert_eq!(
            count_query_for("select u from User u where u.level > ? order by u.name desc")
                .unwrap(),
            "select count(*) from User u where u.level > ?"
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            count_query_for("FROM User WHERE name = ? ORDER  BY name").unwrap(),
            "select count(*) FROM User WHERE name = ?"
        );
    }

    #[test]
    fn test_keyword_must_be_a_whole_word() {
        assert_eq!(
            count_query_for("from Event where fromDate > ? order by fromDate").unwrap(),
            "select count(*) from Event where fromDate > ?"
        );
    }

    #[test]
    fn test_missing_from_is_rejected() {
        let err = count_query_for("select 1").unwrap_err();
        assert!(matches!(err, RepoError::Query(_)));
    }
}
