//! Full-text search criteria
//!
//! Pre-populated with every searchable field of an entity type; callers add
//! a keyword, exact-value filters, numeric ranges and sort keys, then
//! `generate_query` produces the query handed to the search session.

use serde_json::Value;

use super::descriptor::Analyze;
use super::fields::SearchFieldIndex;

/// How a sort field's values are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortType {
    String,
    Int,
    Long,
    Float,
    Double,
}

impl SortType {
    pub fn is_numeric(&self) -> bool {
        !matches!(self, SortType::String)
    }
}

/// Sort key of a search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub sort_type: SortType,
    pub reverse: bool,
}

/// Exact-value filter on a field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub name: String,
    pub value: Value,
}

/// Inclusive numeric range filter; an open bound is `None`
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Query executed by a `SearchSession`
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub entity: &'static str,
    pub fields: Vec<(String, Analyze)>,
    pub keyword: Option<String>,
    pub filters: Vec<FieldFilter>,
    pub ranges: Vec<RangeFilter>,
    pub sorts: Vec<SortField>,
}

/// Builder for full-text queries over one entity type
#[derive(Debug, Clone)]
pub struct FullTextCriteria {
    entity: &'static str,
    fields: SearchFieldIndex,
    keyword: Option<String>,
    filters: Vec<FieldFilter>,
    ranges: Vec<RangeFilter>,
    sorts: Vec<SortField>,
}

impl FullTextCriteria {
    pub fn new(entity: &'static str, fields: SearchFieldIndex) -> Self {
        Self {
            entity,
            fields,
            keyword: None,
            filters: Vec::new(),
            ranges: Vec::new(),
            sorts: Vec::new(),
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn fields(&self) -> &SearchFieldIndex {
        &self.fields
    }

    /// Match rows containing the keyword in any searchable field
    pub fn set_keyword(&mut self, keyword: impl Into<String>) -> &mut Self {
        let keyword = keyword.into();
        self.keyword = if keyword.trim().is_empty() {
            None
        } else {
            Some(keyword)
        };
        self
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    /// Require a field to hold exactly this value
    pub fn add_filter_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.filters.push(FieldFilter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Require a numeric field to fall within `[min, max]`
    pub fn add_range_filter(
        &mut self,
        name: impl Into<String>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> &mut Self {
        self.ranges.push(RangeFilter {
            name: name.into(),
            min,
            max,
        });
        self
    }

    pub fn add_sort_asc(&mut self, name: impl Into<String>, sort_type: SortType) -> &mut Self {
        self.sorts.push(SortField {
            name: name.into(),
            sort_type,
            reverse: false,
        });
        self
    }

    pub fn add_sort_desc(&mut self, name: impl Into<String>, sort_type: SortType) -> &mut Self {
        self.sorts.push(SortField {
            name: name.into(),
            sort_type,
            reverse: true,
        });
        self
    }

    /// Build the query for the search session
    pub fn generate_query(&self) -> SearchQuery {
        SearchQuery {
            entity: self.entity,
            fields: self
                .fields
                .iter()
                .map(|(name, analyze)| (name.to_string(), analyze))
                .collect(),
            keyword: self.keyword.clone(),
            filters: self.filters.clone(),
            ranges: self.ranges.clone(),
            sorts: self.sorts.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::User;
    use serde_json::json;

    fn user_criteria() -> FullTextCriteria {
        FullTextCriteria::new("User", SearchFieldIndex::of::<User>())
    }

    #[test]
    fn test_query_carries_every_field() {
        let query = user_criteria().generate_query();
        assert_eq!(query.entity, "User");
        assert_eq!(query.fields.len(), 7);
        assert_eq!(query.fields[0], ("name".to_string(), Analyze::Analyzed));
        assert!(query.keyword.is_none());
    }

    #[test]
    fn test_blank_keyword_is_ignored() {
        let mut criteria = user_criteria();
        criteria.set_keyword("  ");
        assert_eq!(criteria.keyword(), None);
        criteria.set_keyword("alice");
        assert_eq!(criteria.keyword(), Some("alice"));
    }

    #[test]
    fn test_filters_and_sorts() {
        let mut criteria = user_criteria();
        criteria
            .add_filter_field("email", "a@b.c")
            .add_range_filter("level", Some(1.0), None)
            .add_sort_desc("level", SortType::Long);

        let query = criteria.generate_query();
        assert_eq!(query.filters[0].value, json!("a@b.c"));
        assert_eq!(query.ranges[0].min, Some(1.0));
        assert!(query.sorts[0].reverse);
        assert!(query.sorts[0].sort_type.is_numeric());
    }
}
