//! Full-text search through the repository
//!
//! An entity type whose index has not been built yet is treated as having
//! no matches: the miss is logged and an empty result returned.

use serde_json::Value;
use tracing::warn;

use super::{from_records, Repository};
use crate::error::{RepoError, RepoResult};
use crate::models::{Entity, Page};
use crate::search::{FullTextCriteria, SortType};

impl<T: Entity> Repository<T> {
    fn check_full_text(&self, criteria: &FullTextCriteria) -> RepoResult<()> {
        if criteria.entity() != T::ENTITY_NAME {
            return Err(RepoError::Validation(format!(
                "Full-text criteria for {} used with the {} repository",
                criteria.entity(),
                T::ENTITY_NAME
            )));
        }
        Ok(())
    }

    fn tolerate_missing_index<R: Default>(result: RepoResult<R>) -> RepoResult<R> {
        match result {
            Err(e) if e.is_index_not_ready() => {
                warn!(entity = T::ENTITY_NAME, "full-text index not built yet");
                Ok(R::default())
            }
            other => other,
        }
    }

    /// Full-text criteria pre-populated with every searchable field of `T`
    pub fn create_full_text_criteria(&self) -> FullTextCriteria {
        FullTextCriteria::new(T::ENTITY_NAME, self.search_fields.clone())
    }

    pub fn search_by(&self, criteria: &FullTextCriteria) -> RepoResult<Vec<T>> {
        self.check_full_text(criteria)?;
        let rows = self
            .full_text_session()
            .search(&criteria.generate_query(), None);
        from_records(Self::tolerate_missing_index(rows)?)
    }

    pub fn search_all(&self) -> RepoResult<Vec<T>> {
        self.search_by(&self.create_full_text_criteria())
    }

    pub fn search_all_ordered(
        &self,
        order_by: &str,
        ascending: bool,
        sort_type: SortType,
    ) -> RepoResult<Vec<T>> {
        let mut criteria = self.create_full_text_criteria();
        if ascending {
            criteria.add_sort_asc(order_by, sort_type);
        } else {
            criteria.add_sort_desc(order_by, sort_type);
        }
        self.search_by(&criteria)
    }

    /// Zero or one search hit; several hits are `NonUniqueResult`
    pub fn search_unique(&self, criteria: &FullTextCriteria) -> RepoResult<Option<T>> {
        let mut hits = self.search_by(criteria)?;
        match hits.len() {
            0 | 1 => Ok(hits.pop()),
            count => Err(RepoError::NonUniqueResult { count }),
        }
    }

    pub fn search_unique_by(&self, field: &str, value: impl Into<Value>) -> RepoResult<Option<T>> {
        let mut criteria = self.create_full_text_criteria();
        criteria.add_filter_field(field, value);
        self.search_unique(&criteria)
    }

    /// One page of search hits
    pub fn search_page(
        &self,
        criteria: &FullTextCriteria,
        page_no: usize,
        page_size: usize,
    ) -> RepoResult<Page<T>> {
        if page_size == 0 {
            return Err(RepoError::Validation("Page size must be at least 1".into()));
        }

        let total = self.count_search(criteria)?;
        if total < 1 {
            return Ok(Page::empty(page_no, page_size));
        }

        let mut page = Page::new(total, page_no, page_size);
        let rows = self
            .full_text_session()
            .search(&criteria.generate_query(), Some(page.paging()));
        page.contents = from_records(Self::tolerate_missing_index(rows)?)?;
        Ok(page)
    }

    /// Number of search hits; zero when the index does not exist yet
    pub fn count_search(&self, criteria: &FullTextCriteria) -> RepoResult<usize> {
        self.check_full_text(criteria)?;
        let size = self
            .full_text_session()
            .result_size(&criteria.generate_query());
        Self::tolerate_missing_index(size)
    }
}
