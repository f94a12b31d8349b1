//! Storage session boundary
//!
//! The repository talks to the underlying store only through these traits.
//! Records cross the boundary as JSON objects keyed by entity name and id.

use std::sync::Arc;

use serde_json::Value;

use crate::error::RepoResult;
use crate::models::Paging;
use crate::query::{CountQuery, Criteria};
use crate::search::SearchQuery;

/// Transactional read/write/query access for one unit of work
pub trait Session: Send + Sync {
    /// Fetch a record by id
    fn get(&self, entity: &'static str, id: &str) -> RepoResult<Option<Value>>;

    /// Insert a new record; fails with `Duplicate` if the id is taken
    fn insert(&self, entity: &'static str, id: &str, record: Value) -> RepoResult<()>;

    /// Replace an existing record; fails with `NotFound` if it is missing
    fn update(&self, entity: &'static str, id: &str, record: Value) -> RepoResult<()>;

    /// Insert or replace a record
    fn upsert(&self, entity: &'static str, id: &str, record: Value) -> RepoResult<()>;

    /// Delete a record, returning whether it existed
    fn delete(&self, entity: &'static str, id: &str) -> RepoResult<bool>;

    /// Records matching a criteria, ordered and optionally windowed
    fn list(&self, criteria: &Criteria, paging: Option<Paging>) -> RepoResult<Vec<Value>>;

    /// Zero or one record; more than one match is `NonUniqueResult`
    fn unique(&self, criteria: &Criteria) -> RepoResult<Option<Value>>;

    /// Row count for a count-shaped query
    fn count(&self, query: &CountQuery) -> RepoResult<usize>;

    /// Run a query string with positional `?` parameters
    fn query(&self, query: &str, params: &[Value], paging: Option<Paging>) -> RepoResult<Vec<Value>>;

    /// Run a `select count(*)` query string
    fn query_count(&self, query: &str, params: &[Value]) -> RepoResult<usize>;

    /// Run a set-based update/delete statement, returning affected rows
    fn execute_update(&self, statement: &str, params: &[Value]) -> RepoResult<usize>;
}

/// Full-text index access layered over a session
pub trait SearchSession: Send + Sync {
    /// Number of matching rows; `IndexNotReady` if the entity has no index yet
    fn result_size(&self, query: &SearchQuery) -> RepoResult<usize>;

    /// Matching rows, sorted and optionally windowed
    fn search(&self, query: &SearchQuery, paging: Option<Paging>) -> RepoResult<Vec<Value>>;
}

/// Source of the ambient sessions for the current unit of work
pub trait SessionContext: Send + Sync {
    fn current_session(&self) -> Arc<dyn Session>;

    fn current_full_text_session(&self) -> Arc<dyn SearchSession>;
}
