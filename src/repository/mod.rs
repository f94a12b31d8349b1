//! Generic entity repository
//!
//! `Repository<T>` gives every entity type the same CRUD, criteria listing,
//! paging, counting and full-text surface. It holds no state of its own
//! besides the search field index; every call goes through the sessions of
//! the current unit of work handed out by a `SessionContext`.

mod query;
mod search;

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{RepoError, RepoResult};
use crate::models::{generate_id, Entity};
use crate::search::SearchFieldIndex;
use crate::storage::{SearchSession, Session, SessionContext};

/// Fetch the stored record of an entity by name and id
///
/// Shared by `Repository::get` and audit snapshot resolution so both see the
/// same state.
pub(crate) fn fetch_record(
    context: &dyn SessionContext,
    entity: &'static str,
    id: &str,
) -> RepoResult<Option<Value>> {
    context.current_session().get(entity, id)
}

pub(crate) fn to_record<T: Entity>(entity: &T) -> RepoResult<Value> {
    Ok(serde_json::to_value(entity)?)
}

pub(crate) fn from_record<T: Entity>(record: Value) -> RepoResult<T> {
    Ok(serde_json::from_value(record)?)
}

fn from_records<T: Entity>(records: Vec<Value>) -> RepoResult<Vec<T>> {
    records.into_iter().map(from_record).collect()
}

/// Repository for one entity type
pub struct Repository<T: Entity> {
    context: Arc<dyn SessionContext>,
    search_fields: SearchFieldIndex,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            search_fields: self.search_fields.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity", &T::ENTITY_NAME)
            .field("search_fields", &self.search_fields)
            .finish()
    }
}

/// Lazy handle to an entity that is only read when realised
pub struct Reference<'a, T: Entity> {
    repository: &'a Repository<T>,
    id: String,
}

impl<T: Entity> Reference<'_, T> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read the entity, failing with `NotFound` if it does not exist
    pub fn get(&self) -> RepoResult<T> {
        self.repository
            .get(&self.id)?
            .ok_or_else(|| RepoError::not_found(T::ENTITY_NAME, self.id.clone()))
    }
}

impl<T: Entity> Repository<T> {
    /// Create a repository, building the search field index of `T`
    pub fn new(context: Arc<dyn SessionContext>) -> Self {
        let search_fields = SearchFieldIndex::of::<T>();
        debug!(
            entity = T::ENTITY_NAME,
            search_fields = search_fields.len(),
            "created repository"
        );
        Self {
            context,
            search_fields,
            _entity: PhantomData,
        }
    }

    /// Searchable fields of `T`, in declaration order
    pub fn search_fields(&self) -> &SearchFieldIndex {
        &self.search_fields
    }

    pub fn context(&self) -> &Arc<dyn SessionContext> {
        &self.context
    }

    pub fn session(&self) -> Arc<dyn Session> {
        self.context.current_session()
    }

    pub fn full_text_session(&self) -> Arc<dyn SearchSession> {
        self.context.current_full_text_session()
    }

    fn require_id(entity: &T) -> RepoResult<&str> {
        entity.persistent_id().ok_or_else(|| {
            RepoError::Validation(format!("{} has no identifier", T::ENTITY_NAME))
        })
    }

    fn assign_id(entity: &mut T) -> String {
        match entity.persistent_id() {
            Some(id) => id.to_string(),
            None => {
                let id = generate_id();
                entity.set_id(id.clone());
                id
            }
        }
    }

    /// Read an entity by id; a missing row is `None`
    pub fn get(&self, id: &str) -> RepoResult<Option<T>> {
        fetch_record(self.context.as_ref(), T::ENTITY_NAME, id)?
            .map(from_record)
            .transpose()
    }

    /// Reference an entity by id without reading it yet
    pub fn load(&self, id: impl Into<String>) -> Reference<'_, T> {
        Reference {
            repository: self,
            id: id.into(),
        }
    }

    /// Insert a new entity, assigning an id if it has none
    pub fn persist(&self, entity: &mut T) -> RepoResult<()> {
        let id = Self::assign_id(entity);
        self.session()
            .insert(T::ENTITY_NAME, &id, to_record(entity)?)?;
        debug!(entity = T::ENTITY_NAME, id = %id, "persisted");
        Ok(())
    }

    /// Insert or update an entity, returning its id
    pub fn save(&self, entity: &mut T) -> RepoResult<String> {
        let id = Self::assign_id(entity);
        self.session()
            .upsert(T::ENTITY_NAME, &id, to_record(entity)?)?;
        debug!(entity = T::ENTITY_NAME, id = %id, "saved");
        Ok(id)
    }

    /// Overwrite an existing entity
    pub fn update(&self, entity: &T) -> RepoResult<()> {
        let id = Self::require_id(entity)?;
        self.session()
            .update(T::ENTITY_NAME, id, to_record(entity)?)?;
        debug!(entity = T::ENTITY_NAME, id = %id, "updated");
        Ok(())
    }

    /// Copy the entity's state into the store and return the stored copy
    ///
    /// The argument is left untouched; a transient value gets a fresh id on
    /// the returned copy only.
    pub fn merge(&self, entity: &T) -> RepoResult<T> {
        let mut managed = entity.clone();
        let id = Self::assign_id(&mut managed);
        self.session()
            .upsert(T::ENTITY_NAME, &id, to_record(&managed)?)?;

        self.get(&id)?
            .ok_or_else(|| RepoError::not_found(T::ENTITY_NAME, id))
    }

    /// Insert an entity under its existing id; a taken id is `Duplicate`
    pub fn replicate(&self, entity: &T) -> RepoResult<()> {
        let id = Self::require_id(entity)?;
        self.session()
            .insert(T::ENTITY_NAME, id, to_record(entity)?)?;
        debug!(entity = T::ENTITY_NAME, id = %id, "replicated");
        Ok(())
    }

    /// Delete an entity
    pub fn remove(&self, entity: &T) -> RepoResult<()> {
        self.remove_by_id(Self::require_id(entity)?)
    }

    /// Delete an entity by id, failing with `NotFound` if it is missing
    pub fn remove_by_id(&self, id: &str) -> RepoResult<()> {
        if !self.session().delete(T::ENTITY_NAME, id)? {
            return Err(RepoError::not_found(T::ENTITY_NAME, id));
        }
        debug!(entity = T::ENTITY_NAME, id = %id, "removed");
        Ok(())
    }

    /// Delete several entities by id, one at a time
    ///
    /// Stops at the first failure; the ids before it stay removed.
    pub fn remove_by_ids<I>(&self, ids: I) -> RepoResult<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for id in ids {
            self.remove_by_id(id.as_ref())?;
        }
        Ok(())
    }

    /// Delete several entities, one at a time
    pub fn remove_all(&self, entities: &[T]) -> RepoResult<()> {
        for entity in entities {
            self.remove(entity)?;
        }
        Ok(())
    }

    /// Delete every row whose field equals the value, as one statement
    ///
    /// `Value::Null` deletes the rows where the field is null. Returns the
    /// number of rows removed.
    pub fn remove_by(&self, field: &str, value: impl Into<Value>) -> RepoResult<usize> {
        let value = value.into();
        let removed = if value.is_null() {
            let statement = format!("delete from {} where {} is null", T::ENTITY_NAME, field);
            self.session().execute_update(&statement, &[])?
        } else {
            let statement = format!("delete from {} where {} = ?", T::ENTITY_NAME, field);
            self.session().execute_update(&statement, &[value])?
        };
        debug!(entity = T::ENTITY_NAME, field, removed, "removed by field");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_context, Note, User};
    use serde_json::json;

    fn users() -> (Arc<crate::storage::MemorySession>, Repository<User>) {
        let (session, context) = memory_context();
        (session, Repository::new(context))
    }

    #[test]
    fn test_persist_assigns_id() {
        let (_, repo) = users();
        let mut user = User::new("alice", 1);
        repo.persist(&mut user).unwrap();

        let id = user.id.clone().unwrap();
        assert_eq!(repo.get(&id).unwrap(), Some(user));
    }

    #[test]
    fn test_persist_existing_id_is_duplicate() {
        let (_, repo) = users();
        let mut user = User::with_id("7", "alice", 1);
        repo.persist(&mut user).unwrap();

        let mut again = User::with_id("7", "bob", 2);
        let err = repo.persist(&mut again).unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_, repo) = users();
        assert_eq!(repo.get("nope").unwrap(), None);
    }

    #[test]
    fn test_load_realises_lazily() {
        let (_, repo) = users();
        let reference = repo.load("42");
        assert_eq!(reference.id(), "42");
        assert!(reference.get().unwrap_err().is_not_found());

        let mut user = User::with_id("42", "alice", 1);
        repo.save(&mut user).unwrap();
        assert_eq!(reference.get().unwrap().name, "alice");
    }

    #[test]
    fn test_save_inserts_then_updates() {
        let (session, repo) = users();
        let mut user = User::new("alice", 1);
        let id = repo.save(&mut user).unwrap();

        user.level = 5;
        assert_eq!(repo.save(&mut user).unwrap(), id);
        assert_eq!(session.row_count("User").unwrap(), 1);
        assert_eq!(repo.get(&id).unwrap().unwrap().level, 5);
    }

    #[test]
    fn test_update_requires_existing_row() {
        let (_, repo) = users();
        let err = repo.update(&User::with_id("1", "alice", 1)).unwrap_err();
        assert!(err.is_not_found());

        let err = repo.update(&User::new("alice", 1)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_merge_returns_stored_copy() {
        let (_, repo) = users();
        let transient = User::new("alice", 1);
        let managed = repo.merge(&transient).unwrap();

        assert!(transient.is_transient());
        let id = managed.id.clone().unwrap();
        assert_eq!(repo.get(&id).unwrap(), Some(managed));
    }

    #[test]
    fn test_replicate_keeps_id_and_rejects_taken_id() {
        let (_, repo) = users();
        let user = User::with_id("abc", "alice", 1);
        repo.replicate(&user).unwrap();
        assert!(repo.get("abc").unwrap().is_some());

        let err = repo.replicate(&user).unwrap_err();
        assert!(matches!(err, RepoError::Duplicate { .. }));
    }

    #[test]
    fn test_remove_variants() {
        let (session, repo) = users();
        for id in ["1", "2", "3", "4"] {
            repo.save(&mut User::with_id(id, "u", 1)).unwrap();
        }

        repo.remove(&User::with_id("1", "u", 1)).unwrap();
        repo.remove_by_id("2").unwrap();
        assert!(repo.remove_by_id("2").unwrap_err().is_not_found());
        assert_eq!(session.row_count("User").unwrap(), 2);

        repo.remove_all(&[User::with_id("3", "u", 1)]).unwrap();
        assert_eq!(session.row_count("User").unwrap(), 1);
    }

    #[test]
    fn test_remove_by_ids_leaves_prefix_removed() {
        let (session, repo) = users();
        for id in ["1", "2", "3"] {
            repo.save(&mut User::with_id(id, "u", 1)).unwrap();
        }

        let err = repo.remove_by_ids(["1", "missing", "3"]).unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.get("1").unwrap().is_none());
        assert!(repo.get("3").unwrap().is_some());
        assert_eq!(session.row_count("User").unwrap(), 2);
    }

    #[test]
    fn test_remove_by_field_value_and_null() {
        let (session, repo) = users();
        repo.save(&mut User::with_id("1", "a", 1).with_email("a@x.io")).unwrap();
        repo.save(&mut User::with_id("2", "b", 1)).unwrap();
        repo.save(&mut User::with_id("3", "c", 2)).unwrap();

        assert_eq!(repo.remove_by("email", Value::Null).unwrap(), 2);
        assert_eq!(session.row_count("User").unwrap(), 1);

        assert_eq!(repo.remove_by("email", json!("a@x.io")).unwrap(), 1);
        assert_eq!(repo.remove_by("email", json!("a@x.io")).unwrap(), 0);
    }

    #[test]
    fn test_entity_without_search_fields() {
        let (_, context) = memory_context();
        let repo: Repository<Note> = Repository::new(context);
        assert!(repo.search_fields().is_empty());

        let mut note = Note::new("hello");
        repo.persist(&mut note).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
    }
}
