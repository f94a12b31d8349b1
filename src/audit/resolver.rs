//! Resolution of an audit target to its stored state

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::invocation::Invocation;
use crate::error::{RepoError, RepoResult};
use crate::repository::fetch_record;
use crate::storage::SessionContext;

/// State of a target at one capture point
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Id of an entity target
    pub entity_id: Option<String>,
    /// Snapshot of the target
    pub snapshot: Value,
    /// Whether the snapshot was read back from storage
    pub stored: bool,
}

/// Resolves audit targets through the repository fetch path
#[derive(Clone)]
pub struct SnapshotResolver {
    context: Arc<dyn SessionContext>,
}

impl SnapshotResolver {
    pub fn new(context: Arc<dyn SessionContext>) -> Self {
        Self { context }
    }

    /// Resolve the named argument to its persisted state
    ///
    /// An entity with a non-blank id is re-read from storage. Anything else,
    /// including an entity whose row does not exist, resolves to the value as
    /// given. A missing or null argument is a `Resolution` error.
    pub fn resolve(&self, invocation: &Invocation, target: &str) -> RepoResult<Resolved> {
        let given = self.given(invocation, target)?;

        let (Some(entity), Some(id)) = (
            invocation.argument(target).and_then(|arg| arg.entity_name()),
            given.entity_id.as_deref(),
        ) else {
            return Ok(given);
        };

        match fetch_record(self.context.as_ref(), entity, id)? {
            Some(snapshot) => Ok(Resolved {
                entity_id: given.entity_id,
                snapshot,
                stored: true,
            }),
            None => {
                debug!(entity, id, "audit target not stored, using given value");
                Ok(given)
            }
        }
    }

    /// The named argument as it currently stands, without reading storage
    pub fn given(&self, invocation: &Invocation, target: &str) -> RepoResult<Resolved> {
        let arg = invocation
            .argument(target)
            .ok_or_else(|| RepoError::Resolution(target.to_string()))?;

        let snapshot = arg.snapshot()?;
        if snapshot.is_null() {
            return Err(RepoError::Resolution(target.to_string()));
        }

        Ok(Resolved {
            entity_id: arg.persistent_id(),
            snapshot,
            stored: false,
        })
    }
}
