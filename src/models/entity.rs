//! Entity trait implemented by every persisted domain type
//!
//! An entity carries an optional string identifier: `None` means the value
//! is transient and has never been persisted. Identity is by identifier.

use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::search::SearchDescriptor;

/// A domain type persisted through a `Repository`
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name the store uses for this entity type
    const ENTITY_NAME: &'static str;

    /// Record field holding the identifier
    const ID_FIELD: &'static str = "id";

    /// Current identifier, `None` while transient
    fn id(&self) -> Option<&str>;

    /// Assign an identifier
    fn set_id(&mut self, id: String);

    /// Searchable fields of this type
    fn search_descriptor() -> &'static SearchDescriptor {
        &SearchDescriptor::EMPTY
    }

    /// Identifier, treating a blank string as absent
    fn persistent_id(&self) -> Option<&str> {
        self.id().filter(|id| !id.trim().is_empty())
    }

    /// Check if this entity has never been persisted
    fn is_transient(&self) -> bool {
        self.persistent_id().is_none()
    }
}

/// Generate a fresh identifier for a transient entity
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::User;

    #[test]
    fn test_blank_id_is_transient() {
        let mut user = User::new("alice", 1);
        assert!(user.is_transient());

        user.set_id("   ".into());
        assert!(user.is_transient());
        assert_eq!(user.persistent_id(), None);

        user.set_id("42".into());
        assert!(!user.is_transient());
        assert_eq!(user.persistent_id(), Some("42"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_default_descriptor_is_empty() {
        assert!(crate::testing::Note::search_descriptor().is_empty());
        assert!(!User::search_descriptor().is_empty());
    }
}
