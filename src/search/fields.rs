//! Search-field index composed from entity descriptors
//!
//! Built once per repository and read-only afterwards, so it can be shared
//! freely across threads.

use indexmap::IndexMap;

use super::descriptor::{Analyze, SearchDescriptor};
use crate::models::Entity;

/// Ordered map of searchable field paths to their analysis mode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFieldIndex {
    fields: IndexMap<String, Analyze>,
}

impl SearchFieldIndex {
    /// Build the index for an entity type
    pub fn of<T: Entity>() -> Self {
        Self::from_descriptor(T::search_descriptor())
    }

    /// Compose an index from a descriptor
    ///
    /// The entity's own fields come first, followed by each embedded type's
    /// own fields under `embedding_name.`. Embedded types' embeddings are not
    /// followed: discovery stops one level down.
    pub fn from_descriptor(descriptor: &SearchDescriptor) -> Self {
        let mut fields = IndexMap::new();

        for field in descriptor.fields {
            fields.insert(field.name.to_string(), field.analyze);
        }

        for embedded in descriptor.embedded {
            let inner = (embedded.descriptor)();
            for field in inner.fields {
                fields.insert(format!("{}.{}", embedded.name, field.name), field.analyze);
            }
        }

        Self { fields }
    }

    /// Analysis mode of a field path
    pub fn get(&self, name: &str) -> Option<Analyze> {
        self.fields.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Analyze)> {
        self.fields.iter().map(|(name, analyze)| (name.as_str(), *analyze))
    }

    pub fn names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Note, Role, User};

    #[test]
    fn test_own_fields_then_embedded_in_order() {
        let index = SearchFieldIndex::of::<User>();
        assert_eq!(
            index.names(),
            vec![
                "name",
                "email",
                "level",
                "roles.name",
                "roles.code",
                "profile.bio",
                "profile.secret",
            ]
        );
    }

    #[test]
    fn test_analysis_modes_are_kept() {
        let index = SearchFieldIndex::of::<User>();
        assert_eq!(index.get("name"), Some(Analyze::Analyzed));
        assert_eq!(index.get("roles.code"), Some(Analyze::NotAnalyzed));
        assert_eq!(index.get("profile.secret"), Some(Analyze::No));
        assert_eq!(index.get("missing"), None);
    }

    #[test]
    fn test_embedding_stops_after_one_level() {
        // Role embeds permissions, but User only reaches Role's own fields
        let index = SearchFieldIndex::of::<User>();
        assert!(!index.contains("roles.permissions.name"));

        let role_index = SearchFieldIndex::of::<Role>();
        assert!(role_index.contains("permissions.name"));
    }

    #[test]
    fn test_entity_without_descriptor() {
        let index = SearchFieldIndex::of::<Note>();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
    }
}
