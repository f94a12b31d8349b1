//! Static search-field declarations
//!
//! Each entity type declares which of its fields are full-text searchable
//! through a `SearchDescriptor`. Embedded fields point at the descriptor of
//! the associated type so the field index can be composed without reflection.

use serde::{Deserialize, Serialize};

/// How a field's text is handled by the search index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Analyze {
    /// Tokenized and lower-cased; matched term by term
    #[default]
    Analyzed,
    /// Indexed as a single term; matched on the whole value
    NotAnalyzed,
    /// Stored only; never matched by a keyword
    No,
}

impl Analyze {
    /// Whether keyword queries consider this field
    pub fn is_searchable(&self) -> bool {
        !matches!(self, Analyze::No)
    }
}

impl std::fmt::Display for Analyze {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Analyze::Analyzed => write!(f, "ANALYZED"),
            Analyze::NotAnalyzed => write!(f, "NOT_ANALYZED"),
            Analyze::No => write!(f, "NO"),
        }
    }
}

/// A field declared as searchable on an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchField {
    pub name: &'static str,
    pub analyze: Analyze,
}

impl SearchField {
    pub const fn new(name: &'static str, analyze: Analyze) -> Self {
        Self { name, analyze }
    }
}

/// A field holding an associated entity, or a collection of them, whose own
/// search fields are indexed under this field's name
///
/// Single and collection associations index the same way: values along a
/// path are flattened when a record is searched.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedField {
    pub name: &'static str,
    /// Descriptor of the associated (or element) type
    pub descriptor: fn() -> &'static SearchDescriptor,
}

/// Compile-time declaration of an entity type's searchable fields
#[derive(Debug, Clone, Copy)]
pub struct SearchDescriptor {
    pub fields: &'static [SearchField],
    pub embedded: &'static [EmbeddedField],
}

impl SearchDescriptor {
    /// Descriptor for entity types with nothing to search
    pub const EMPTY: SearchDescriptor = SearchDescriptor {
        fields: &[],
        embedded: &[],
    };

    /// Check if the descriptor declares anything at all
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.embedded.is_empty()
    }
}
