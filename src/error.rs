//! Custom error types for auditrepo
//!
//! This module defines the error hierarchy for the repository and audit layers
//! using thiserror for ergonomic error definitions.

use thiserror::Error;

/// The main error type for repository and audit operations
#[derive(Error, Debug)]
pub enum RepoError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid arguments passed to a repository operation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// The target argument of an audited operation could not be resolved
    #[error("Audit target '{0}' is missing or unresolvable")]
    Resolution(String),

    /// The full-text index for an entity type has not been built yet
    #[error("Full-text index for {entity_type} has not been built")]
    IndexNotReady { entity_type: String },

    /// Malformed or unsupported query text
    #[error("Query error: {0}")]
    Query(String),

    /// A zero-or-one query matched several rows
    #[error("Query expected a unique result but matched {count} rows")]
    NonUniqueResult { count: usize },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepoError {
    /// Create a "not found" error for the given entity type
    pub fn not_found(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            identifier: identifier.into(),
        }
    }

    /// Create a "duplicate" error for the given entity type
    pub fn duplicate(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            identifier: identifier.into(),
        }
    }

    /// Create an error for a poisoned lock
    pub(crate) fn lock(kind: &str, err: impl std::fmt::Display) -> Self {
        Self::Storage(format!("Failed to acquire {} lock: {}", kind, err))
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a missing full-text index
    pub fn is_index_not_ready(&self) -> bool {
        matches!(self, Self::IndexNotReady { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for RepoError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RepoError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = RepoError::not_found("User", "42");
        assert_eq!(err.to_string(), "User not found: 42");
        assert!(err.is_not_found());
        assert!(!err.is_index_not_ready());
    }

    #[test]
    fn test_index_not_ready_error() {
        let err = RepoError::IndexNotReady {
            entity_type: "Article".into(),
        };
        assert_eq!(
            err.to_string(),
            "Full-text index for Article has not been built"
        );
        assert!(err.is_index_not_ready());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let repo_err: RepoError = io_err.into();
        assert!(matches!(repo_err, RepoError::Io(_)));
    }
}
