//! Configuration module for auditrepo
//!
//! Settings for logging, the in-memory session and audit capture.

pub mod settings;

pub use settings::{AuditSettings, LogFormat, LogSettings, Settings, StorageSettings};
