//! auditrepo - Generic entity repository with audit capture
//!
//! This library provides a persistence layer that business services use to
//! read, write, paginate and full-text search domain entities, and an audit
//! layer that records what an operation did to the entity it touched.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Settings for logging, storage and audit capture
//! - `error`: Custom error types
//! - `logging`: Subscriber setup for the `tracing` events the crate emits
//! - `models`: The `Entity` trait and paging types
//! - `query`: Structured criteria and count-query derivation
//! - `search`: Search-field discovery and full-text criteria
//! - `storage`: Session traits and the in-memory reference session
//! - `repository`: The generic `Repository<T>`
//! - `audit`: Snapshot capture around business operations
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use auditrepo::config::Settings;
//! use auditrepo::repository::Repository;
//! use auditrepo::storage::{MemoryContext, MemorySession, SessionContext};
//!
//! let settings = Settings::from_env()?;
//! auditrepo::logging::init_logging(&settings.logging)?;
//!
//! let session = Arc::new(MemorySession::open(&settings.storage)?);
//! let context: Arc<dyn SessionContext> = Arc::new(MemoryContext::new(session));
//! let users: Repository<User> = Repository::new(context);
//! let page = users.find_page_by(&users.create_criteria([]), 1, 20)?;
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod query;
pub mod repository;
pub mod search;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{RepoError, RepoResult};
pub use models::{Entity, Page};
pub use repository::{Reference, Repository};
