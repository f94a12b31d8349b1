//! Core data models for auditrepo
//!
//! The `Entity` trait every persisted type implements, and the `Page`
//! returned by paged queries.

pub mod entity;
pub mod page;

pub use entity::{generate_id, Entity};
pub use page::{Page, Paging};
