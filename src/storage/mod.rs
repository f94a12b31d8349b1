//! Storage layer for auditrepo
//!
//! The session traits the repository is written against, plus an in-memory
//! reference session with an optional JSON snapshot file.

pub mod eval;
pub mod hql;
pub mod memory;
pub mod session;

pub use memory::{MemoryContext, MemorySession};
pub use session::{SearchSession, Session, SessionContext};
