//! Audit capture for business operations
//!
//! Records before/after snapshots of the entity an operation touches and
//! writes one entry per call through a `Repository<AuditEntry>`.
//!
//! # Architecture
//!
//! - `DetailLog`: the audit declaration (message code and variables, target
//!   argument, capture mode).
//! - `Invocation`: the named arguments handed to the operation.
//! - `SnapshotResolver`: reads the target's stored state.
//! - `AuditInterceptor`: runs the operation and records the entry.
//! - `summarize`: human-readable change summary between two snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! use auditrepo::audit::{AuditInterceptor, CaptureMode, DetailLog, Invocation};
//!
//! let audit = AuditInterceptor::new(context.clone());
//! let log = DetailLog::new("Renamed user {0}", "user")
//!     .with_vars(["user.name"])
//!     .with_mode(CaptureMode::BeforeAndAfter);
//!
//! let mut invocation = Invocation::new().with_entity("user", user);
//! audit.invoke(&log, &mut invocation, |inv| {
//!     let user = inv.entity_mut::<User>("user").expect("user argument");
//!     user.name = "alicia".into();
//!     users.update(user)
//! })?;
//! ```

mod diff;
mod entry;
mod interceptor;
mod invocation;
mod message;
mod resolver;

pub use diff::{changes, summarize};
pub use entry::{AuditEntry, CaptureMode};
pub use interceptor::{AuditInterceptor, Audited, DetailLog};
pub use invocation::Invocation;
pub use message::{substitute, MessageSource, TemplateMessages};
pub use resolver::{Resolved, SnapshotResolver};
