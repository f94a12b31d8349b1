//! Audit capture around business operations
//!
//! An audited call goes through these steps:
//!
//! 1. Resolve the target argument. Failure aborts the call: the operation
//!    never runs and nothing is written.
//! 2. Build the entry with the rendered message.
//! 3. Capture the `before` snapshot (`BeforeAndAfter`, `BeforeOnly`).
//! 4. Run the operation.
//! 5. On success, capture the `after` snapshot (`BeforeAndAfter`,
//!    `AfterOnly`). On failure this step is skipped and the error is kept.
//! 6. Persist the entry, then hand back the operation's result.

use std::fmt::Display;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::diff::summarize;
use super::entry::{AuditEntry, CaptureMode};
use super::invocation::Invocation;
use super::message::{MessageSource, TemplateMessages};
use super::resolver::SnapshotResolver;
use crate::config::AuditSettings;
use crate::error::{RepoError, RepoResult};
use crate::repository::Repository;
use crate::storage::eval::{field, text_of};
use crate::storage::SessionContext;

/// Audit declaration for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLog {
    /// Message code or template
    pub code: String,
    /// Message variables: an argument name, optionally followed by a dotted
    /// path into that argument (`user.name`)
    pub vars: Vec<String>,
    /// Name of the argument whose state is captured
    pub target: String,
    pub mode: CaptureMode,
}

impl DetailLog {
    pub fn new(code: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            vars: Vec::new(),
            target: target.into(),
            mode: CaptureMode::default(),
        }
    }

    pub fn with_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vars = vars.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mode(mut self, mode: CaptureMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Writes one `AuditEntry` per audited call
pub struct AuditInterceptor {
    entries: Repository<AuditEntry>,
    resolver: SnapshotResolver,
    messages: Arc<dyn MessageSource>,
    settings: AuditSettings,
}

impl AuditInterceptor {
    pub fn new(context: Arc<dyn SessionContext>) -> Self {
        Self {
            entries: Repository::new(context.clone()),
            resolver: SnapshotResolver::new(context),
            messages: Arc::new(TemplateMessages::new()),
            settings: AuditSettings::default(),
        }
    }

    pub fn with_messages(mut self, messages: Arc<dyn MessageSource>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_settings(mut self, settings: AuditSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Repository the entries are written to
    pub fn entries(&self) -> &Repository<AuditEntry> {
        &self.entries
    }

    /// Decorate an operation so every call to it is audited
    pub fn wrap<F>(&self, log: DetailLog, operation: F) -> Audited<'_, F> {
        Audited {
            interceptor: self,
            log,
            operation,
        }
    }

    /// Run an operation under audit capture
    ///
    /// The operation's own error type only needs to absorb `RepoError`, so
    /// audit failures surface through the same channel as its own.
    pub fn invoke<R, E, F>(
        &self,
        log: &DetailLog,
        invocation: &mut Invocation,
        operation: F,
    ) -> Result<R, E>
    where
        F: FnOnce(&mut Invocation) -> Result<R, E>,
        E: From<RepoError> + Display,
    {
        let resolved = self.resolver.resolve(invocation, &log.target)?;

        let mut entry = AuditEntry::new(self.render_message(log, invocation), log.mode);
        if log.mode.captures_before() {
            entry.entity_id = resolved.entity_id;
            entry.before = Some(resolved.snapshot);
        }

        let result = operation(&mut *invocation);

        match result {
            Ok(value) => {
                if log.mode.captures_after() {
                    if let Err(e) = self.capture_after(log, invocation, &mut entry) {
                        entry.error = Some(e.to_string());
                        self.persist_after_failure(&mut entry);
                        return Err(e.into());
                    }
                }
                self.entries.persist(&mut entry)?;
                debug!(
                    code = %log.code,
                    entity_id = ?entry.entity_id,
                    mode = %log.mode,
                    "recorded audit entry"
                );
                Ok(value)
            }
            Err(e) => {
                entry.error = Some(e.to_string());
                self.persist_after_failure(&mut entry);
                Err(e)
            }
        }
    }

    fn capture_after(
        &self,
        log: &DetailLog,
        invocation: &Invocation,
        entry: &mut AuditEntry,
    ) -> RepoResult<()> {
        // Read the id again: the operation may have just assigned it
        let current = self.resolver.resolve(invocation, &log.target)?;

        entry.entity_id = current.entity_id;
        entry.after = Some(current.snapshot);

        if self.settings.record_diff {
            if let (Some(before), Some(after)) = (&entry.before, &entry.after) {
                entry.diff_summary = summarize(before, after, self.settings.detailed_diff);
            }
        }
        Ok(())
    }

    // The operation's outcome takes precedence over a failed audit write
    fn persist_after_failure(&self, entry: &mut AuditEntry) {
        if let Err(e) = self.entries.persist(entry) {
            warn!(message = %entry.message, error = %e, "failed to record audit entry");
        }
    }

    fn render_message(&self, log: &DetailLog, invocation: &Invocation) -> String {
        let args: Vec<String> = log
            .vars
            .iter()
            .map(|var| render_var(invocation, var))
            .collect();
        self.messages.render(&log.code, &args)
    }
}

/// Text of a message variable; unknown arguments and paths render empty
fn render_var(invocation: &Invocation, var: &str) -> String {
    let (name, path) = match var.split_once('.') {
        Some((name, path)) => (name, Some(path)),
        None => (var, None),
    };

    let Some(snapshot) = invocation
        .argument(name)
        .and_then(|arg| arg.snapshot().ok())
    else {
        return String::new();
    };

    let value = match path {
        Some(path) => field(&snapshot, path),
        None => Some(&snapshot),
    };

    match value {
        Some(Value::Null) | None => String::new(),
        Some(value) => text_of(value).unwrap_or_else(|| value.to_string()),
    }
}

/// An operation bound to its audit declaration
pub struct Audited<'a, F> {
    interceptor: &'a AuditInterceptor,
    log: DetailLog,
    operation: F,
}

impl<F> Audited<'_, F> {
    pub fn log(&self) -> &DetailLog {
        &self.log
    }

    /// Call the operation under audit capture
    pub fn call<R, E>(&self, invocation: &mut Invocation) -> Result<R, E>
    where
        F: Fn(&mut Invocation) -> Result<R, E>,
        E: From<RepoError> + Display,
    {
        self.interceptor
            .invoke(&self.log, invocation, |inv| (self.operation)(inv))
    }
}
