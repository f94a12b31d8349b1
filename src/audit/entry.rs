//! Audit entry data structures
//!
//! One `AuditEntry` is written per audited call. It is an ordinary entity, so
//! the audit trail is read back through a `Repository<AuditEntry>` like any
//! other data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Entity;
use crate::search::{Analyze, SearchDescriptor, SearchField};

/// Which snapshots an audited call records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// State before and after the call
    #[default]
    BeforeAndAfter,
    /// State before the call only
    BeforeOnly,
    /// State after the call only
    AfterOnly,
}

impl CaptureMode {
    pub fn captures_before(&self) -> bool {
        matches!(self, CaptureMode::BeforeAndAfter | CaptureMode::BeforeOnly)
    }

    pub fn captures_after(&self) -> bool {
        matches!(self, CaptureMode::BeforeAndAfter | CaptureMode::AfterOnly)
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMode::BeforeAndAfter => write!(f, "ALL"),
            CaptureMode::BeforeOnly => write!(f, "ORIG"),
            CaptureMode::AfterOnly => write!(f, "NEW"),
        }
    }
}

/// A single audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Option<String>,

    /// When the audited call started (UTC)
    pub timestamp: DateTime<Utc>,

    /// Rendered business message
    pub message: String,

    /// Identifier of the audited entity, when the target is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    pub capture_mode: CaptureMode,

    /// State of the target before the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,

    /// State of the target after the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,

    /// Human-readable change summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,

    /// Error text when the audited call failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    /// A fresh entry with no snapshots yet
    pub fn new(message: impl Into<String>, capture_mode: CaptureMode) -> Self {
        Self {
            id: None,
            timestamp: Utc::now(),
            message: message.into(),
            entity_id: None,
            capture_mode,
            before: None,
            after: None,
            diff_summary: None,
            error: None,
        }
    }

    /// Check if the audited call failed
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Format the entry for human-readable output
    pub fn format_human_readable(&self) -> String {
        let mut output = format!(
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.capture_mode,
            self.message
        );

        if let Some(id) = &self.entity_id {
            output.push_str(&format!(" ({})", id));
        }

        if let Some(diff) = &self.diff_summary {
            output.push_str(&format!("\n  Changes: {}", diff));
        }

        if let Some(error) = &self.error {
            output.push_str(&format!("\n  Failed: {}", error));
        }

        output
    }
}

impl Entity for AuditEntry {
    const ENTITY_NAME: &'static str = "AuditEntry";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn search_descriptor() -> &'static SearchDescriptor {
        static DESCRIPTOR: SearchDescriptor = SearchDescriptor {
            fields: &[
                SearchField::new("message", Analyze::Analyzed),
                SearchField::new("entity_id", Analyze::NotAnalyzed),
                SearchField::new("capture_mode", Analyze::NotAnalyzed),
            ],
            embedded: &[],
        };
        &DESCRIPTOR
    }
}
