use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque report identifier, generated once at submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(Uuid);

impl ReportId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ReportId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    /// Transitions only move forward: `pending -> processing -> {completed|failed}`,
    /// with `pending -> failed` for reports that never start processing.
    pub fn can_transition_to(&self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (ReportStatus::Pending, ReportStatus::Processing)
                | (ReportStatus::Pending, ReportStatus::Failed)
                | (ReportStatus::Processing, ReportStatus::Completed)
                | (ReportStatus::Processing, ReportStatus::Failed)
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis outcome: the model's JSON object, or its raw text when it was not JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportResult {
    Structured(Map<String, Value>),
    Raw(String),
}

impl ReportResult {
    pub fn is_structured(&self) -> bool {
        matches!(self, ReportResult::Structured(_))
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            ReportResult::Raw(text) => Some(text),
            ReportResult::Structured(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub report_id: ReportId,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_platform: Option<String>,
    #[serde(default)]
    pub attachment_refs: Vec<String>,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ReportResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// A freshly submitted report in `pending` state
    pub fn pending(
        report_id: ReportId,
        source_url: impl Into<String>,
        target_platform: Option<String>,
        attachment_refs: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            report_id,
            source_url: source_url.into(),
            target_platform,
            attachment_refs,
            status: ReportStatus::Pending,
            error_message: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            report_id: self.report_id,
            source_url: self.source_url.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }

    /// Applies a status update stamped with `at`.
    ///
    /// Returns the rejected `(from, to)` pair when the transition would move
    /// the report backwards or sideways.
    pub fn apply(
        &mut self,
        update: StatusUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), (ReportStatus, ReportStatus)> {
        if !self.status.can_transition_to(update.status) {
            return Err((self.status, update.status));
        }

        self.status = update.status;
        self.error_message = update.error_message;
        self.result = update.result;
        self.updated_at = at.max(self.updated_at);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_id: ReportId,
    pub source_url: String,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// A single status transition with the fields that travel with it.
///
/// The constructors are the only way to build one, so `completed` always
/// carries a result and `failed` always carries a message.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    status: ReportStatus,
    error_message: Option<String>,
    result: Option<ReportResult>,
}

impl StatusUpdate {
    pub fn processing() -> Self {
        Self {
            status: ReportStatus::Processing,
            error_message: None,
            result: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Failed,
            error_message: Some(message.into()),
            result: None,
        }
    }

    /// `parse_error` is set when the result is the degraded raw-text fallback
    pub fn completed(result: ReportResult, parse_error: Option<String>) -> Self {
        Self {
            status: ReportStatus::Completed,
            error_message: parse_error,
            result: Some(result),
        }
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}
