//! Persistence seam for report records
//!
//! Each pipeline stage persists through this narrow trait, one call per
//! transition. Calls are individually atomic; nothing spans two calls, so a
//! crash between stages leaves the last durably written status in place.

use super::model::{Report, ReportId, ReportStatus, ReportSummary, StatusUpdate};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Report {0} not found")]
    NotFound(ReportId),

    #[error("Report {0} already exists")]
    AlreadyExists(ReportId),

    #[error("Report {id} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        id: ReportId,
        from: ReportStatus,
        to: ReportStatus,
    },

    #[error("Report store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, report: Report) -> Result<(), StoreError>;

    async fn get(&self, id: &ReportId) -> Result<Option<Report>, StoreError>;

    /// Applies one transition and stamps `updated_at` with the store's clock.
    ///
    /// Fails with `NotFound` when the record no longer exists; records are
    /// never recreated by an update.
    async fn update_status(&self, id: &ReportId, update: StatusUpdate)
        -> Result<Report, StoreError>;

    /// Summaries ordered by `created_at`, newest first
    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ReportSummary>, StoreError>;

    fn name(&self) -> &str;
}

/// Orders newest first, breaking timestamp ties by id so pages are stable
pub(crate) fn sort_newest_first(summaries: &mut [ReportSummary]) {
    summaries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.report_id.cmp(&b.report_id))
    });
}

pub(crate) fn page(summaries: Vec<ReportSummary>, skip: usize, limit: usize) -> Vec<ReportSummary> {
    summaries.into_iter().skip(skip).take(limit).collect()
}
