//! Report store that keeps one JSON document per report on disk
//!
//! Documents live at `<dir>/<report_id>.json`. Every write goes to a
//! sibling temp file first and is renamed into place, so readers never see
//! a half-written document.

use super::model::{Report, ReportId, ReportSummary, StatusUpdate};
use super::store::{page, sort_newest_first, ReportStore, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const DOCUMENT_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileReportStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileReportStore {
    /// Opens (creating if needed) a store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Opened file report store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, id: &ReportId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, DOCUMENT_EXTENSION))
    }

    async fn read_document(&self, id: &ReportId) -> Result<Option<Report>, StoreError> {
        match tokio::fs::read(self.document_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, report: &Report) -> Result<(), StoreError> {
        let path = self.document_path(&report.report_id);
        let tmp = path.with_extension(format!("{}.tmp", DOCUMENT_EXTENSION));
        let bytes = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn create(&self, report: Report) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(self.document_path(&report.report_id)).await? {
            return Err(StoreError::AlreadyExists(report.report_id));
        }
        self.write_document(&report).await
    }

    async fn get(&self, id: &ReportId) -> Result<Option<Report>, StoreError> {
        self.read_document(id).await
    }

    async fn update_status(
        &self,
        id: &ReportId,
        update: StatusUpdate,
    ) -> Result<Report, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut report = self
            .read_document(id)
            .await?
            .ok_or(StoreError::NotFound(*id))?;
        report
            .apply(update, Utc::now())
            .map_err(|(from, to)| StoreError::InvalidTransition { id: *id, from, to })?;
        self.write_document(&report).await?;
        Ok(report)
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ReportSummary>, StoreError> {
        let mut summaries = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable report document");
                    continue;
                }
            };
            match serde_json::from_slice::<Report>(&bytes) {
                Ok(report) => summaries.push(report.summary()),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed report document");
                }
            }
        }

        sort_newest_first(&mut summaries);
        Ok(page(summaries, skip, limit))
    }

    fn name(&self) -> &str {
        "file"
    }
}
