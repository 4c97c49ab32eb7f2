//! Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use migration_scout::ai::{AnalysisInvoker, MockBackend};
use migration_scout::pipeline::{
    CloneError, ContextCollector, PromptAssembler, RepoCloner, ReportJob, ReportPipeline,
};
use migration_scout::report::{
    MemoryReportStore, Report, ReportId, ReportStatus, ReportStore, ReportSummary, StatusUpdate,
    StoreError,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Materialises a fixed set of top-level files instead of cloning
pub struct FixtureCloner {
    files: Vec<(String, String)>,
}

impl FixtureCloner {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, content)| (name.to_string(), content.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl RepoCloner for FixtureCloner {
    async fn shallow_clone(&self, _url: &str, dest: &Path) -> Result<(), CloneError> {
        std::fs::create_dir_all(dest)?;
        for (name, content) in &self.files {
            std::fs::write(dest.join(name), content)?;
        }
        Ok(())
    }
}

/// Fails every clone the way git does for a missing repository
pub struct FailingCloner;

#[async_trait]
impl RepoCloner for FailingCloner {
    async fn shallow_clone(&self, url: &str, _dest: &Path) -> Result<(), CloneError> {
        Err(CloneError::Git {
            status: "exit status: 128".to_string(),
            stderr: format!("fatal: repository '{}' not found", url),
        })
    }
}

/// Memory store that records every status update and list call
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryReportStore,
    updates: Mutex<Vec<(ReportId, ReportStatus)>>,
    list_calls: AtomicUsize,
    /// Records removed right after they reach this status
    delete_after: Mutex<Option<ReportStatus>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete_after(&self, status: ReportStatus) {
        *self.delete_after.lock().unwrap() = Some(status);
    }

    pub fn updates_for(&self, id: &ReportId) -> Vec<ReportStatus> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(rid, _)| rid == id)
            .map(|(_, status)| *status)
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportStore for RecordingStore {
    async fn create(&self, report: Report) -> Result<(), StoreError> {
        self.inner.create(report).await
    }

    async fn get(&self, id: &ReportId) -> Result<Option<Report>, StoreError> {
        self.inner.get(id).await
    }

    async fn update_status(
        &self,
        id: &ReportId,
        update: StatusUpdate,
    ) -> Result<Report, StoreError> {
        let status = update.status();
        self.updates.lock().unwrap().push((*id, status));
        let report = self.inner.update_status(id, update).await?;
        let delete_after = *self.delete_after.lock().unwrap();
        if delete_after == Some(status) {
            self.inner.remove(id).await;
        }
        Ok(report)
    }

    async fn list(&self, skip: usize, limit: usize) -> Result<Vec<ReportSummary>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list(skip, limit).await
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub const TEMPLATE: &str = "Target: {target_platform}\nRepo: {github_repo_url}\n\
README:\n{readme_content}\nDeps:\n{dependency_files_content}\nDocker:\n{dockerfile_content}\n\
Reply as {{\"blockers\": []}}";

pub fn write_template(dir: &TempDir, content: &str) -> PromptAssembler {
    let path = dir.path().join("prompt.md");
    std::fs::write(&path, content).unwrap();
    PromptAssembler::new(path)
}

pub fn pipeline(
    store: Arc<dyn ReportStore>,
    cloner: impl RepoCloner + 'static,
    assembler: PromptAssembler,
    backend: Arc<MockBackend>,
) -> ReportPipeline {
    ReportPipeline::new(
        store,
        ContextCollector::new(Box::new(cloner)),
        assembler,
        Some(AnalysisInvoker::new(backend)),
    )
}

pub async fn submit(store: &dyn ReportStore, url: &str) -> ReportJob {
    let report = Report::pending(ReportId::new(), url, None, vec![]);
    let job = ReportJob::from(&report);
    store.create(report).await.unwrap();
    job
}
