//! Report pipeline state machine
//!
//! Runs the four stages for one report, writing one status update per
//! transition. Stage failures become `failed` updates and never escape
//! [`ReportPipeline::run`]. A report whose record disappears mid-run is
//! abandoned after logging.

use super::collector::ContextCollector;
use super::normalizer::normalize;
use super::prompt::{PromptAssembler, PromptContext};
use crate::ai::{is_error_response, AnalysisInvoker};
use crate::report::{Report, ReportId, ReportStore, StatusUpdate, StoreError};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Everything a pipeline run needs to know about the submitted report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportJob {
    pub report_id: ReportId,
    pub source_url: String,
    pub target_platform: Option<String>,
    pub attachment_refs: Vec<String>,
}

impl From<&Report> for ReportJob {
    fn from(report: &Report) -> Self {
        Self {
            report_id: report.report_id,
            source_url: report.source_url.clone(),
            target_platform: report.target_platform.clone(),
            attachment_refs: report.attachment_refs.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    /// Completed with the raw-text fallback
    Degraded,
    Failed,
    /// The record vanished before the final write
    Abandoned,
}

pub struct ReportPipeline {
    store: Arc<dyn ReportStore>,
    collector: ContextCollector,
    assembler: PromptAssembler,
    invoker: Option<AnalysisInvoker>,
    missing_settings: Vec<String>,
}

impl ReportPipeline {
    pub fn new(
        store: Arc<dyn ReportStore>,
        collector: ContextCollector,
        assembler: PromptAssembler,
        invoker: Option<AnalysisInvoker>,
    ) -> Self {
        Self {
            store,
            collector,
            assembler,
            invoker,
            missing_settings: Vec::new(),
        }
    }

    /// Settings the composition root found unset. Any entry fails every report.
    pub fn with_missing_settings(mut self, missing: Vec<String>) -> Self {
        self.missing_settings = missing;
        self
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Runs the pipeline on a background task
    pub fn spawn(self: &Arc<Self>, job: ReportJob) -> JoinHandle<PipelineOutcome> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move { pipeline.run_guarded(job).await })
    }

    /// [`run`](Self::run) with a last-resort handler for panics and store failures.
    ///
    /// The handler makes a single attempt to mark the report failed.
    pub async fn run_guarded(&self, job: ReportJob) -> PipelineOutcome {
        let report_id = job.report_id;
        let detail = match AssertUnwindSafe(self.run(job)).catch_unwind().await {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(&*panic),
        };

        error!(report_id = %report_id, error = %detail, "Unexpected error in report pipeline");
        let update = StatusUpdate::failed(format!("Unexpected server error: {}", detail));
        match self.store.update_status(&report_id, update).await {
            Ok(_) => PipelineOutcome::Failed,
            Err(e) => {
                error!(report_id = %report_id, error = %e, "Could not record pipeline failure");
                PipelineOutcome::Abandoned
            }
        }
    }

    /// Drives one report to a terminal status.
    ///
    /// Only store failures other than `NotFound` are returned as errors.
    pub async fn run(&self, job: ReportJob) -> Result<PipelineOutcome, StoreError> {
        let started = Instant::now();
        let id = job.report_id;
        info!(report_id = %id, url = %job.source_url, "Starting report pipeline");

        let invoker = match (&self.invoker, self.missing_settings.is_empty()) {
            (Some(invoker), true) => invoker,
            _ => {
                let message = self.configuration_error();
                error!(report_id = %id, "{}", message);
                return self.fail(&id, message).await;
            }
        };

        let repo = match self.collector.collect(&job.source_url).await {
            Ok(repo) => repo,
            Err(e) => {
                warn!(report_id = %id, error = %e, "Context collection failed");
                return self.fail(&id, e.to_string()).await;
            }
        };

        if !self.transition(&id, StatusUpdate::processing()).await? {
            return Ok(PipelineOutcome::Abandoned);
        }

        let context = PromptContext::new(job.source_url.clone(), job.target_platform.clone(), repo);
        let prompt = match self.assembler.assemble(&context).await {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(report_id = %id, error = %e, "Prompt assembly failed");
                return self.fail(&id, e.to_string()).await;
            }
        };
        debug!(report_id = %id, chars = prompt.len(), "Prompt assembled");

        let raw = invoker.invoke(&prompt, &job.attachment_refs).await;
        if is_error_response(&raw) {
            warn!(report_id = %id, backend = invoker.backend_name(), "Analysis returned an error");
            return self.fail(&id, raw).await;
        }

        let normalized = normalize(&raw);
        let outcome = if normalized.is_degraded() {
            PipelineOutcome::Degraded
        } else {
            PipelineOutcome::Completed
        };
        let update = StatusUpdate::completed(normalized.result, normalized.parse_error);
        if !self.transition(&id, update).await? {
            return Ok(PipelineOutcome::Abandoned);
        }

        info!(
            report_id = %id,
            outcome = ?outcome,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Report pipeline finished"
        );
        Ok(outcome)
    }

    fn configuration_error(&self) -> String {
        let missing = if self.missing_settings.is_empty() {
            "analysis backend".to_string()
        } else {
            self.missing_settings.join(", ")
        };
        format!("Missing/invalid server configuration: {}.", missing)
    }

    /// Returns `Ok(false)` when the record no longer exists
    async fn transition(&self, id: &ReportId, update: StatusUpdate) -> Result<bool, StoreError> {
        let status = update.status();
        match self.store.update_status(id, update).await {
            Ok(_) => {
                debug!(report_id = %id, status = %status, "Report status updated");
                Ok(true)
            }
            Err(StoreError::NotFound(_)) => {
                warn!(
                    report_id = %id,
                    status = %status,
                    "Report record vanished before status update, abandoning"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn fail(&self, id: &ReportId, message: String) -> Result<PipelineOutcome, StoreError> {
        if self.transition(id, StatusUpdate::failed(message)).await? {
            Ok(PipelineOutcome::Failed)
        } else {
            Ok(PipelineOutcome::Abandoned)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "pipeline task panicked".to_string()
    }
}
