//! Command handlers. Each returns the process exit code.

use super::commands::{AnalyzeArgs, ServeArgs};
use super::output::OutputFormatter;
use crate::ai::{AnalysisInvoker, MockBackend, MockResponse};
use crate::config::{ScoutConfig, PROVIDER_VAR};
use crate::pipeline::{ContextCollector, PromptAssembler, ReportJob, ReportPipeline};
use crate::report::{MemoryReportStore, Report, ReportId, ReportStatus, ReportStore};
use crate::server;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

pub async fn handle_serve(args: &ServeArgs) -> i32 {
    match run_serve(args).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Server error: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_serve(args: &ServeArgs) -> Result<()> {
    let mut config = ScoutConfig::default();
    if let Some(bind) = &args.bind {
        config.bind_addr = bind.clone();
    }
    config.validate().context("Invalid configuration")?;
    debug!("{}", config);

    let state = server::build_state(&config)
        .await
        .context("Failed to initialize application state")?;
    server::serve(state, &config.bind_addr)
        .await
        .with_context(|| format!("Failed to serve on {}", config.bind_addr))
}

pub async fn handle_analyze(args: &AnalyzeArgs, quiet: bool) -> i32 {
    match run_analyze(args).await {
        Ok(report) => {
            let formatter = OutputFormatter::new(args.format.into());
            match formatter.format(&report) {
                Ok(output) => {
                    if !quiet || report.status != ReportStatus::Completed {
                        println!("{}", output);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    return 1;
                }
            }
            if report.status == ReportStatus::Completed {
                0
            } else {
                1
            }
        }
        Err(e) => {
            error!("Analysis error: {:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

/// Runs one report through the pipeline and returns its final record
async fn run_analyze(args: &AnalyzeArgs) -> Result<Report> {
    let mut config = ScoutConfig::default();
    if let Some(provider) = args.provider {
        config.provider = Some(provider);
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(template) = &args.prompt_template {
        config.prompt_template = template.clone();
    }
    if let Some(timeout) = args.timeout {
        config.request_timeout_secs = timeout;
    }
    config.validate().context("Invalid configuration")?;

    let invoker = match &args.mock_response {
        Some(text) => {
            let backend = MockBackend::with_name("mock").with_response(MockResponse::text(text.clone()));
            Some(AnalysisInvoker::new(Arc::new(backend)))
        }
        None => config
            .create_backend()
            .map(|backend| AnalysisInvoker::new(backend)),
    };
    let missing = if invoker.is_none() {
        vec![PROVIDER_VAR.to_string()]
    } else {
        Vec::new()
    };

    let store = Arc::new(MemoryReportStore::new());
    let pipeline = ReportPipeline::new(
        store.clone(),
        ContextCollector::with_git(),
        PromptAssembler::new(&config.prompt_template),
        invoker,
    )
    .with_missing_settings(missing);

    let report = Report::pending(
        ReportId::new(),
        args.repo_url.clone(),
        args.target_platform.clone(),
        Vec::new(),
    );
    let job = ReportJob::from(&report);
    store.create(report).await?;

    let outcome = pipeline.run_guarded(job.clone()).await;
    info!(report_id = %job.report_id, outcome = ?outcome, "Analysis finished");

    store
        .get(&job.report_id)
        .await?
        .context("Report record disappeared")
}
