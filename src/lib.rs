//! migration-scout - AI-generated migration readiness reports
//!
//! A submitted report moves through four stages on a background task:
//!
//! 1. **Context Collector** ([`pipeline::collector`]) shallow-clones the
//!    repository and extracts its README, dependency manifests and Dockerfile.
//! 2. **Prompt Assembler** ([`pipeline::prompt`]) fills a prompt template,
//!    substituting fixed sentinels for anything missing.
//! 3. **Analysis Invoker** ([`ai::invoker`]) makes one call to a generative
//!    model with the prompt and any uploaded documents.
//! 4. **Response Normalizer** ([`pipeline::normalizer`]) parses the reply as
//!    JSON, falling back to the raw text.
//!
//! Each transition is persisted through [`report::ReportStore`]; the status
//! only moves forward, `pending -> processing -> completed | failed`.
//!
//! # Example
//!
//! ```no_run
//! use migration_scout::ai::{AnalysisInvoker, MockBackend, MockResponse};
//! use migration_scout::pipeline::{ContextCollector, PromptAssembler, ReportJob, ReportPipeline};
//! use migration_scout::report::{MemoryReportStore, Report, ReportId, ReportStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryReportStore::new());
//! let backend = MockBackend::new().with_response(MockResponse::text("{\"readiness\": \"high\"}"));
//! let pipeline = ReportPipeline::new(
//!     store.clone(),
//!     ContextCollector::with_git(),
//!     PromptAssembler::new("prompts/migration_report.md"),
//!     Some(AnalysisInvoker::new(Arc::new(backend))),
//! );
//!
//! let report = Report::pending(ReportId::new(), "https://github.com/acme/shop", None, vec![]);
//! let job = ReportJob::from(&report);
//! store.create(report).await?;
//! pipeline.run_guarded(job).await;
//! # Ok(())
//! # }
//! ```

pub mod ai;
pub mod attachments;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod util;

pub use ai::{AnalysisBackend, AnalysisInvoker, BackendError, GenAIBackend};
pub use config::{ConfigError, ScoutConfig};
pub use pipeline::{PipelineOutcome, ReportJob, ReportPipeline};
pub use report::{Report, ReportId, ReportStatus, ReportStore};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
