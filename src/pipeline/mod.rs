//! The four-stage report pipeline: collect, assemble, invoke, normalize

pub mod collector;
pub mod normalizer;
pub mod orchestrator;
pub mod prompt;

pub use collector::{
    extract_context, CloneError, CollectError, ContextCollector, GitCloner, RepoCloner,
    RepoContext,
};
pub use normalizer::{normalize, strip_code_fence, Normalized};
pub use orchestrator::{PipelineOutcome, ReportJob, ReportPipeline};
pub use prompt::{render, PromptAssembler, PromptContext, TemplateError};
