//! Analysis backend abstraction
//!
//! A backend takes one fully assembled prompt plus the documents uploaded
//! with the request and returns the model's text unmodified. Interpreting
//! that text is the normalizer's job, not the backend's.

use super::error::BackendError;
use crate::attachments::Attachment;
use async_trait::async_trait;

#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Sends `prompt` and `documents` in one round trip and returns the raw reply
    async fn analyze(
        &self,
        prompt: &str,
        documents: &[Attachment],
    ) -> Result<String, BackendError>;

    /// Human-readable backend name, used in logs
    fn name(&self) -> &str;

    fn model_info(&self) -> Option<String> {
        None
    }
}
