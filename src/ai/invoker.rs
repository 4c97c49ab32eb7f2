//! Analysis Invoker: the pipeline's only doorway to the model
//!
//! `invoke` never fails. Any failure (loading an attachment, reaching the
//! provider, an empty reply) comes back as text starting with
//! [`ERROR_MARKER`], and callers tell the two apart with
//! [`is_error_response`].

use super::backend::AnalysisBackend;
use super::error::BackendError;
use crate::attachments::{Attachment, AttachmentStore};
use std::sync::Arc;
use tracing::{debug, warn};

pub const ERROR_MARKER: &str = "Error:";

pub fn is_error_response(text: &str) -> bool {
    text.starts_with(ERROR_MARKER)
}

#[derive(Clone)]
pub struct AnalysisInvoker {
    backend: Arc<dyn AnalysisBackend>,
    attachments: Option<Arc<dyn AttachmentStore>>,
}

impl AnalysisInvoker {
    pub fn new(backend: Arc<dyn AnalysisBackend>) -> Self {
        Self {
            backend,
            attachments: None,
        }
    }

    pub fn with_attachments(mut self, store: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = Some(store);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// One blocking round trip to the model. Returns its raw text unmodified,
    /// or an error-marked message.
    pub async fn invoke(&self, prompt: &str, attachment_refs: &[String]) -> String {
        match self.try_invoke(prompt, attachment_refs).await {
            Ok(text) => text,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Analysis invocation failed");
                format!("{} {}", ERROR_MARKER, e)
            }
        }
    }

    async fn try_invoke(
        &self,
        prompt: &str,
        attachment_refs: &[String],
    ) -> Result<String, BackendError> {
        let documents = self.load_documents(attachment_refs).await?;
        debug!(
            backend = self.backend.name(),
            model = ?self.backend.model_info(),
            documents = documents.len(),
            "Invoking analysis backend"
        );
        self.backend.analyze(prompt, &documents).await
    }

    async fn load_documents(&self, refs: &[String]) -> Result<Vec<Attachment>, BackendError> {
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        let store = self
            .attachments
            .as_ref()
            .ok_or_else(|| BackendError::ConfigurationError {
                message: "attachment storage is not configured".to_string(),
            })?;

        let mut documents = Vec::with_capacity(refs.len());
        for reference in refs {
            let document =
                store
                    .load(reference)
                    .await
                    .map_err(|e| BackendError::AttachmentError {
                        message: e.to_string(),
                    })?;
            documents.push(document);
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::{MockBackend, MockResponse};
    use crate::attachments::LocalAttachmentStore;
    use crate::report::ReportId;
    use tempfile::TempDir;

    #[test]
    fn test_error_marker_prefix_check() {
        assert!(is_error_response("Error: quota exhausted"));
        assert!(!is_error_response("{\"a\": 1}"));
        assert!(!is_error_response(" Error: leading space is not a marker"));
    }

    #[tokio::test]
    async fn test_invoke_returns_raw_text_unmodified() {
        let raw = "```json\n{\"a\": 1}\n```";
        let backend = Arc::new(MockBackend::new().with_response(MockResponse::text(raw)));
        let invoker = AnalysisInvoker::new(backend);
        assert_eq!(invoker.invoke("prompt", &[]).await, raw);
    }

    #[tokio::test]
    async fn test_invoke_maps_backend_failure_to_marker() {
        let backend = Arc::new(MockBackend::new().with_response(MockResponse::error(
            BackendError::ApiError {
                message: "Gemini request failed: 403".to_string(),
                status_code: Some(403),
            },
        )));
        let invoker = AnalysisInvoker::new(backend);
        let text = invoker.invoke("prompt", &[]).await;
        assert!(is_error_response(&text));
        assert!(text.contains("403"));
    }

    #[tokio::test]
    async fn test_attachments_without_store_fail_before_calling_model() {
        let backend = Arc::new(MockBackend::new().with_response(MockResponse::text("{}")));
        let invoker = AnalysisInvoker::new(backend.clone());
        let text = invoker
            .invoke("prompt", &["/tmp/does-not-matter".to_string()])
            .await;
        assert!(is_error_response(&text));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_attachments_are_loaded_and_forwarded() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(LocalAttachmentStore::new(temp.path()));
        let reference = store
            .put(&ReportId::new(), "arch.md", Some("text/markdown"), b"three tiers")
            .await
            .unwrap();

        let backend = Arc::new(MockBackend::new().with_response(MockResponse::text("{}")));
        let invoker = AnalysisInvoker::new(backend.clone()).with_attachments(store);
        assert_eq!(invoker.invoke("prompt", &[reference]).await, "{}");
        assert_eq!(backend.calls()[0].document_names, vec!["arch.md".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_attachment_is_error_marked() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(LocalAttachmentStore::new(temp.path()));
        let backend = Arc::new(MockBackend::new().with_response(MockResponse::text("{}")));
        let invoker = AnalysisInvoker::new(backend).with_attachments(store);
        let missing = temp.path().join("gone.md").display().to_string();
        let text = invoker.invoke("prompt", &[missing]).await;
        assert!(text.starts_with("Error: Attachment error:"));
    }
}
