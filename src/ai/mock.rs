use super::backend::AnalysisBackend;
use super::error::BackendError;
use crate::attachments::Attachment;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Backend that replays queued responses in order
pub struct MockBackend {
    responses: Mutex<VecDeque<MockResponse>>,
    prompts: Mutex<Vec<RecordedCall>>,
    name: String,
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Text(String),
    Error(BackendError),
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        MockResponse::Text(content.into())
    }

    pub fn error(error: BackendError) -> Self {
        MockResponse::Error(error)
    }
}

/// What the backend was asked, kept for assertions
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub document_names: Vec<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::with_name("MockBackend")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            name: name.into(),
        }
    }

    pub fn with_response(self, response: MockResponse) -> Self {
        self.add_response(response);
        self
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisBackend for MockBackend {
    async fn analyze(
        &self,
        prompt: &str,
        documents: &[Attachment],
    ) -> Result<String, BackendError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                prompt: prompt.to_string(),
                document_names: documents.iter().map(|d| d.name.clone()).collect(),
            });

        let response = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| BackendError::Other {
                message: "MockBackend: No more responses in queue".to_string(),
            })?;

        match response {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Error(error) => Err(error),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_responses_replay_in_order() {
        let backend = MockBackend::new()
            .with_response(MockResponse::text("first"))
            .with_response(MockResponse::error(BackendError::TimeoutError { seconds: 5 }));

        assert_eq!(backend.analyze("p1", &[]).await.unwrap(), "first");
        let err = backend.analyze("p2", &[]).await.unwrap_err();
        assert_eq!(err, BackendError::TimeoutError { seconds: 5 });

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].prompt, "p1");
    }

    #[tokio::test]
    async fn test_empty_queue_is_error() {
        let backend = MockBackend::with_name("Empty");
        assert_eq!(backend.name(), "Empty");
        assert!(backend.analyze("p", &[]).await.is_err());
    }
}
