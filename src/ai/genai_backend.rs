//! GenAI multi-provider analysis backend
//!
//! Uses the `genai` crate so the same code path serves Gemini, OpenAI,
//! Anthropic, Ollama and the other supported providers. Credentials come
//! from each provider's standard environment variable (`GEMINI_API_KEY`,
//! `OPENAI_API_KEY`, ...). Setting `SCOUT_API_BASE_URL` routes every request
//! to a custom endpoint instead. A provider whose key variable is unset
//! fails with [`BackendError::AuthenticationError`] before any request.

use super::backend::AnalysisBackend;
use super::error::BackendError;
use crate::attachments::Attachment;
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

const DEFAULT_TEMPERATURE: f64 = 0.3;

pub struct GenAIBackend {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
    max_tokens: Option<u32>,
}

impl GenAIBackend {
    pub fn new(provider: AdapterKind, model: String, timeout: Duration) -> Self {
        Self::with_endpoint(provider, model, timeout, None)
    }

    /// Creates a backend, optionally pinned to a custom API base URL
    pub fn with_endpoint(
        provider: AdapterKind,
        model: String,
        timeout: Duration,
        api_base_url: Option<String>,
    ) -> Self {
        let client = if let Some(endpoint_url) = api_base_url {
            debug!(
                "Using custom endpoint for {}: {}",
                provider.as_str(),
                endpoint_url
            );

            let model_clone = model.clone();
            let resolver = ServiceTargetResolver::from_resolver_fn(
                move |_service_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                    let endpoint = Endpoint::from_owned(endpoint_url.clone());

                    let auth = match provider.default_key_env_name() {
                        Some(api_key_var) => AuthData::from_env(api_key_var),
                        None => AuthData::from_single(""),
                    };

                    Ok(ServiceTarget {
                        endpoint,
                        auth,
                        model: ModelIden::new(provider, &model_clone),
                    })
                },
            );

            Client::builder()
                .with_service_target_resolver(resolver)
                .build()
        } else {
            Client::default()
        };

        debug!(
            "Creating GenAI backend: provider={}, model={}",
            provider.as_str(),
            model
        );

        Self {
            client,
            model,
            provider,
            timeout,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn check_credentials(&self) -> Result<(), BackendError> {
        let Some(key_var) = self.provider.default_key_env_name() else {
            return Ok(());
        };
        match env::var(key_var) {
            Ok(key) if !key.trim().is_empty() => Ok(()),
            _ => Err(BackendError::AuthenticationError {
                message: format!("{} is not set for {}", key_var, self.provider.as_str()),
            }),
        }
    }
}

/// Renders an attached document as a standalone user message.
///
/// Text documents are inlined; anything else is described so the model
/// knows it was supplied.
pub(crate) fn document_message_text(document: &Attachment) -> String {
    match document.as_text() {
        Some(text) => format!(
            "--- Attached document: {} ({}) ---\n{}",
            document.name, document.content_type, text
        ),
        None => format!(
            "--- Attached document: {} ({}, {} bytes) ---\nBinary content is not available as text.",
            document.name,
            document.content_type,
            document.bytes.len()
        ),
    }
}

#[async_trait]
impl AnalysisBackend for GenAIBackend {
    async fn analyze(
        &self,
        prompt: &str,
        documents: &[Attachment],
    ) -> Result<String, BackendError> {
        self.check_credentials()?;

        let mut messages = Vec::with_capacity(documents.len() + 1);
        messages.push(ChatMessage::user(prompt.to_string()));
        messages.extend(
            documents
                .iter()
                .map(|doc| ChatMessage::user(document_message_text(doc))),
        );
        let chat_req = ChatRequest::new(messages);

        let mut options = ChatOptions::default().with_temperature(DEFAULT_TEMPERATURE);
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }

        debug!(
            "Sending request to {}: prompt_length={}, documents={}",
            self.provider.as_str(),
            prompt.len(),
            documents.len()
        );

        let start = Instant::now();
        let response = match tokio::time::timeout(
            self.timeout,
            self.client.exec_chat(&self.model, chat_req, Some(&options)),
        )
        .await
        {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                error!("{} API error: {}", self.provider.as_str(), e);
                return Err(BackendError::ApiError {
                    message: format!("{} request failed: {}", self.provider.as_str(), e),
                    status_code: None,
                });
            }
            Err(_) => {
                error!(
                    "{} request timed out after {}s",
                    self.provider.as_str(),
                    self.timeout.as_secs()
                );
                return Err(BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        info!(
            "{} generation completed in {:.2}s",
            self.provider.as_str(),
            start.elapsed().as_secs_f64()
        );

        let content = response
            .first_text()
            .ok_or_else(|| BackendError::InvalidResponse {
                message: "No text content in response".to_string(),
            })?
            .to_string();

        debug!(
            "{} response length: {} characters",
            self.provider.as_str(),
            content.len()
        );

        Ok(content)
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIBackend")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
