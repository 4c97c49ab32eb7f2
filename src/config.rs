//! Configuration management for migration-scout
//!
//! Settings are loaded from environment variables with defaults. A missing
//! provider or attachment directory does not stop the server: every report
//! submitted while they are unset fails with a configuration error instead.
//!
//! # Environment Variables
//!
//! - `SCOUT_PROVIDER`: ollama|openai|claude|gemini|grok|groq (no default)
//! - `SCOUT_MODEL`: model name - default: "gemini-2.0-flash"
//! - `SCOUT_API_BASE_URL`: custom endpoint for the provider
//! - `SCOUT_ATTACHMENT_DIR`: where uploaded documents are stored (no default)
//! - `SCOUT_DATA_DIR`: persist reports as JSON documents here (in-memory if unset)
//! - `SCOUT_PROMPT_TEMPLATE`: prompt template path - default: "prompts/migration_report.md"
//! - `SCOUT_BIND_ADDR`: listen address - default: "0.0.0.0:8000"
//! - `SCOUT_REQUEST_TIMEOUT`: model request timeout in seconds - default: "120"
//! - `SCOUT_MAX_UPLOAD_BYTES`: request body ceiling - default: 32 MiB
//! - `SCOUT_LOG_LEVEL`: logging level - default: "info"
//!
//! Provider credentials are read by genai from each provider's standard
//! variable (`GEMINI_API_KEY`, `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, ...).

use crate::ai::GenAIBackend;
use crate::attachments::LocalAttachmentStore;
use crate::report::{FileReportStore, MemoryReportStore, ReportStore, StoreError};
use crate::util::logging::LOG_LEVEL_VAR;
use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PROMPT_TEMPLATE: &str = "prompts/migration_report.md";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub const PROVIDER_VAR: &str = "SCOUT_PROVIDER";
pub const ATTACHMENT_DIR_VAR: &str = "SCOUT_ATTACHMENT_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid provider: {0}. Valid options: ollama, openai, claude, gemini, grok, groq")]
    InvalidProvider(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Failed to open report store: {0}")]
    Store(#[from] StoreError),
}

/// Parses a provider name, accepting genai's adapter names as aliases
pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    let lower = name.trim().to_lowercase();
    match lower.as_str() {
        "claude" => Ok(AdapterKind::Anthropic),
        "grok" => Ok(AdapterKind::Xai),
        other => AdapterKind::from_lower_str(other)
            .ok_or_else(|| ConfigError::InvalidProvider(name.to_string())),
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// `None` when unset or unrecognised
    pub provider: Option<AdapterKind>,
    pub model: String,
    pub api_base_url: Option<String>,
    pub attachment_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub prompt_template: PathBuf,
    pub bind_addr: String,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        let provider = env_opt(PROVIDER_VAR).and_then(|name| match parse_provider(&name) {
            Ok(kind) => Some(kind),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        });

        let request_timeout_secs = env_opt("SCOUT_REQUEST_TIMEOUT")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let max_upload_bytes = env_opt("SCOUT_MAX_UPLOAD_BYTES")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Self {
            provider,
            model: env_opt("SCOUT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base_url: env_opt("SCOUT_API_BASE_URL"),
            attachment_dir: env_opt(ATTACHMENT_DIR_VAR).map(PathBuf::from),
            data_dir: env_opt("SCOUT_DATA_DIR").map(PathBuf::from),
            prompt_template: env_opt("SCOUT_PROMPT_TEMPLATE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROMPT_TEMPLATE)),
            bind_addr: env_opt("SCOUT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            request_timeout_secs,
            max_upload_bytes,
            log_level: env_opt(LOG_LEVEL_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
        }
    }
}

impl ScoutConfig {
    /// Checks values that would make the process itself unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max upload size must be greater than zero".to_string(),
            ));
        }

        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid bind address: {}",
                self.bind_addr
            )));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Names of the required settings that are unset
    pub fn missing_runtime_settings(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.provider.is_none() {
            missing.push(PROVIDER_VAR.to_string());
        }
        if self.attachment_dir.is_none() {
            missing.push(ATTACHMENT_DIR_VAR.to_string());
        }
        missing
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn create_backend(&self) -> Option<Arc<GenAIBackend>> {
        self.provider.map(|provider| {
            Arc::new(GenAIBackend::with_endpoint(
                provider,
                self.model.clone(),
                self.request_timeout(),
                self.api_base_url.clone(),
            ))
        })
    }

    pub fn create_attachment_store(&self) -> Option<Arc<LocalAttachmentStore>> {
        self.attachment_dir
            .as_ref()
            .map(|dir| Arc::new(LocalAttachmentStore::new(dir)))
    }

    /// File-backed when `data_dir` is set, in-memory otherwise
    pub async fn create_report_store(&self) -> Result<Arc<dyn ReportStore>, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(Arc::new(FileReportStore::open(dir).await?)),
            None => Ok(Arc::new(MemoryReportStore::new())),
        }
    }
}

fn or_unset<T: fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(unset)".to_string())
}

impl fmt::Display for ScoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration Scout Configuration:")?;
        writeln!(f, "  Provider: {}", or_unset(self.provider.map(|p| p.as_str())))?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  API Base URL: {}", or_unset(self.api_base_url.as_deref()))?;
        writeln!(
            f,
            "  Attachment Dir: {}",
            or_unset(self.attachment_dir.as_ref().map(|p| p.display()))
        )?;
        writeln!(
            f,
            "  Data Dir: {}",
            or_unset(self.data_dir.as_ref().map(|p| p.display()))
        )?;
        writeln!(f, "  Prompt Template: {}", self.prompt_template.display())?;
        writeln!(f, "  Bind Address: {}", self.bind_addr)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Max Upload Size: {} bytes", self.max_upload_bytes)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
