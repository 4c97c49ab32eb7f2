//! Prompt Assembler
//!
//! Templates use `{name}` placeholders; `{{` and `}}` produce literal braces.
//! Every placeholder must be one the [`PromptContext`] supplies, and every
//! supplied value is non-empty, so a rendered prompt never has holes.

use super::collector::RepoContext;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const NOT_SPECIFIED: &str = "Not Specified";
pub const README_NOT_FOUND: &str = "README not found or empty.";
pub const DEPENDENCIES_NOT_FOUND: &str = "Dependency files not found or empty.";
pub const DOCKERFILE_NOT_FOUND: &str = "Dockerfile not found or empty.";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Server configuration error: Prompt template missing ({}).", .0.display())]
    Missing(PathBuf),

    #[error("Server error: Could not read prompt template ({}): {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Server configuration error: Invalid prompt template (missing key '{0}').")]
    UnknownPlaceholder(String),

    #[error("Server configuration error: Could not format prompt template: {0}.")]
    Malformed(String),
}

/// Values substituted into the template
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub target_platform: Option<String>,
    pub github_repo_url: String,
    pub repo: RepoContext,
}

fn or_sentinel(value: Option<&str>, sentinel: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => sentinel.to_string(),
    }
}

impl PromptContext {
    pub fn new(github_repo_url: impl Into<String>, target_platform: Option<String>, repo: RepoContext) -> Self {
        Self {
            target_platform,
            github_repo_url: github_repo_url.into(),
            repo,
        }
    }

    /// Placeholder values with absent or empty entries replaced by sentinels
    pub fn values(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            (
                "target_platform",
                or_sentinel(self.target_platform.as_deref(), NOT_SPECIFIED),
            ),
            ("github_repo_url", self.github_repo_url.clone()),
            (
                "readme_content",
                or_sentinel(self.repo.readme.as_deref(), README_NOT_FOUND),
            ),
            (
                "dependency_files_content",
                or_sentinel(
                    self.repo.dependency_manifest_text.as_deref(),
                    DEPENDENCIES_NOT_FOUND,
                ),
            ),
            (
                "dockerfile_content",
                or_sentinel(self.repo.dockerfile.as_deref(), DOCKERFILE_NOT_FOUND),
            ),
        ])
    }
}

/// Substitutes `values` into `template`
pub fn render(template: &str, values: &HashMap<&str, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => {
                            return Err(TemplateError::Malformed(format!(
                                "unexpected '{{' inside placeholder '{}'",
                                name
                            )))
                        }
                        Some(ch) => name.push(ch),
                        None => {
                            return Err(TemplateError::Malformed(
                                "unclosed '{' in template".to_string(),
                            ))
                        }
                    }
                }
                if name.is_empty() {
                    return Err(TemplateError::Malformed("empty placeholder '{}'".to_string()));
                }
                let value = values
                    .get(name.as_str())
                    .ok_or(TemplateError::UnknownPlaceholder(name))?;
                out.push_str(value);
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => {
                return Err(TemplateError::Malformed(
                    "single '}' encountered in template".to_string(),
                ))
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Loads the template from disk on every use, so edits apply to the next report
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template_path: PathBuf,
}

impl PromptAssembler {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub async fn load_template(&self) -> Result<String, TemplateError> {
        match tokio::fs::metadata(&self.template_path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(TemplateError::Missing(self.template_path.clone())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TemplateError::Missing(self.template_path.clone()))
            }
            Err(source) => {
                return Err(TemplateError::Unreadable {
                    path: self.template_path.clone(),
                    source,
                })
            }
        }

        debug!(path = %self.template_path.display(), "Loading prompt template");
        tokio::fs::read_to_string(&self.template_path)
            .await
            .map_err(|source| TemplateError::Unreadable {
                path: self.template_path.clone(),
                source,
            })
    }

    pub async fn assemble(&self, context: &PromptContext) -> Result<String, TemplateError> {
        let template = self.load_template().await?;
        render(&template, &context.values())
    }
}
