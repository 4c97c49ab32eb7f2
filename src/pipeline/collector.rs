//! Context Collector
//!
//! Shallow-clones a repository into a scratch directory and pulls a fixed
//! allow-list of top-level files out of it. The scratch directory is a
//! [`TempDir`], so it is removed on every exit path.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Top-level files inspected after cloning, in lookup order
pub const FILES_TO_EXTRACT: &[&str] = &[
    "README.md",
    "README.rst",
    "README.txt",
    "requirements.txt",
    "pyproject.toml",
    "uv.lock",
    "package.json",
    "pom.xml",
    "build.gradle",
    "Gemfile",
    "go.mod",
    "Cargo.toml",
    "composer.json",
    "Dockerfile",
];

/// Per-file character ceiling
pub const MAX_FILE_CONTENT_CHARS: usize = 10_000;

pub const TRUNCATION_MARKER: &str = "\n... [TRUNCATED]";

const DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("git exited with {status}: {stderr}")]
    Git { status: String, stderr: String },

    #[error("could not run git: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Failed to clone repository: {0}")]
    Clone(#[from] CloneError),

    #[error("Unexpected error processing repository: {0}")]
    Unexpected(String),
}

/// Fetches the latest revision of a repository into an empty directory
#[async_trait]
pub trait RepoCloner: Send + Sync {
    async fn shallow_clone(&self, url: &str, dest: &Path) -> Result<(), CloneError>;
}

/// Clones with the `git` binary found on `PATH`
#[derive(Debug, Clone, Default)]
pub struct GitCloner;

#[async_trait]
impl RepoCloner for GitCloner {
    async fn shallow_clone(&self, url: &str, dest: &Path) -> Result<(), CloneError> {
        let output = Command::new("git")
            .args(["clone", "--depth", "1", "--quiet", "--"])
            .arg(url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(CloneError::Git {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Context extracted from a repository. `None` means no file of that kind exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoContext {
    pub readme: Option<String>,
    pub dependency_manifest_text: Option<String>,
    pub dockerfile: Option<String>,
}

impl RepoContext {
    pub fn is_empty(&self) -> bool {
        self.readme.is_none() && self.dependency_manifest_text.is_none() && self.dockerfile.is_none()
    }
}

/// Cuts `content` to the character ceiling, appending the truncation marker
pub fn truncate_content(content: String, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut truncated = content[..byte_idx].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => content,
    }
}

/// Reads the allow-listed files from a checked-out repository root
pub async fn extract_context(repo_root: &Path, max_chars: usize) -> RepoContext {
    let mut context = RepoContext::default();
    let mut manifests = Vec::new();

    for &filename in FILES_TO_EXTRACT {
        let path = repo_root.join(filename);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            _ => continue,
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(file = filename, error = %e, "Could not read file, skipping");
                continue;
            }
        };
        debug!(file = filename, "Found file");

        let raw = String::from_utf8_lossy(&bytes).into_owned();
        let original_len = raw.chars().count();
        let content = truncate_content(raw, max_chars);
        if original_len > max_chars {
            debug!(file = filename, chars = original_len, "Truncated file content");
        }

        if filename.to_lowercase().starts_with("readme") {
            if context.readme.is_none() {
                context.readme = Some(content);
            }
        } else if filename == DOCKERFILE {
            context.dockerfile = Some(content);
        } else {
            manifests.push(format!("--- Content of {} ---\n{}", filename, content));
        }
    }

    if !manifests.is_empty() {
        context.dependency_manifest_text = Some(manifests.join("\n\n"));
    }
    context
}

pub struct ContextCollector {
    cloner: Box<dyn RepoCloner>,
}

impl ContextCollector {
    pub fn new(cloner: Box<dyn RepoCloner>) -> Self {
        Self { cloner }
    }

    pub fn with_git() -> Self {
        Self::new(Box::new(GitCloner))
    }

    /// Clones `url` and extracts its context
    pub async fn collect(&self, url: &str) -> Result<RepoContext, CollectError> {
        let workdir = TempDir::new()
            .map_err(|e| CollectError::Unexpected(format!("could not create work directory: {}", e)))?;
        let checkout = workdir.path().join("repo");

        info!(url, dest = %checkout.display(), "Cloning repository");
        self.cloner.shallow_clone(url, &checkout).await?;
        info!(url, "Cloned repository");

        let context = extract_context(&checkout, MAX_FILE_CONTENT_CHARS).await;
        info!(
            url,
            readme = context.readme.is_some(),
            dependencies = context.dependency_manifest_text.is_some(),
            dockerfile = context.dockerfile.is_some(),
            "Finished processing repository"
        );
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Remembers where it was asked to clone; writes a README or fails
    struct DestRecorder {
        dest: Arc<Mutex<Option<PathBuf>>>,
        fail: bool,
    }

    #[async_trait]
    impl RepoCloner for DestRecorder {
        async fn shallow_clone(&self, _url: &str, dest: &Path) -> Result<(), CloneError> {
            *self.dest.lock().unwrap() = Some(dest.to_path_buf());
            std::fs::create_dir_all(dest)?;
            if self.fail {
                return Err(CloneError::Git {
                    status: "exit status: 128".to_string(),
                    stderr: "fatal: could not read Username".to_string(),
                });
            }
            std::fs::write(dest.join("README.md"), "# Cloned")?;
            Ok(())
        }
    }

    async fn collect_recording(fail: bool) -> (Result<RepoContext, CollectError>, PathBuf) {
        let dest = Arc::new(Mutex::new(None));
        let collector = ContextCollector::new(Box::new(DestRecorder {
            dest: Arc::clone(&dest),
            fail,
        }));
        let result = collector.collect("https://github.com/acme/shop").await;
        let recorded = dest.lock().unwrap().clone().unwrap();
        (result, recorded)
    }

    #[tokio::test]
    async fn test_work_directory_removed_after_success() {
        let (result, dest) = collect_recording(false).await;
        assert_eq!(result.unwrap().readme.as_deref(), Some("# Cloned"));
        assert!(!dest.exists());
        assert!(!dest.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn test_work_directory_removed_after_clone_failure() {
        let (result, dest) = collect_recording(true).await;
        assert!(matches!(result, Err(CollectError::Clone(_))));
        assert!(!dest.parent().unwrap().exists());
    }

    #[test]
    fn test_truncate_under_ceiling_is_untouched() {
        assert_eq!(truncate_content("short".to_string(), 10), "short");
        assert_eq!(truncate_content("exactly10!".to_string(), 10), "exactly10!");
    }

    #[test]
    fn test_truncate_over_ceiling_appends_marker() {
        let truncated = truncate_content("abcdefghijkl".to_string(), 10);
        assert_eq!(truncated, "abcdefghij\n... [TRUNCATED]");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let content = "é".repeat(12);
        let truncated = truncate_content(content, 10);
        assert!(truncated.starts_with(&"é".repeat(10)));
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_extract_readme_and_go_mod() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("README.md"), "# Service").unwrap();
        std::fs::write(temp.path().join("go.mod"), "module example.com/svc\n").unwrap();

        let context = extract_context(temp.path(), MAX_FILE_CONTENT_CHARS).await;
        assert_eq!(context.readme.as_deref(), Some("# Service"));
        assert_eq!(
            context.dependency_manifest_text.as_deref(),
            Some("--- Content of go.mod ---\nmodule example.com/svc\n")
        );
        assert!(context.dockerfile.is_none());
    }

    #[tokio::test]
    async fn test_first_readme_wins_and_manifests_keep_order() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("README.rst"), "rst readme").unwrap();
        std::fs::write(temp.path().join("README.txt"), "txt readme").unwrap();
        std::fs::write(temp.path().join("package.json"), "{}").unwrap();
        std::fs::write(temp.path().join("requirements.txt"), "flask").unwrap();
        std::fs::write(temp.path().join("Dockerfile"), "FROM python:3.12").unwrap();

        let context = extract_context(temp.path(), MAX_FILE_CONTENT_CHARS).await;
        assert_eq!(context.readme.as_deref(), Some("rst readme"));
        assert_eq!(context.dockerfile.as_deref(), Some("FROM python:3.12"));
        assert_eq!(
            context.dependency_manifest_text.as_deref(),
            Some("--- Content of requirements.txt ---\nflask\n\n--- Content of package.json ---\n{}")
        );
    }

    #[tokio::test]
    async fn test_subdirectories_are_not_inspected() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("backend")).unwrap();
        std::fs::write(temp.path().join("backend/go.mod"), "module nested").unwrap();
        std::fs::create_dir(temp.path().join("Dockerfile")).unwrap();

        let context = extract_context(temp.path(), MAX_FILE_CONTENT_CHARS).await;
        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_large_manifest_is_truncated() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("pom.xml"), "x".repeat(50)).unwrap();

        let context = extract_context(temp.path(), 20).await;
        let text = context.dependency_manifest_text.unwrap();
        assert_eq!(
            text,
            format!("--- Content of pom.xml ---\n{}{}", "x".repeat(20), TRUNCATION_MARKER)
        );
    }

    #[test]
    fn test_collect_error_messages() {
        let err = CollectError::from(CloneError::Git {
            status: "exit status: 128".to_string(),
            stderr: "fatal: repository not found".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Failed to clone repository: git exited with exit status: 128: fatal: repository not found"
        );
    }
}
