//! Storage for documents uploaded alongside a report request
//!
//! Each document is stored at `docs/<report_id>/<sanitized filename>` below
//! the configured root. The returned reference is recorded on the report
//! before its pipeline starts and handed back to [`AttachmentStore::load`]
//! when the model is called.

use crate::report::ReportId;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const CONTENT_TYPE_SUFFIX: &str = ".content-type";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Invalid attachment filename: '{0}'")]
    InvalidFilename(String),

    #[error("Attachment not found: {0}")]
    NotFound(String),

    #[error("Attachment I/O error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A stored document loaded back for analysis
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    /// The document as UTF-8 text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Reduces a client-supplied filename to its final component with spaces
/// replaced by underscores.
pub fn sanitize_filename(filename: &str) -> Result<String, AttachmentError> {
    let normalized = filename.replace('\\', "/");
    let base = Path::new(&normalized)
        .components()
        .next_back()
        .and_then(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .unwrap_or("");

    let safe = base.trim().replace(' ', "_");
    if safe.is_empty() || safe == "." || safe == ".." || safe.ends_with(CONTENT_TYPE_SUFFIX) {
        return Err(AttachmentError::InvalidFilename(filename.to_string()));
    }
    Ok(safe)
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Stores one document and returns its location reference
    async fn put(
        &self,
        report_id: &ReportId,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, AttachmentError>;

    async fn load(&self, reference: &str) -> Result<Attachment, AttachmentError>;
}

/// Attachment store on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    root: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative object path for a document, e.g. `docs/<id>/design_notes.pdf`
    pub fn object_path(report_id: &ReportId, safe_filename: &str) -> PathBuf {
        PathBuf::from("docs")
            .join(report_id.to_string())
            .join(safe_filename)
    }

    fn sidecar(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(CONTENT_TYPE_SUFFIX);
        PathBuf::from(name)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> AttachmentError {
    AttachmentError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn put(
        &self,
        report_id: &ReportId,
        filename: &str,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, AttachmentError> {
        let safe = sanitize_filename(filename)?;
        let path = self.root.join(Self::object_path(report_id, &safe));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| io_error(&path, e))?;

        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);
        let sidecar = Self::sidecar(&path);
        tokio::fs::write(&sidecar, content_type)
            .await
            .map_err(|e| io_error(&sidecar, e))?;

        let absolute = tokio::fs::canonicalize(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        let reference = absolute.display().to_string();

        info!(
            report_id = %report_id,
            filename = %safe,
            bytes = bytes.len(),
            reference = %reference,
            "Stored attachment"
        );
        Ok(reference)
    }

    async fn load(&self, reference: &str) -> Result<Attachment, AttachmentError> {
        let path = PathBuf::from(reference);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AttachmentError::NotFound(reference.to_string()))
            }
            Err(e) => return Err(io_error(&path, e)),
        };

        let content_type = tokio::fs::read_to_string(Self::sidecar(&path))
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| DEFAULT_CONTENT_TYPE.to_string());

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| reference.to_string());

        debug!(reference, content_type = %content_type, "Loaded attachment");
        Ok(Attachment {
            name,
            content_type,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_keeps_basename_and_replaces_spaces() {
        assert_eq!(sanitize_filename("design notes.pdf").unwrap(), "design_notes.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd").unwrap(), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\arch doc.md").unwrap(), "arch_doc.md");
    }

    #[test]
    fn test_sanitize_rejects_empty_names() {
        assert!(sanitize_filename("").is_err());
        assert!(sanitize_filename("   ").is_err());
        assert!(sanitize_filename("..").is_err());
        assert!(sanitize_filename("dir/").is_ok());
        assert!(sanitize_filename("x.content-type").is_err());
    }

    #[test]
    fn test_object_path_layout() {
        let id: ReportId = "6f1c1a3e-8f0e-4c8b-9a57-1f0d2b0f9c11".parse().unwrap();
        assert_eq!(
            LocalAttachmentStore::object_path(&id, "notes.md"),
            PathBuf::from("docs/6f1c1a3e-8f0e-4c8b-9a57-1f0d2b0f9c11/notes.md")
        );
    }

    #[tokio::test]
    async fn test_put_then_load() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path());
        let id = ReportId::new();

        let reference = store
            .put(&id, "run book.md", Some("text/markdown"), b"# Runbook")
            .await
            .unwrap();
        assert!(reference.ends_with("run_book.md"));
        assert!(reference.contains(&id.to_string()));

        let attachment = store.load(&reference).await.unwrap();
        assert_eq!(attachment.name, "run_book.md");
        assert_eq!(attachment.content_type, "text/markdown");
        assert_eq!(attachment.as_text(), Some("# Runbook"));
    }

    #[tokio::test]
    async fn test_load_missing_reference() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path());
        let missing = temp.path().join("nope.txt");
        let err = store.load(&missing.display().to_string()).await.unwrap_err();
        assert!(matches!(err, AttachmentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_default_content_type() {
        let temp = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(temp.path());
        let reference = store
            .put(&ReportId::new(), "blob.bin", None, &[0xff, 0xfe, 0x00])
            .await
            .unwrap();
        let attachment = store.load(&reference).await.unwrap();
        assert_eq!(attachment.content_type, "application/octet-stream");
        assert!(attachment.as_text().is_none());
    }
}
