use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Config, StorageKind};
use crate::error::Result;

/// A stream of file bytes suitable for an axum response body.
pub type FileStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// The result of persisting an upload.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Opaque reference a job record keeps to locate its bytes.
    pub reference: String,
    /// Backend-specific direct-access URL, when the backend has one
    /// (signed URL for object storage; the local backend only serves
    /// through the proxy route).
    pub direct_url: Option<String>,
}

/// A locally-resident copy of a stored file, ready for print dispatch.
///
/// `temporary` files were downloaded from a remote backend and should be
/// removed shortly after the dispatch attempt.
#[derive(Debug)]
pub struct SpoolFile {
    pub path: PathBuf,
    pub temporary: bool,
}

/// Abstraction over where uploaded PDFs live.
///
/// Callers treat `delete` as best-effort: storage cleanup must never
/// strand a job in an inconsistent status, and deleting an already-absent
/// reference is not an error.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Persists the uploaded bytes and returns the reference + direct URL.
    async fn store(&self, user_id: Uuid, job_id: Uuid, bytes: Bytes) -> Result<StoredFile>;

    /// Opens the stored bytes for streaming to a client.
    async fn stream(&self, reference: &str) -> Result<FileStream>;

    /// Produces a local filesystem path for print dispatch.
    async fn materialize(&self, reference: &str) -> Result<SpoolFile>;

    /// Whether the reference currently resolves to stored bytes.
    async fn exists(&self, reference: &str) -> Result<bool>;

    /// Removes the stored bytes. Idempotent.
    async fn delete(&self, reference: &str) -> Result<()>;

    /// A direct-access URL for the reference, if the backend has one.
    async fn direct_url(&self, reference: &str) -> Result<Option<String>>;
}

/// Collapses a doubled `.pdf.pdf` extension and guarantees a `.pdf` tail.
///
/// Some uploaders append the extension to an already-suffixed name; the
/// doubled form otherwise leaks into storage references and
/// Content-Disposition headers.
pub fn normalize_pdf_name(name: &str) -> String {
    let mut name = name.trim().to_string();
    loop {
        let lower = name.to_ascii_lowercase();
        if let Some(stem) = lower.strip_suffix(".pdf.pdf") {
            name.truncate(stem.len() + ".pdf".len());
        } else {
            break;
        }
    }
    if !name.to_ascii_lowercase().ends_with(".pdf") {
        name.push_str(".pdf");
    }
    name
}

/// Builds the concrete backend selected by configuration.
pub async fn from_config(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    match config.storage_kind {
        StorageKind::Local => {
            let backend = super::local::LocalStorage::new(&config.storage_root).await?;
            tracing::info!("✅ Local storage backend ready at {}", config.storage_root);
            Ok(Arc::new(backend))
        }
        StorageKind::S3 => {
            let backend = super::s3::S3Storage::from_config(config).await?;
            tracing::info!("✅ S3 storage backend ready (bucket: {})", config.s3_bucket);
            Ok(Arc::new(backend))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubled_extension_collapses() {
        assert_eq!(normalize_pdf_name("report.pdf.pdf"), "report.pdf");
        assert_eq!(normalize_pdf_name("report.pdf.pdf.pdf"), "report.pdf");
        assert_eq!(normalize_pdf_name("report.pdf"), "report.pdf");
    }

    #[test]
    fn missing_extension_is_added() {
        assert_eq!(normalize_pdf_name("notes"), "notes.pdf");
        assert_eq!(normalize_pdf_name("  notes.PDF "), "notes.PDF");
    }
}
