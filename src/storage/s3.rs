use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use super::backend::{FileStream, SpoolFile, StorageBackend, StoredFile};
use crate::config::Config;
use crate::error::{AppError, Result};

/// How long presigned direct-access URLs stay valid.
const PRESIGN_TTL_SECS: u64 = 3600;

/// S3-compatible object storage backend.
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Builds the backend from the ambient AWS environment, honoring an
    /// optional custom endpoint (MinIO and friends need path-style).
    pub async fn from_config(config: &Config) -> Result<Self> {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let client = match &config.s3_endpoint {
            Some(endpoint) => {
                let s3_config = aws_sdk_s3::config::Builder::from(&shared)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(s3_config)
            }
            None => Client::new(&shared),
        };

        Ok(Self {
            client,
            bucket: config.s3_bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn store(&self, user_id: Uuid, job_id: Uuid, bytes: Bytes) -> Result<StoredFile> {
        let reference = format!("jobs/{}/{}.pdf", user_id, job_id);
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&reference)
            .content_type("application/pdf")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("put_object failed: {}", e)))?;

        tracing::debug!("💾 Uploaded {} bytes to s3://{}/{}", size, self.bucket, reference);

        let direct_url = self.direct_url(&reference).await?;

        Ok(StoredFile {
            reference,
            direct_url,
        })
    }

    async fn stream(&self, reference: &str) -> Result<FileStream> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    AppError::FileUnavailable(format!("No stored object for {}", reference))
                } else {
                    AppError::Storage(format!("get_object failed: {}", service_err))
                }
            })?;

        Ok(Box::pin(ReaderStream::new(resp.body.into_async_read())))
    }

    async fn materialize(&self, reference: &str) -> Result<SpoolFile> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    AppError::FileUnavailable(format!("No stored object for {}", reference))
                } else {
                    AppError::Storage(format!("get_object failed: {}", service_err))
                }
            })?;

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("object download failed: {}", e)))?
            .into_bytes();

        let spool = tempfile::Builder::new()
            .prefix("printhub-")
            .suffix(".pdf")
            .tempfile()
            .map_err(AppError::Io)?;
        let path = spool
            .into_temp_path()
            .keep()
            .map_err(|e| AppError::Internal(format!("Failed to keep spool file: {}", e)))?;

        tokio::fs::write(&path, &bytes).await?;

        tracing::debug!(
            "📄 Spooled s3://{}/{} to {} for dispatch",
            self.bucket,
            reference,
            path.display()
        );

        Ok(SpoolFile {
            path,
            temporary: true,
        })
    }

    async fn exists(&self, reference: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(AppError::Storage(format!(
                        "head_object failed: {}",
                        service_err
                    )))
                }
            }
        }
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        // S3 DeleteObject succeeds for absent keys, so this is idempotent.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(reference)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("delete_object failed: {}", e)))?;
        Ok(())
    }

    async fn direct_url(&self, reference: &str) -> Result<Option<String>> {
        let presigning = PresigningConfig::expires_in(Duration::from_secs(PRESIGN_TTL_SECS))
            .map_err(|e| AppError::Storage(format!("presigning config: {}", e)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(reference)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Storage(format!("presign failed: {}", e)))?;

        Ok(Some(presigned.uri().to_string()))
    }
}
