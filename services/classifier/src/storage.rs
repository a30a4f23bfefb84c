use crate::config::StorageConfig;
use crate::source::SourceFile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Errors that can occur while storing a selected image
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Object store rejected upload of {key}: {message}")]
    Store { key: String, message: String },

    #[error("Failed to resolve public URL for {key}: {message}")]
    PublicUrl { key: String, message: String },
}

/// An uploaded image and the URL it can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key returned by the object store
    pub key: String,
    /// Publicly retrievable URL for the object
    pub public_url: String,
}

/// Binary object store holding uploaded images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` under `key`
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;

    /// Resolve `key` to a URL anyone can GET
    async fn public_url(&self, key: &str) -> Result<String>;
}

/// S3-compatible object store
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
    public_base_url: Option<String>,
    presigned_url_expiry: Duration,
}

impl S3ObjectStore {
    /// Create a new S3 object store client
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            public_base_url = ?config.public_base_url,
            "S3 object store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
            presigned_url_expiry: config.presigned_url_expiry(),
        })
    }

    /// Generate a presigned GET URL for a key
    async fn presigned_url(&self, key: &str) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(self.presigned_url_expiry)
            .context("Failed to create presigning config")?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .context("Failed to generate presigned URL")?;

        Ok(presigned.uri().to_string())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("Failed to upload image to S3")?;

        Ok(())
    }

    async fn public_url(&self, key: &str) -> Result<String> {
        match self.public_base_url {
            Some(ref base) => Ok(public_object_url(base, key)),
            None => self.presigned_url(key).await,
        }
    }
}

/// Join a public base URL and an object key
fn public_object_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}

/// Generate the object key for an upload.
///
/// Format: `{unix_millis}-{suffix}.{extension}`. Uniqueness is
/// probabilistic; there is no collision check.
pub fn object_key(file: &SourceFile, now: DateTime<Utc>, suffix: &str) -> String {
    format!(
        "{timestamp}-{suffix}.{extension}",
        timestamp = now.timestamp_millis(),
        suffix = suffix,
        extension = file.extension()
    )
}

fn random_suffix() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(12);
    suffix
}

/// Uploads selected images to the object store.
///
/// Not idempotent: every call stores a new object.
#[derive(Clone)]
pub struct StorageUploader {
    store: Arc<dyn ObjectStore>,
}

impl StorageUploader {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload a file and resolve its public URL
    #[instrument(skip(self, file), fields(file_name = %file.name, size_bytes = file.size()))]
    pub async fn upload(&self, file: &SourceFile) -> Result<StoredObject, UploadError> {
        let key = object_key(file, Utc::now(), &random_suffix());
        let started = Instant::now();

        debug!(key = %key, content_type = %file.content_type, "Uploading image");

        if let Err(e) = self
            .store
            .put_object(&key, file.bytes.clone(), &file.content_type)
            .await
        {
            warn!(key = %key, error = %e, "Image upload failed");
            metrics::counter!("classifier_uploads_total", "outcome" => "failure").increment(1);
            return Err(UploadError::Store {
                key,
                message: format!("{e:#}"),
            });
        }

        let public_url = self.store.public_url(&key).await.map_err(|e| {
            warn!(key = %key, error = %e, "Public URL resolution failed");
            metrics::counter!("classifier_uploads_total", "outcome" => "failure").increment(1);
            UploadError::PublicUrl {
                key: key.clone(),
                message: format!("{e:#}"),
            }
        })?;

        metrics::counter!("classifier_uploads_total", "outcome" => "success").increment(1);
        metrics::histogram!("classifier_upload_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        info!(key = %key, size_bytes = file.size(), "Image uploaded successfully");

        Ok(StoredObject { key, public_url })
    }
}
