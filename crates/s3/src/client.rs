//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from objgate-core.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier};

use objgate_core::{
    DownloadedFile, Error, ObjectPath, ObjectStore, Presence, Result, StoreSettings,
};

use crate::error::{is_not_found, probe_result, store_error};
use crate::locator::Locator;
use crate::multipart::{self, MultipartConfig, MultipartSource};

/// S3 rejects an explicit location constraint for its default region
const DEFAULT_REGION: &str = "us-east-1";

/// S3 client wrapper
#[derive(Debug, Clone)]
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    locator: Locator,
    concurrency: usize,
}

impl S3Client {
    /// Create a new S3 client from connection settings
    pub async fn new(settings: &StoreSettings) -> Result<Self> {
        settings.validate()?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()));

        // Static credentials when configured, otherwise the SDK default chain
        if let (Some(access_key), Some(secret_key)) = (&settings.access_key, &settings.secret_key)
        {
            let credentials = aws_credential_types::Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "objgate-static-credentials",
            );
            loader = loader.credentials_provider(credentials);
        }

        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let Some(timeout) = &settings.timeout {
            loader = loader.timeout_config(
                aws_config::timeout::TimeoutConfig::builder()
                    .connect_timeout(Duration::from_millis(timeout.connect_ms))
                    .read_timeout(Duration::from_millis(timeout.read_ms))
                    .build(),
            );
        }

        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(settings.use_path_style())
            .build();

        Self::from_sdk(aws_sdk_s3::Client::from_conf(s3_config), settings)
    }

    /// Wrap an already configured SDK client
    pub fn from_sdk(client: aws_sdk_s3::Client, settings: &StoreSettings) -> Result<Self> {
        Ok(Self {
            inner: client,
            locator: Locator::from_settings(settings)?,
            concurrency: multipart::DEFAULT_CONCURRENCY,
        })
    }

    /// Number of parts uploaded concurrently during multipart uploads
    pub fn with_multipart_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let mut request = self.inner.create_bucket().bucket(bucket);

        if !region.is_empty() && region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        request
            .send()
            .await
            .map_err(|e| store_error("create_bucket", e))?;

        Ok(())
    }

    async fn head_bucket(&self, bucket: &str) -> Result<Presence> {
        let result = self.inner.head_bucket().bucket(bucket).send().await;
        probe_result("head_bucket", result)
    }

    async fn head_object(&self, path: &ObjectPath) -> Result<Presence> {
        let result = self
            .inner
            .head_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await;
        probe_result("head_object", result)
    }

    async fn put_object(
        &self,
        path: &ObjectPath,
        content_type: &str,
        source: &Path,
        part_size: u64,
    ) -> Result<String> {
        if path.key.is_empty() {
            return Err(Error::InvalidArgument("object key cannot be empty".into()));
        }

        let size = tokio::fs::metadata(source).await?.len();
        let config = MultipartConfig::new()
            .part_size(part_size)
            .concurrency(self.concurrency);

        if config.needs_multipart(size) {
            let source = MultipartSource {
                path: source,
                size,
                content_type,
            };
            let location = multipart::upload(&self.inner, path, source, &config).await?;
            return match location {
                Some(location) => Ok(location),
                None => self.locator.object_url(path),
            };
        }

        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        self.inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| store_error("put_object", e))?;

        self.locator.object_url(path)
    }

    async fn get_object(&self, path: &ObjectPath) -> Result<DownloadedFile> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| {
                if let Some(GetObjectError::NoSuchKey(_)) = e.as_service_error() {
                    Error::FileNotFound(path.to_string())
                } else if is_not_found(&e) {
                    Error::BucketNotFound(path.bucket.clone())
                } else {
                    store_error("get_object", e)
                }
            })?;

        let content_type = response.content_type().map(str::to_string);
        let last_modified = response
            .last_modified()
            .and_then(|modified| jiff::Timestamp::from_second(modified.secs()).ok());

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Store(format!("get_object: {e}")))?
            .into_bytes()
            .to_vec();

        let mut file = DownloadedFile::new(path, data);
        file.content_type = content_type;
        file.last_modified = last_modified;
        Ok(file)
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()> {
        // S3 rejects a Delete with no objects
        if keys.is_empty() {
            return Ok(());
        }

        let objects = keys
            .iter()
            .map(|k| {
                ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| Error::Store(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| Error::Store(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| store_error("delete_objects", e))?;

        if !response.errors().is_empty() {
            let failed: Vec<String> = response
                .errors()
                .iter()
                .map(|e| {
                    format!(
                        "{} ({})",
                        e.key().unwrap_or_default(),
                        e.code().unwrap_or("unknown")
                    )
                })
                .collect();
            tracing::warn!(bucket, ?failed, "Failed to delete some objects");
            return Err(Error::Store(format!(
                "delete_objects: {} of {} object(s) not deleted: {}",
                failed.len(),
                keys.len(),
                failed.join(", ")
            )));
        }

        Ok(())
    }
}
