//! Storage facade
//!
//! [`StorageService`] is the public entry point. Each operation validates its
//! request, probes the store where the outcome depends on existing state, and
//! then delegates the transfer to the injected [`ObjectStore`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::context::OpContext;
use crate::error::{Error, Result};
use crate::path::ObjectPath;
use crate::request::{DeleteRequest, DownloadRequest, DownloadedFile, UploadRequest};
use crate::staging::{self, StagedPayload};
use crate::traits::{ObjectStore, Presence};
use crate::validation;

/// Default multipart part size: 10 MiB
pub const DEFAULT_PART_SIZE: u64 = 10 * 1024 * 1024;

/// Immutable settings shared by every facade call
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    region: String,
    part_size: u64,
    staging_dir: Option<PathBuf>,
}

impl ServiceSettings {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            part_size: DEFAULT_PART_SIZE,
            staging_dir: None,
        }
    }

    pub fn part_size(mut self, bytes: u64) -> Self {
        self.part_size = bytes;
        self
    }

    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Region new buckets are created in
    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn part_size_bytes(&self) -> u64 {
        self.part_size
    }

    pub fn staging_dir_path(&self) -> Option<&Path> {
        self.staging_dir.as_deref()
    }
}

/// Bucket and file operations over an object store
#[derive(Clone)]
pub struct StorageService {
    store: Arc<dyn ObjectStore>,
    settings: ServiceSettings,
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageService")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl StorageService {
    pub fn new(store: Arc<dyn ObjectStore>, settings: ServiceSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Create a bucket in the configured region.
    ///
    /// Creating a bucket that already exists is reported by the store as an
    /// error and returned unchanged.
    pub async fn create_bucket(&self, ctx: &OpContext, bucket: &str) -> Result<()> {
        validation::validate_bucket_name(bucket)?;

        ctx.run(
            "create_bucket",
            || self.store.create_bucket(bucket, &self.settings.region),
        )
        .await
        .inspect_err(|e| tracing::error!(bucket, error = %e, "Failed to create bucket"))?;

        tracing::info!(bucket, region = %self.settings.region, "Created bucket");
        Ok(())
    }

    /// Upload a base64 payload and return the locator of the new object.
    ///
    /// The destination bucket is created when it does not exist yet. Uploading
    /// over an existing object is rejected with [`Error::AlreadyExists`].
    pub async fn upload_file(&self, ctx: &OpContext, request: &UploadRequest) -> Result<String> {
        validation::validate_upload(request)?;

        let target = request.target();
        if self.object_exists(ctx, &target).await?.exists() {
            return Err(Error::AlreadyExists(format!(
                "file {} already exists on bucket {}",
                target.key, target.bucket
            )));
        }

        let staged = staging::stage(
            &request.base64_encoding,
            &request.filename,
            self.settings.staging_dir_path(),
        )
        .await?;

        let result = self
            .transfer(ctx, &target, &request.content_type, &staged)
            .await;

        let staged_path = staged.path().to_path_buf();
        if let Err(e) = staged.close() {
            tracing::warn!(
                path = %staged_path.display(),
                error = %e,
                "Failed to remove staged payload"
            );
        }

        result
    }

    async fn transfer(
        &self,
        ctx: &OpContext,
        target: &ObjectPath,
        content_type: &str,
        staged: &StagedPayload,
    ) -> Result<String> {
        if !self.bucket_exists(ctx, &target.bucket).await?.exists() {
            self.create_bucket(ctx, &target.bucket).await?;
        }

        let started = Instant::now();
        let locator = ctx
            .run(
                "put_object",
                || self.store.put_object(
                    target,
                    content_type,
                    staged.path(),
                    self.settings.part_size,
                ),
            )
            .await
            .inspect_err(|e| tracing::error!(object = %target, error = %e, "Upload failed"))?;

        tracing::info!(
            object = %target,
            size = %humansize::format_size(staged.size(), humansize::BINARY),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Uploaded file"
        );

        Ok(locator)
    }

    /// Delete the requested files that exist.
    ///
    /// Filenames that are not present in the bucket are skipped without error.
    /// When none of them exist no delete request is sent.
    pub async fn delete_file(&self, ctx: &OpContext, request: &DeleteRequest) -> Result<()> {
        validation::validate_delete(request)?;

        let mut keys = Vec::with_capacity(request.filenames.len());
        for filename in &request.filenames {
            let path = ObjectPath::new(&request.bucket_name, filename);
            if self.object_exists(ctx, &path).await?.exists() {
                keys.push(filename.clone());
            }
        }

        if keys.is_empty() {
            tracing::debug!(
                bucket = %request.bucket_name,
                requested = request.filenames.len(),
                "No requested files exist, skipping delete"
            );
            return Ok(());
        }

        ctx.run(
            "delete_objects",
            || self.store.delete_objects(&request.bucket_name, &keys),
        )
        .await
        .inspect_err(|e| {
            tracing::error!(bucket = %request.bucket_name, ?keys, error = %e, "Failed to delete files")
        })?;

        tracing::info!(
            bucket = %request.bucket_name,
            deleted = keys.len(),
            skipped = request.filenames.len() - keys.len(),
            "Deleted files"
        );
        Ok(())
    }

    /// Fetch an existing file.
    ///
    /// Fails with [`Error::BucketNotFound`] or [`Error::FileNotFound`] when the
    /// bucket or the object is absent.
    pub async fn download_file(
        &self,
        ctx: &OpContext,
        request: &DownloadRequest,
    ) -> Result<DownloadedFile> {
        validation::validate_download(request)?;

        if !self.bucket_exists(ctx, &request.bucket_name).await?.exists() {
            return Err(Error::BucketNotFound(request.bucket_name.clone()));
        }

        let target = request.target();
        if !self.object_exists(ctx, &target).await?.exists() {
            return Err(Error::FileNotFound(target.to_string()));
        }

        ctx.run("get_object", || self.store.get_object(&target)).await
    }

    async fn bucket_exists(&self, ctx: &OpContext, bucket: &str) -> Result<Presence> {
        let presence = ctx
            .run("head_bucket", || self.store.head_bucket(bucket))
            .await
            .inspect_err(|e| {
                tracing::warn!(bucket, error = %e, "Cannot access bucket or another error occurred")
            })?;
        tracing::debug!(bucket, ?presence, "Probed bucket");
        Ok(presence)
    }

    async fn object_exists(&self, ctx: &OpContext, path: &ObjectPath) -> Result<Presence> {
        let presence = ctx
            .run("head_object", || self.store.head_object(path))
            .await
            .inspect_err(|e| {
                tracing::warn!(path = %path, error = %e, "Cannot access file or another error occurred")
            })?;
        tracing::debug!(path = %path, ?presence, "Probed file");
        Ok(presence)
    }
}
