//! Multipart upload support
//!
//! Large staged files are sent as an S3 multipart upload: the file is read in
//! fixed-size slices, parts are uploaded with bounded concurrency, and the
//! upload is completed in part order.

use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_types::byte_stream::Length;
use futures::{StreamExt, TryStreamExt};

use objgate_core::{DEFAULT_PART_SIZE, Error, ObjectPath, Result};

use crate::error::store_error;

/// Minimum part size: 5 MiB (S3 requirement)
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts: 10,000 (S3 limit)
pub const MAX_PARTS: usize = 10_000;

/// Default number of parts in flight
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Multipart upload configuration
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Part size in bytes
    pub part_size: u64,

    /// Number of concurrent part uploads
    pub concurrency: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn part_size(mut self, size: u64) -> Self {
        self.part_size = size.clamp(MIN_PART_SIZE, MAX_PART_SIZE);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Whether a file of `file_size` bytes needs more than one part
    pub fn needs_multipart(&self, file_size: u64) -> bool {
        file_size > self.part_size
    }

    /// Calculate appropriate part size for a file
    pub fn calculate_part_size(&self, file_size: u64) -> u64 {
        let parts = file_size.div_ceil(self.part_size);

        if parts <= MAX_PARTS as u64 {
            self.part_size
        } else {
            // Need larger parts to fit within 10,000 limit
            let required_size = file_size.div_ceil(MAX_PARTS as u64);
            required_size.clamp(MIN_PART_SIZE, MAX_PART_SIZE)
        }
    }
}

/// Calculate number of parts for a file
pub fn calculate_parts(file_size: u64, part_size: u64) -> usize {
    file_size.div_ceil(part_size) as usize
}

/// Get byte range for a part
pub fn part_byte_range(part_number: i32, part_size: u64, total_size: u64) -> (u64, u64) {
    let start = (part_number as u64 - 1) * part_size;
    let end = (start + part_size).min(total_size);
    (start, end)
}

/// A staged file about to be sent in parts
pub(crate) struct MultipartSource<'a> {
    pub path: &'a Path,
    pub size: u64,
    pub content_type: &'a str,
}

/// Upload `source` to `target` in parts and return the location reported by
/// the store. An unfinished upload is aborted so no parts are left behind.
pub(crate) async fn upload(
    client: &aws_sdk_s3::Client,
    target: &ObjectPath,
    source: MultipartSource<'_>,
    config: &MultipartConfig,
) -> Result<Option<String>> {
    let part_size = config.calculate_part_size(source.size);

    let created = client
        .create_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .content_type(source.content_type)
        .send()
        .await
        .map_err(|e| store_error("create_multipart_upload", e))?;

    let upload_id = created
        .upload_id()
        .ok_or_else(|| Error::Store("create_multipart_upload: no upload ID returned".into()))?
        .to_string();

    let guard = AbortOnDrop::new(client, target, &upload_id);
    let result = send_and_complete(client, target, &upload_id, &source, part_size, config).await;

    if result.is_err() {
        abort(client, target, &upload_id).await;
    }
    guard.disarm();

    result
}

/// Aborts the multipart upload in the background if the upload future is
/// dropped before it finished, e.g. on cancellation or deadline.
struct AbortOnDrop {
    client: aws_sdk_s3::Client,
    target: ObjectPath,
    upload_id: String,
    armed: bool,
}

impl AbortOnDrop {
    fn new(client: &aws_sdk_s3::Client, target: &ObjectPath, upload_id: &str) -> Self {
        Self {
            client: client.clone(),
            target: target.clone(),
            upload_id: upload_id.to_string(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                object = %self.target,
                upload_id = %self.upload_id,
                "No runtime left to abort multipart upload"
            );
            return;
        };

        let client = self.client.clone();
        let target = self.target.clone();
        let upload_id = std::mem::take(&mut self.upload_id);
        runtime.spawn(async move { abort(&client, &target, &upload_id).await });
    }
}

async fn abort(client: &aws_sdk_s3::Client, target: &ObjectPath, upload_id: &str) {
    let aborted = client
        .abort_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(upload_id)
        .send()
        .await;

    match aborted {
        Ok(_) => tracing::debug!(object = %target, upload_id, "Aborted multipart upload"),
        Err(e) => tracing::warn!(
            object = %target,
            upload_id,
            error = %store_error("abort_multipart_upload", e),
            "Failed to abort multipart upload"
        ),
    }
}

async fn send_and_complete(
    client: &aws_sdk_s3::Client,
    target: &ObjectPath,
    upload_id: &str,
    source: &MultipartSource<'_>,
    part_size: u64,
    config: &MultipartConfig,
) -> Result<Option<String>> {
    let count = calculate_parts(source.size, part_size) as i32;

    let parts: Vec<CompletedPart> = futures::stream::iter(1..=count)
        .map(|part_number| upload_part(client, target, upload_id, source, part_number, part_size))
        .buffered(config.concurrency)
        .try_collect()
        .await?;

    let completed = client
        .complete_multipart_upload()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(upload_id)
        .multipart_upload(
            CompletedMultipartUpload::builder()
                .set_parts(Some(parts))
                .build(),
        )
        .send()
        .await
        .map_err(|e| store_error("complete_multipart_upload", e))?;

    tracing::debug!(object = %target, parts = count, part_size, "Completed multipart upload");

    Ok(completed.location().map(str::to_string))
}

async fn upload_part(
    client: &aws_sdk_s3::Client,
    target: &ObjectPath,
    upload_id: &str,
    source: &MultipartSource<'_>,
    part_number: i32,
    part_size: u64,
) -> Result<CompletedPart> {
    let (start, end) = part_byte_range(part_number, part_size, source.size);

    let body = ByteStream::read_from()
        .path(source.path)
        .offset(start)
        .length(Length::Exact(end - start))
        .build()
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

    let response = client
        .upload_part()
        .bucket(&target.bucket)
        .key(&target.key)
        .upload_id(upload_id)
        .part_number(part_number)
        .body(body)
        .send()
        .await
        .map_err(|e| store_error("upload_part", e))?;

    Ok(CompletedPart::builder()
        .part_number(part_number)
        .set_e_tag(response.e_tag().map(str::to_string))
        .build())
}
