//! Request and response shapes for the storage facade
//!
//! Field names serialize in camelCase so requests can be taken straight from
//! JSON bodies (`bucketName`, `base64Encoding`, ...).

use serde::{Deserialize, Serialize};

use crate::path::ObjectPath;

/// Upload a base64 encoded payload as a new object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub bucket_name: String,
    pub filename: String,
    /// MIME type stored as object metadata
    pub content_type: String,
    pub base64_encoding: String,
}

impl UploadRequest {
    pub fn new(
        bucket_name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        base64_encoding: impl Into<String>,
    ) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            filename: filename.into(),
            content_type: content_type.into(),
            base64_encoding: base64_encoding.into(),
        }
    }

    /// Destination of the upload
    pub fn target(&self) -> ObjectPath {
        ObjectPath::new(&self.bucket_name, &self.filename)
    }
}

/// Delete one or more objects from a bucket
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub bucket_name: String,
    /// Keys to delete, in the order they are probed
    #[serde(alias = "filename")]
    pub filenames: Vec<String>,
}

impl DeleteRequest {
    pub fn new<I, S>(bucket_name: impl Into<String>, filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bucket_name: bucket_name.into(),
            filenames: filenames.into_iter().map(Into::into).collect(),
        }
    }
}

/// Fetch an existing object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub bucket_name: String,
    pub filename: String,
}

impl DownloadRequest {
    pub fn new(bucket_name: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            filename: filename.into(),
        }
    }

    pub fn target(&self) -> ObjectPath {
        ObjectPath::new(&self.bucket_name, &self.filename)
    }
}

/// Object content returned by a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub bucket: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub last_modified: Option<jiff::Timestamp>,
}

impl DownloadedFile {
    pub fn new(path: &ObjectPath, data: Vec<u8>) -> Self {
        Self {
            bucket: path.bucket.clone(),
            filename: path.key.clone(),
            content_type: None,
            data,
            last_modified: None,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
