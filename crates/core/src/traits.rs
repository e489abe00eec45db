//! ObjectStore trait definition
//!
//! This trait defines the calls the storage facade makes against an
//! S3-compatible store. It keeps the facade independent of the SDK and can be
//! mocked for testing.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::path::ObjectPath;
use crate::request::DownloadedFile;

/// Outcome of an existence probe.
///
/// A confirmed absence is a normal result. Failures that leave the answer
/// unknown (permissions, transport) are reported as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Exists,
    Absent,
}

impl Presence {
    pub fn exists(self) -> bool {
        matches!(self, Presence::Exists)
    }
}

impl From<bool> for Presence {
    fn from(exists: bool) -> Self {
        if exists {
            Presence::Exists
        } else {
            Presence::Absent
        }
    }
}

/// Trait for S3-compatible storage operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create a bucket in `region`
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    /// Check if a bucket exists
    async fn head_bucket(&self, bucket: &str) -> Result<Presence>;

    /// Check if an object exists
    async fn head_object(&self, path: &ObjectPath) -> Result<Presence>;

    /// Upload the file at `source` and return the locator assigned by the store.
    ///
    /// Files larger than `part_size` bytes are sent as a multipart upload.
    async fn put_object(
        &self,
        path: &ObjectPath,
        content_type: &str,
        source: &Path,
        part_size: u64,
    ) -> Result<String>;

    /// Fetch object content and metadata
    async fn get_object(&self, path: &ObjectPath) -> Result<DownloadedFile>;

    /// Delete `keys` from `bucket` in a single batch request
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_from_bool() {
        assert_eq!(Presence::from(true), Presence::Exists);
        assert_eq!(Presence::from(false), Presence::Absent);
        assert!(Presence::Exists.exists());
        assert!(!Presence::Absent.exists());
    }
}
