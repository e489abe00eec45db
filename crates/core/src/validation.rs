//! Request validation
//!
//! Pure checks run before any call reaches the object store. Existence based
//! checks (duplicate uploads, missing downloads) need a store and live in the
//! service.

use mime_guess::mime::Mime;

use crate::error::{Error, Result};
use crate::request::{DeleteRequest, DownloadRequest, UploadRequest};

/// Reject an empty bucket name
pub fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.is_empty() {
        return Err(Error::InvalidArgument("bucket name is required".into()));
    }
    Ok(())
}

/// Check the fields of an upload request
pub fn validate_upload(request: &UploadRequest) -> Result<()> {
    if request.filename.is_empty() {
        return Err(Error::InvalidArgument("filename is required".into()));
    }

    if request.base64_encoding.is_empty() {
        return Err(Error::InvalidArgument("base64Encoding is required".into()));
    }

    validate_bucket_name(&request.bucket_name)?;
    validate_content_type(&request.content_type)?;

    Ok(())
}

/// Check the fields of a delete request
pub fn validate_delete(request: &DeleteRequest) -> Result<()> {
    if request.filenames.is_empty() {
        return Err(Error::InvalidArgument("filename is required".into()));
    }

    validate_bucket_name(&request.bucket_name)
}

/// Check the fields of a download request
pub fn validate_download(request: &DownloadRequest) -> Result<()> {
    validate_bucket_name(&request.bucket_name)?;

    if request.filename.is_empty() {
        return Err(Error::InvalidArgument("filename is required".into()));
    }

    Ok(())
}

/// Resolve a content type against the MIME registry.
///
/// Parameters such as `charset` are ignored; the `type/subtype` essence must
/// have at least one registered file extension.
pub fn validate_content_type(content_type: &str) -> Result<()> {
    let mime: Mime = content_type
        .trim()
        .parse()
        .map_err(|_| Error::UnknownContentType(content_type.to_string()))?;

    match mime_guess::get_mime_extensions_str(mime.essence_str()) {
        Some(extensions) if !extensions.is_empty() => Ok(()),
        _ => Err(Error::UnknownContentType(content_type.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> UploadRequest {
        UploadRequest::new("docs", "greeting.txt", "text/plain", "aGVsbG8=")
    }

    #[test]
    fn test_valid_upload() {
        assert!(validate_upload(&upload()).is_ok());
    }

    #[test]
    fn test_upload_missing_fields() {
        let mut req = upload();
        req.filename.clear();
        assert!(matches!(validate_upload(&req), Err(Error::InvalidArgument(_))));

        let mut req = upload();
        req.base64_encoding.clear();
        assert!(matches!(validate_upload(&req), Err(Error::InvalidArgument(_))));

        let mut req = upload();
        req.bucket_name.clear();
        assert!(matches!(validate_upload(&req), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_upload_missing_field_wins_over_content_type() {
        let mut req = upload();
        req.filename.clear();
        req.content_type = "not a type".into();
        assert!(matches!(validate_upload(&req), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_content_types() {
        assert!(validate_content_type("text/plain").is_ok());
        assert!(validate_content_type("image/png").is_ok());
        assert!(validate_content_type("application/pdf").is_ok());
        assert!(validate_content_type("text/plain; charset=utf-8").is_ok());

        assert!(matches!(
            validate_content_type("application/x-bogus-unregistered"),
            Err(Error::UnknownContentType(_))
        ));
        assert!(matches!(
            validate_content_type(""),
            Err(Error::UnknownContentType(_))
        ));
        assert!(matches!(
            validate_content_type("plain"),
            Err(Error::UnknownContentType(_))
        ));
    }

    #[test]
    fn test_delete_validation() {
        assert!(validate_delete(&DeleteRequest::new("docs", ["a.txt"])).is_ok());

        let empty: [&str; 0] = [];
        assert!(matches!(
            validate_delete(&DeleteRequest::new("docs", empty)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            validate_delete(&DeleteRequest::new("", ["a.txt"])),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_download_validation() {
        assert!(validate_download(&DownloadRequest::new("docs", "a.txt")).is_ok());
        assert!(validate_download(&DownloadRequest::new("", "a.txt")).is_err());
        assert!(validate_download(&DownloadRequest::new("docs", "")).is_err());
    }

    #[test]
    fn test_bucket_name() {
        assert!(validate_bucket_name("valid-name").is_ok());
        assert!(matches!(
            validate_bucket_name(""),
            Err(Error::InvalidArgument(_))
        ));
    }
}
