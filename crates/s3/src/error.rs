//! SDK error classification
//!
//! Separates "the resource is not there" from every other SDK failure. Only
//! the former may be turned into a negative probe result.

use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use objgate_core::{Error, Presence, Result};

/// Error codes S3-compatible services use for missing buckets and keys
const NOT_FOUND_CODES: [&str; 3] = ["NotFound", "NoSuchBucket", "NoSuchKey"];

/// Whether the store answered that the addressed resource does not exist
pub(crate) fn is_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool
where
    E: ProvideErrorMetadata,
{
    if let SdkError::ServiceError(service_err) = err {
        // HEAD responses carry no body, so the status is often all there is
        if service_err.raw().status().as_u16() == 404 {
            return true;
        }
        return service_err
            .err()
            .code()
            .is_some_and(|code| NOT_FOUND_CODES.contains(&code));
    }
    false
}

/// Wrap an SDK failure, keeping the full source chain in the message
pub(crate) fn store_error<E>(operation: &str, err: SdkError<E, HttpResponse>) -> Error
where
    E: std::error::Error + 'static,
{
    Error::Store(format!("{operation}: {}", DisplayErrorContext(&err)))
}

/// Turn the result of a HEAD request into a probe outcome
pub(crate) fn probe_result<T, E>(
    operation: &str,
    result: std::result::Result<T, SdkError<E, HttpResponse>>,
) -> Result<Presence>
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match result {
        Ok(_) => Ok(Presence::Exists),
        Err(e) if is_not_found(&e) => Ok(Presence::Absent),
        Err(e) => Err(store_error(operation, e)),
    }
}
