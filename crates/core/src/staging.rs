//! Temporary file staging for uploads
//!
//! A base64 payload is decoded into a uniquely named temporary file so the
//! store can stream it in parts. The file is owned by [`StagedPayload`] and
//! removed when it is closed or dropped, whichever comes first.

use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Prefix of every staged file name
const STAGING_PREFIX: &str = "objgate-";

/// A decoded payload written to a temporary file
#[derive(Debug)]
pub struct StagedPayload {
    file: NamedTempFile,
    size: u64,
}

impl StagedPayload {
    /// Path of the staged file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Number of decoded bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remove the staged file now, reporting failure instead of ignoring it
    pub fn close(self) -> Result<()> {
        self.file.close()?;
        Ok(())
    }
}

/// Decode `payload` and write it to a fresh temporary file.
///
/// The file lives in `dir` when given, otherwise in the system temp directory.
/// Its name carries a random component followed by a sanitized copy of
/// `filename`, so concurrent uploads of the same key never collide.
pub fn stage_base64(payload: &str, filename: &str, dir: Option<&Path>) -> Result<StagedPayload> {
    let decoded = decode_payload(payload)?;

    let suffix = format!("-{}", sanitize_file_name(filename));
    let mut builder = tempfile::Builder::new();
    builder.prefix(STAGING_PREFIX).suffix(&suffix);

    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };

    file.write_all(&decoded)?;
    file.as_file().sync_all()?;

    tracing::debug!(
        path = %file.path().display(),
        size = decoded.len(),
        "Staged upload payload"
    );

    Ok(StagedPayload {
        file,
        size: decoded.len() as u64,
    })
}

/// Stage on the blocking thread pool so large payloads do not stall the runtime.
///
/// If the caller stops waiting, the staged file is removed once the blocking
/// task finishes.
pub async fn stage(payload: &str, filename: &str, dir: Option<&Path>) -> Result<StagedPayload> {
    let payload = payload.to_owned();
    let filename = filename.to_owned();
    let dir: Option<PathBuf> = dir.map(Path::to_path_buf);

    tokio::task::spawn_blocking(move || stage_base64(&payload, &filename, dir.as_deref()))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}

/// Decode standard base64, accepting payloads wrapped across lines.
fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let unwrapped: String = payload
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n'))
        .collect();

    let decoded = STANDARD.decode(unwrapped)?;
    if decoded.is_empty() {
        return Err(Error::InvalidArgument("payload decodes to zero bytes".into()));
    }
    Ok(decoded)
}

/// Keep only the final key component, replacing anything unsafe for a file name
fn sanitize_file_name(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .take(64)
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "payload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_stage_writes_decoded_bytes() {
        let dir = TempDir::new().unwrap();
        let staged = stage_base64("aGVsbG8=", "greeting.txt", Some(dir.path())).unwrap();

        assert_eq!(staged.size(), 5);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello");
        assert!(staged.path().starts_with(dir.path()));

        let name = staged.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(STAGING_PREFIX));
        assert!(name.ends_with("-greeting.txt"));
    }

    #[test]
    fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let staged = stage_base64("aGVsbG8=", "a.txt", Some(dir.path())).unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_close_removes_file() {
        let dir = TempDir::new().unwrap();
        let staged = stage_base64("aGVsbG8=", "a.txt", Some(dir.path())).unwrap();
        staged.close().unwrap();
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_same_filename_does_not_collide() {
        let dir = TempDir::new().unwrap();
        let first = stage_base64("Zmlyc3Q=", "same.txt", Some(dir.path())).unwrap();
        let second = stage_base64("c2Vjb25k", "same.txt", Some(dir.path())).unwrap();

        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::read(first.path()).unwrap(), b"first");
        assert_eq!(std::fs::read(second.path()).unwrap(), b"second");
    }

    #[test]
    fn test_invalid_base64() {
        let dir = TempDir::new().unwrap();
        let result = stage_base64("not base64!!", "a.txt", Some(dir.path()));
        assert!(matches!(result, Err(Error::InvalidPayload(_))));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn test_line_wrapped_payload() {
        let dir = TempDir::new().unwrap();
        let data: Vec<u8> = (0..100u8).collect();
        let encoded = STANDARD.encode(&data);
        let (first, rest) = encoded.split_at(76);

        let wrapped = format!("{first}\n{rest}\n");
        let staged = stage_base64(&wrapped, "a.bin", Some(dir.path())).unwrap();
        assert_eq!(std::fs::read(staged.path()).unwrap(), data);

        let crlf = format!("{first}\r\n{rest}\r\n");
        let staged = stage_base64(&crlf, "b.bin", Some(dir.path())).unwrap();
        assert_eq!(staged.size(), 100);
    }

    #[test]
    fn test_blank_payload_is_rejected() {
        let dir = TempDir::new().unwrap();

        let result = stage_base64("   \n", "a.txt", Some(dir.path()));
        assert!(matches!(result, Err(Error::InvalidPayload(_))));

        let result = stage_base64("\r\n", "a.txt", Some(dir.path()));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stage_runs_off_the_runtime() {
        let dir = TempDir::new().unwrap();
        let staged = stage("aGVsbG8=", "greeting.txt", Some(dir.path())).await.unwrap();
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello");

        drop(staged);
        assert_eq!(entries(dir.path()), 0);

        let result = stage("%%%", "greeting.txt", Some(dir.path())).await;
        assert!(matches!(result, Err(Error::InvalidPayload(_))));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let result = stage_base64("aGVsbG8=", "a.txt", Some(&missing));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("greeting.txt"), "greeting.txt");
        assert_eq!(sanitize_file_name("nested/dir/cat.png"), "cat.png");
        assert_eq!(sanitize_file_name("we ird:name"), "we_ird_name");
        assert_eq!(sanitize_file_name(""), "payload");
        assert_eq!(sanitize_file_name("dir/"), "payload");
    }
}
