//! objgate-core: Core library for the objgate storage facade
//!
//! This crate provides:
//! - Request validation and content-type checks
//! - Staging of base64 payloads into temporary files
//! - The ObjectStore trait the facade talks to
//! - The StorageService facade (create bucket, upload, delete, download)
//! - Configuration management
//!
//! This crate is independent of any specific S3 SDK, so the facade can be
//! tested against mocks and in-memory stores.

pub mod config;
pub mod context;
pub mod error;
pub mod path;
pub mod request;
pub mod service;
pub mod staging;
pub mod traits;
pub mod validation;

pub use config::{Config, ConfigManager, StoreSettings, TimeoutConfig, UploadSettings};
pub use context::OpContext;
pub use error::{Error, Result};
pub use path::ObjectPath;
pub use request::{DeleteRequest, DownloadRequest, DownloadedFile, UploadRequest};
pub use service::{DEFAULT_PART_SIZE, ServiceSettings, StorageService};
pub use staging::{StagedPayload, stage, stage_base64};
pub use traits::{ObjectStore, Presence};
