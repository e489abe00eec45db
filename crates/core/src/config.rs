//! Configuration management
//!
//! This module handles loading and saving the objgate configuration file.
//! The configuration file is stored in TOML format at ~/.config/objgate/config.toml.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::service::{DEFAULT_PART_SIZE, ServiceSettings};

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Connection to the object store
    #[serde(default)]
    pub store: StoreSettings,

    /// Upload behaviour
    #[serde(default)]
    pub upload: UploadSettings,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            store: StoreSettings::default(),
            upload: UploadSettings::default(),
        }
    }
}

/// Timeout configuration passed to the SDK transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_ms: u64,

    /// Read timeout in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_ms: u64,
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_read_timeout() -> u64 {
    30000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: default_connect_timeout(),
            read_ms: default_read_timeout(),
        }
    }
}

/// Object store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Region buckets are created in
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services; AWS when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Access key ID; the SDK default credential chain is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Secret access key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Bucket lookup style: "auto", "path", or "dns"
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,

    /// Timeout configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<TimeoutConfig>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            bucket_lookup: default_bucket_lookup(),
            timeout: None,
        }
    }
}

impl StoreSettings {
    /// Settings for an S3-compatible endpoint with static credentials
    pub fn with_endpoint(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            access_key: Some(access_key.into()),
            secret_key: Some(secret_key.into()),
            ..Default::default()
        }
    }

    /// Whether requests should use path-style addressing
    pub fn use_path_style(&self) -> bool {
        match self.bucket_lookup.as_str() {
            "path" => true,
            "dns" => false,
            // Custom endpoints rarely support virtual-hosted buckets
            _ => self.endpoint.is_some(),
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(Error::Config("region cannot be empty".into()));
        }

        if let Some(endpoint) = &self.endpoint {
            let url = url::Url::parse(endpoint)?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(Error::Config(format!(
                    "endpoint must use http or https, got '{}'",
                    url.scheme()
                )));
            }
        }

        match (&self.access_key, &self.secret_key) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::Config(
                    "access_key and secret_key must be set together".into(),
                ));
            }
            _ => {}
        }

        if !matches!(self.bucket_lookup.as_str(), "auto" | "path" | "dns") {
            return Err(Error::Config(format!(
                "bucket_lookup must be auto, path or dns, got '{}'",
                self.bucket_lookup
            )));
        }

        Ok(())
    }
}

/// Upload settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Multipart part size in bytes
    #[serde(default = "default_part_size")]
    pub part_size: u64,

    /// Directory for staged payloads; the system temp directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

fn default_part_size() -> u64 {
    DEFAULT_PART_SIZE
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            part_size: default_part_size(),
            staging_dir: None,
        }
    }
}

impl Config {
    /// Facade settings derived from this configuration
    pub fn service_settings(&self) -> ServiceSettings {
        let mut settings = ServiceSettings::new(&self.store.region).part_size(self.upload.part_size);
        if let Some(dir) = &self.upload.staging_dir {
            settings = settings.staging_dir(dir);
        }
        settings
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the default config path
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        let config_path = config_dir.join("objgate").join("config.toml");
        Ok(Self { config_path })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// If the configuration file doesn't exist, returns a default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade objgate.",
                config.schema_version, SCHEMA_VERSION
            )));
        }
        config.schema_version = SCHEMA_VERSION;

        config.store.validate()?;
        Ok(config)
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories if they don't exist.
    /// Sets file permissions to 600 (owner read/write only), since the file may
    /// hold credentials.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.region, "us-east-1");
        assert_eq!(config.store.bucket_lookup, "auto");
        assert!(config.store.endpoint.is_none());
        assert_eq!(config.upload.part_size, 10 * 1024 * 1024);
        assert!(config.upload.staging_dir.is_none());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.store = StoreSettings::with_endpoint("http://localhost:9000", "access", "secret");
        config.store.region = "eu-west-1".to_string();
        config.store.timeout = Some(TimeoutConfig::default());
        config.upload.staging_dir = Some(temp_dir.path().join("staging"));

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.store.region, "eu-west-1");
        assert_eq!(loaded.store.endpoint.as_deref(), Some("http://localhost:9000"));
        assert_eq!(loaded.store.access_key.as_deref(), Some("access"));
        assert_eq!(loaded.store.timeout, Some(TimeoutConfig::default()));
        assert_eq!(loaded.upload.staging_dir, config.upload.staging_dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (manager, _temp_dir) = temp_config_manager();
        manager.save(&Config::default()).unwrap();
        let mode = std::fs::metadata(manager.config_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::write(
            manager.config_path(),
            r#"
            [store]
            region = "ap-southeast-1"
            "#,
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.store.region, "ap-southeast-1");
        assert_eq!(config.upload.part_size, DEFAULT_PART_SIZE);
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();

        let content = format!(
            r#"
            schema_version = {}
            "#,
            SCHEMA_VERSION + 1
        );
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported")
        );
    }

    #[test]
    fn test_store_validation() {
        assert!(StoreSettings::default().validate().is_ok());

        let mut settings = StoreSettings::with_endpoint("not a url", "a", "b");
        assert!(matches!(settings.validate(), Err(Error::InvalidUrl(_))));

        settings.endpoint = Some("ftp://example.com".into());
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        let mut settings = StoreSettings::with_endpoint("http://localhost:9000", "a", "b");
        settings.secret_key = None;
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        let mut settings = StoreSettings::default();
        settings.bucket_lookup = "sideways".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_path_style() {
        let mut settings = StoreSettings::default();
        assert!(!settings.use_path_style());

        settings.endpoint = Some("http://localhost:9000".into());
        assert!(settings.use_path_style());

        settings.bucket_lookup = "dns".into();
        assert!(!settings.use_path_style());

        settings.bucket_lookup = "path".into();
        settings.endpoint = None;
        assert!(settings.use_path_style());
    }

    #[test]
    fn test_service_settings() {
        let mut config = Config::default();
        config.store.region = "eu-central-1".into();
        config.upload.part_size = 16 * 1024 * 1024;
        config.upload.staging_dir = Some(PathBuf::from("/var/tmp/objgate"));

        let settings = config.service_settings();
        assert_eq!(settings.region(), "eu-central-1");
        assert_eq!(settings.part_size_bytes(), 16 * 1024 * 1024);
        assert_eq!(
            settings.staging_dir_path(),
            Some(std::path::Path::new("/var/tmp/objgate"))
        );
    }
}
