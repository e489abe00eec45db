//! Object locators
//!
//! A single PutObject response carries no location, so the URL of the new
//! object is derived from the endpoint and the addressing style in use.

use url::Url;

use objgate_core::{ObjectPath, Result, StoreSettings};

/// Builds object URLs for one store connection
#[derive(Debug, Clone)]
pub struct Locator {
    endpoint: Url,
    path_style: bool,
}

impl Locator {
    /// Derive the locator from connection settings
    pub fn from_settings(settings: &StoreSettings) -> Result<Self> {
        let endpoint = match &settings.endpoint {
            Some(endpoint) => Url::parse(endpoint)?,
            None => Url::parse(&format!("https://s3.{}.amazonaws.com", settings.region))?,
        };

        Ok(Self {
            endpoint,
            path_style: settings.use_path_style(),
        })
    }

    /// URL addressing `path`
    pub fn object_url(&self, path: &ObjectPath) -> Result<String> {
        let mut url = self.endpoint.clone();

        if !self.path_style {
            if let Some(host) = url.host_str() {
                let host = format!("{}.{host}", path.bucket);
                url.set_host(Some(&host))?;
            }
        }

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            if self.path_style {
                segments.push(&path.bucket);
            }
            segments.extend(path.key.split('/'));
        }

        Ok(url.to_string())
    }
}
