//! API client configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

pub const ENV_ENDPOINT: &str = "OVH_ENDPOINT";
pub const ENV_APPLICATION_KEY: &str = "OVH_APPLICATION_KEY";
pub const ENV_APPLICATION_SECRET: &str = "OVH_APPLICATION_SECRET";
pub const ENV_CONSUMER_KEY: &str = "OVH_CONSUMER_KEY";

/// Known API endpoints, by alias
const ENDPOINTS: &[(&str, &str)] = &[
    ("ovh-eu", "https://eu.api.ovh.com/1.0"),
    ("ovh-ca", "https://ca.api.ovh.com/1.0"),
    ("ovh-us", "https://api.us.ovhcloud.com/1.0"),
    ("kimsufi-eu", "https://eu.api.kimsufi.com/1.0"),
    ("kimsufi-ca", "https://ca.api.kimsufi.com/1.0"),
    ("soyoustart-eu", "https://eu.api.soyoustart.com/1.0"),
    ("soyoustart-ca", "https://ca.api.soyoustart.com/1.0"),
];

/// Credentials and endpoint used to reach the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoint alias (`ovh-eu`, ...) or a literal base URL
    pub endpoint: String,

    pub application_key: String,

    pub application_secret: String,

    pub consumer_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "ovh-eu".to_string(),
            application_key: String::new(),
            application_secret: String::new(),
            consumer_key: String::new(),
            timeout_secs: 180,
        }
    }
}

impl ClientConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| {
                Error::InvalidConfig(format!("{}: {}", path.display(), e))
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override fields with the `OVH_*` environment variables that are set
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Override fields from `lookup`, skipping unset and empty variables
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = non_empty(ENV_ENDPOINT) {
            self.endpoint = v;
        }
        if let Some(v) = non_empty(ENV_APPLICATION_KEY) {
            self.application_key = v;
        }
        if let Some(v) = non_empty(ENV_APPLICATION_SECRET) {
            self.application_secret = v;
        }
        if let Some(v) = non_empty(ENV_CONSUMER_KEY) {
            self.consumer_key = v;
        }
        self
    }

    /// Resolve the endpoint alias to a base URL
    pub fn base_url(&self) -> Result<String> {
        if let Some((_, url)) = ENDPOINTS.iter().find(|(alias, _)| *alias == self.endpoint) {
            return Ok(url.to_string());
        }
        if self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://") {
            return Ok(self.endpoint.trim_end_matches('/').to_string());
        }
        Err(Error::InvalidConfig(format!(
            "unknown endpoint '{}', expected one of {:?} or a URL",
            self.endpoint,
            ENDPOINTS.iter().map(|(alias, _)| *alias).collect::<Vec<_>>()
        )))
    }

    /// Check that every credential needed for signed calls is present
    pub fn validate(&self) -> Result<()> {
        self.base_url()?;
        let missing: Vec<&str> = [
            ("application_key", &self.application_key),
            ("application_secret", &self.application_secret),
            ("consumer_key", &self.consumer_key),
        ]
        .iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(k, _)| *k)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!("missing {}", missing.join(", "))))
        }
    }
}
