//! IPLB Common Library
//!
//! Shared error type, client configuration, API payloads and the REST
//! client used by the provider and the CLI.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use client::{ApiClient, OvhClient};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use types::*;

/// IPLB version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration directory
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".iplb")
}

/// Default configuration file path
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
