//! Configuration management for the PDF view loader

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub http: HttpConfig,
    pub presentation: Presentation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding transient download files
    pub cache_dir: PathBuf,
    /// Root of the bundled-asset namespace for relative `file` sources
    pub asset_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Fixed renderer defaults applied on every handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Presentation {
    pub initial_page: u32,
    pub swipe_horizontal: bool,
    pub spacing: u32,
}

impl Default for Presentation {
    fn default() -> Self {
        Presentation {
            initial_page: 0,
            swipe_horizontal: false,
            spacing: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                cache_dir: env::temp_dir(),
                asset_dir: PathBuf::from("assets"),
            },
            http: HttpConfig {
                timeout_secs: 60,
                user_agent: default_user_agent(),
            },
            presentation: Presentation::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let timeout_secs = match env::var("PDFVIEW_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                name: "PDFVIEW_HTTP_TIMEOUT_SECS",
                value: raw,
            })?,
            Err(_) => defaults.http.timeout_secs,
        };

        Ok(Config {
            storage: StorageConfig {
                cache_dir: env::var("PDFVIEW_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.cache_dir),
                asset_dir: env::var("PDFVIEW_ASSET_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.asset_dir),
            },
            http: HttpConfig {
                timeout_secs,
                user_agent: env::var("PDFVIEW_USER_AGENT")
                    .unwrap_or(defaults.http.user_agent),
            },
            presentation: defaults.presentation,
        })
    }
}

fn default_user_agent() -> String {
    format!("pdfview-loader/{}", env!("CARGO_PKG_VERSION"))
}
