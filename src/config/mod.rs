//! Configuration for the reconciliation engine.
//!
//! # Configuration Precedence
//!
//! 1. Environment variables (`CONVERGE_*`)
//! 2. Configuration file (TOML)
//! 3. Default values
//!
//! # Example
//!
//! ```rust
//! use converge::config::ConvergeConfig;
//!
//! let toml = r#"
//! [reconcile]
//! lookup_concurrency = 8
//! "#;
//! let config: ConvergeConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.reconcile.lookup_concurrency, 8);
//! assert!(config.reconcile.subresource_deletion_protection);
//! ```

pub mod error;
pub mod logging;
pub mod reconcile;
pub mod remote;

pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use reconcile::ReconcileConfig;
pub use remote::RemoteConfig;

use crate::remote::AtlasClient;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Unified configuration: remote client, reconciliation and logging.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConvergeConfig {
    pub remote: RemoteConfig,
    pub reconcile: ReconcileConfig,
    pub logging: LoggingConfig,
}

impl ConvergeConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("CONVERGE_BASE_URL") {
            self.remote.base_url = url;
        }
        if let Ok(timeout) = std::env::var("CONVERGE_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                self.remote.timeout_seconds = t;
            }
        }

        if let Ok(protection) = std::env::var("CONVERGE_DELETION_PROTECTION") {
            if let Ok(p) = protection.to_lowercase().parse() {
                self.reconcile.subresource_deletion_protection = p;
            }
        }
        if let Ok(concurrency) = std::env::var("CONVERGE_LOOKUP_CONCURRENCY") {
            if let Ok(c) = concurrency.parse() {
                self.reconcile.lookup_concurrency = c;
            }
        }

        if let Ok(level) = std::env::var("CONVERGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("CONVERGE_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.base_url.is_empty() {
            return Err(ConfigError::Validation {
                field: "remote.base_url".to_string(),
                message: "URL cannot be empty".to_string(),
            });
        }
        if reqwest::Url::parse(&self.remote.base_url).is_err() {
            return Err(ConfigError::Validation {
                field: "remote.base_url".to_string(),
                message: format!("'{}' is not a valid URL", self.remote.base_url),
            });
        }
        if self.remote.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                field: "remote.timeout_seconds".to_string(),
                message: "timeout must be non-zero".to_string(),
            });
        }
        if self.remote.items_per_page == 0 {
            return Err(ConfigError::Validation {
                field: "remote.items_per_page".to_string(),
                message: "page size must be non-zero".to_string(),
            });
        }
        if self.reconcile.lookup_concurrency == 0 {
            return Err(ConfigError::Validation {
                field: "reconcile.lookup_concurrency".to_string(),
                message: "concurrency must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Build the HTTP client, reading the token from `remote.api_token_env`.
    pub fn build_client(&self) -> Result<AtlasClient, ConfigError> {
        let token = std::env::var(&self.remote.api_token_env)
            .map_err(|_| ConfigError::MissingEnv(self.remote.api_token_env.clone()))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        AtlasClient::new(
            &self.remote.base_url,
            token,
            Duration::from_secs(self.remote.timeout_seconds),
            self.remote.items_per_page,
            Arc::new(http),
        )
        .map_err(|e| ConfigError::Client(e.to_string()))
    }
}
