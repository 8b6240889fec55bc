//! Remote API client configuration

use serde::{Deserialize, Serialize};

/// Where and how to reach the Atlas admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Name of the environment variable holding the bearer token.
    pub api_token_env: String,
    /// Per-request timeout.
    pub timeout_seconds: u64,
    /// Page size for paginated listings.
    pub items_per_page: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://cloud.mongodb.com".to_string(),
            api_token_env: "ATLAS_API_TOKEN".to_string(),
            timeout_seconds: 30,
            items_per_page: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_config_defaults() {
        let config = RemoteConfig::default();
        assert_eq!(config.base_url, "https://cloud.mongodb.com");
        assert_eq!(config.timeout_seconds, 30);
        assert_eq!(config.items_per_page, 100);
    }

    #[test]
    fn test_remote_config_partial_toml() {
        let config: RemoteConfig = toml::from_str("timeout_seconds = 5").unwrap();
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.api_token_env, "ATLAS_API_TOKEN");
    }
}
