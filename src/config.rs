//! Sync Configuration
//!
//! Where the server lives and how long query results stay fresh.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::DEFAULT_TTL_MS;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("baseUrl must not be empty")]
    EmptyBaseUrl,

    #[error("cacheTtlMs must be greater than zero")]
    ZeroTtl,
}

/// Sync configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// API root, e.g. `https://tracker.example.com/api`
    pub base_url: String,
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_ttl_ms")]
    pub cache_ttl_ms: u64,
    /// Ignored in the browser, which owns request timeouts
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_ttl_ms() -> u64 {
    DEFAULT_TTL_MS as u64
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

impl SyncConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            cache_ttl_ms: default_ttl_ms(),
            request_timeout_ms: default_timeout_ms(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SyncConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if self.cache_ttl_ms == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> TimeDelta {
        i64::try_from(self.cache_ttl_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL without a trailing slash
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let config = SyncConfig::from_json(r#"{ "baseUrl": "http://localhost:8080/api/" }"#).unwrap();
        assert_eq!(config.cache_ttl_ms, 300_000);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.token, None);
        assert_eq!(config.api_root(), "http://localhost:8080/api");
        assert_eq!(config.cache_ttl(), TimeDelta::minutes(5));
    }

    #[test]
    fn test_full_config() {
        let config = SyncConfig::from_json(
            r#"{ "baseUrl": "https://x.test", "token": "abc", "cacheTtlMs": 1000, "requestTimeoutMs": 50 }"#,
        )
        .unwrap();
        assert_eq!(config, SyncConfig {
            base_url: "https://x.test".to_string(),
            token: Some("abc".to_string()),
            cache_ttl_ms: 1000,
            request_timeout_ms: 50,
        });
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SyncConfig::from_json(r#"{ "baseUrl": "  " }"#),
            Err(ConfigError::EmptyBaseUrl)
        ));
        assert!(matches!(
            SyncConfig::from_json(r#"{ "baseUrl": "http://x", "cacheTtlMs": 0 }"#),
            Err(ConfigError::ZeroTtl)
        ));
        assert!(matches!(SyncConfig::from_json("{"), Err(ConfigError::Parse(_))));
        assert!(matches!(SyncConfig::from_json("{}"), Err(ConfigError::Parse(_))));
    }
}
