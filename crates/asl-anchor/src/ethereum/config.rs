use std::time::Duration;

use asl_cache::CacheConfig;
use serde::{Deserialize, Serialize};

use super::rpc::redact_endpoint;
use crate::error::{AnchorError, AnchorResult};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Settings for [`EthereumAnchorValidator`](super::EthereumAnchorValidator).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
    /// Dedicated JSON-RPC endpoint. Without one, the well-known network
    /// table supplies a public endpoint per chain.
    pub rpc_url: Option<String>,
    /// Per-request HTTP timeout.
    pub request_timeout_ms: u64,
    pub cache: CacheConfig,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache: CacheConfig::default(),
        }
    }
}

impl EthereumConfig {
    pub fn with_rpc_url(url: impl Into<String>) -> Self {
        Self {
            rpc_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> AnchorResult<()> {
        if self.request_timeout_ms == 0 {
            return Err(AnchorError::InvalidConfig(
                "request_timeout_ms must be greater than zero".into(),
            ));
        }
        if let Some(url) = &self.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AnchorError::InvalidConfig(format!(
                    "rpc_url must be an http(s) url, got {}",
                    redact_endpoint(url)
                )));
            }
        }
        self.cache.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EthereumConfig::default();
        config.validate().unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn rejects_bad_values() {
        let bad_url = EthereumConfig::with_rpc_url("ws://node:8546");
        assert!(matches!(bad_url.validate(), Err(AnchorError::InvalidConfig(_))));

        let zero_timeout = EthereumConfig {
            request_timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let zero_cache = EthereumConfig {
            cache: CacheConfig {
                blocks: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(zero_cache.validate(), Err(AnchorError::Cache(_))));
    }
}
