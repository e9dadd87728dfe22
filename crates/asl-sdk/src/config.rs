use std::path::Path;
use std::time::Duration;

use asl_anchor::EthereumConfig;
use asl_query::QueryConfig;
use asl_types::ChainId;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

const DEFAULT_VALIDATION_TIMEOUT_MS: u64 = 30_000;

/// Anchor validation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    /// CAIP-2 chain the Ethereum validator is pinned to, e.g. `eip155:1`.
    pub chain_id: Option<String>,
    /// Upper bound on validating one anchor proof.
    pub validation_timeout_ms: u64,
    /// Register a simulated in-process chain and anchor on it.
    pub simulated: bool,
    pub ethereum: EthereumConfig,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            chain_id: None,
            validation_timeout_ms: DEFAULT_VALIDATION_TIMEOUT_MS,
            simulated: false,
            ethereum: EthereumConfig::default(),
        }
    }
}

/// Complete node configuration, usually read from a TOML file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub anchor: AnchorConfig,
    pub query: QueryConfig,
}

impl NodeConfig {
    pub fn from_toml_str(input: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| SdkError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.anchor.validation_timeout_ms == 0 {
            return Err(SdkError::InvalidConfig(
                "anchor.validation_timeout_ms must be greater than zero".into(),
            ));
        }
        self.chain_id()?;
        self.anchor.ethereum.validate()?;
        self.query.validate()?;
        Ok(())
    }

    /// The configured chain id, parsed.
    pub fn chain_id(&self) -> SdkResult<Option<ChainId>> {
        self.anchor
            .chain_id
            .as_deref()
            .map(|s| {
                s.parse()
                    .map_err(|e| SdkError::InvalidConfig(format!("anchor.chain_id: {e}")))
            })
            .transpose()
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.anchor.validation_timeout_ms)
    }
}
