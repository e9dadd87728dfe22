use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

const DEFAULT_PROVIDER_CAPACITY: usize = 10;
const DEFAULT_TRANSACTION_CAPACITY: usize = 50;
const DEFAULT_BLOCK_CAPACITY: usize = 50;

/// Capacities of the three provider caches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Live RPC connections, keyed by chain id.
    pub providers: usize,
    /// Fetched transactions, keyed by transaction hash.
    pub transactions: usize,
    /// Fetched blocks, keyed by block hash.
    pub blocks: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            providers: DEFAULT_PROVIDER_CAPACITY,
            transactions: DEFAULT_TRANSACTION_CAPACITY,
            blocks: DEFAULT_BLOCK_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> CacheResult<()> {
        for (name, capacity) in [
            ("providers", self.providers),
            ("transactions", self.transactions),
            ("blocks", self.blocks),
        ] {
            if capacity == 0 {
                return Err(CacheError::ZeroCapacity { name });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CacheConfig::default();
        assert_eq!(config.providers, 10);
        assert_eq!(config.transactions, 50);
        assert_eq!(config.blocks, 50);
        config.validate().unwrap();
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = CacheConfig {
            blocks: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            CacheError::ZeroCapacity { name: "blocks" }
        );
    }
}
