use asl_types::ChainId;

use crate::bounded::{BoundedCache, CacheStats};
use crate::config::CacheConfig;
use crate::error::CacheResult;

/// Key for a chain record: the chain it was read from and its
/// `0x`-prefixed lowercase hash.
pub type RecordKey = (ChainId, String);

/// The caches one anchor validator owns.
///
/// Generic over the connection (`P`), transaction (`T`) and block (`B`)
/// record types so each chain family keeps its own representations. The
/// three caches evict independently. Each validator instance owns its own
/// `ProviderCache`; nothing here is process-global.
pub struct ProviderCache<P, T, B> {
    providers: BoundedCache<ChainId, P>,
    transactions: BoundedCache<RecordKey, T>,
    blocks: BoundedCache<RecordKey, B>,
}

impl<P: Clone, T: Clone, B: Clone> ProviderCache<P, T, B> {
    pub fn new(config: &CacheConfig) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            providers: BoundedCache::new("providers", config.providers)?,
            transactions: BoundedCache::new("transactions", config.transactions)?,
            blocks: BoundedCache::new("blocks", config.blocks)?,
        })
    }

    /// Connections keyed by chain id.
    pub fn providers(&self) -> &BoundedCache<ChainId, P> {
        &self.providers
    }

    /// Transactions keyed by chain and hash. The same hash on two chains
    /// names two different transactions.
    pub fn transactions(&self) -> &BoundedCache<RecordKey, T> {
        &self.transactions
    }

    /// Blocks keyed by chain and hash.
    pub fn blocks(&self) -> &BoundedCache<RecordKey, B> {
        &self.blocks
    }

    pub fn stats(&self) -> ProviderCacheStats {
        ProviderCacheStats {
            providers: self.providers.stats(),
            transactions: self.transactions.stats(),
            blocks: self.blocks.stats(),
        }
    }

    pub fn clear(&self) {
        self.providers.clear();
        self.transactions.clear();
        self.blocks.clear();
    }
}

/// Stats for all three caches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderCacheStats {
    pub providers: CacheStats,
    pub transactions: CacheStats,
    pub blocks: CacheStats,
}
