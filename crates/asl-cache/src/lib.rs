//! Bounded read caches for anchor validation.
//!
//! Chain records consumed by anchor validation (a mined transaction, the
//! block it landed in) never change, so the caches here have no TTL: only
//! capacity bounds memory. Every cache is strictly least-recently-used and
//! safe to share across concurrent validations.
//!
//! - [`BoundedCache`]: one thread-safe LRU map with hit/miss/eviction stats
//! - [`ProviderCache`]: the three caches a validator owns: connections by
//!   chain, transactions and blocks by chain and hash

pub mod bounded;
pub mod config;
pub mod error;
pub mod provider;

pub use bounded::{BoundedCache, CacheStats};
pub use config::CacheConfig;
pub use error::{CacheError, CacheResult};
pub use provider::{ProviderCache, ProviderCacheStats, RecordKey};
