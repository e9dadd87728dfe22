use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use asl_cache::{ProviderCache, ProviderCacheStats};
use asl_types::{AnchorProof, ChainId, Multihash};
use async_trait::async_trait;
use tracing::{debug, info};

use super::config::EthereumConfig;
use super::networks::lookup_network;
use super::provider::EthProvider;
use super::records::{EthBlock, EthTransaction};
use super::rpc::{redact_endpoint, HttpConnector, RpcConnector};
use crate::error::{AnchorError, AnchorResult};
use crate::inclusion::{verify_inclusion, ObservedInclusion};
use crate::validator::AnchorValidator;

/// CAIP-2 namespace of Ethereum-family chains.
pub const EIP155_NAMESPACE: &str = "eip155";

type EthCache = ProviderCache<Arc<EthProvider>, Arc<EthTransaction>, Arc<EthBlock>>;

/// Validates anchors on `eip155` chains over JSON-RPC.
///
/// With a configured `rpc_url` every request goes to that endpoint and
/// `init` pins the validator to the chain it serves. Before `init`, the
/// endpoint's chain is checked against each proof's chain on first use.
/// Without an `rpc_url`, public endpoints from the well-known network table
/// are used per chain. Connections, transactions and blocks are cached per
/// instance, records keyed by chain.
pub struct EthereumAnchorValidator {
    config: EthereumConfig,
    connector: Arc<dyn RpcConnector>,
    initialized: AtomicBool,
    fixed_chain: OnceLock<ChainId>,
    cache: EthCache,
}

impl EthereumAnchorValidator {
    pub fn new(config: EthereumConfig) -> AnchorResult<Self> {
        let connector = Arc::new(HttpConnector::new(config.request_timeout()));
        Self::with_connector(config, connector)
    }

    /// Use a custom transport factory (tests, non-HTTP transports).
    pub fn with_connector(
        config: EthereumConfig,
        connector: Arc<dyn RpcConnector>,
    ) -> AnchorResult<Self> {
        config.validate()?;
        let cache = ProviderCache::new(&config.cache)?;
        Ok(Self {
            config,
            connector,
            initialized: AtomicBool::new(false),
            fixed_chain: OnceLock::new(),
            cache,
        })
    }

    pub fn config(&self) -> &EthereumConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> ProviderCacheStats {
        self.cache.stats()
    }

    fn check_namespace(&self, chain_id: &ChainId) -> AnchorResult<()> {
        if chain_id.namespace() == EIP155_NAMESPACE {
            Ok(())
        } else {
            Err(AnchorError::UnsupportedNamespace {
                chain_id: chain_id.clone(),
                supported: EIP155_NAMESPACE,
            })
        }
    }

    async fn provider_for(&self, chain_id: &ChainId) -> AnchorResult<Arc<EthProvider>> {
        self.cache
            .providers()
            .get_or_try_insert_with(chain_id.clone(), || async {
                let provider = match &self.config.rpc_url {
                    // Mismatches are errors, and errors are never cached.
                    Some(url) => self.connect_expecting(url, chain_id).await?,
                    None => {
                        let network = lookup_network(chain_id.reference())
                            .ok_or_else(|| AnchorError::NoProvider(chain_id.clone()))?;
                        debug!(chain = %chain_id, endpoint = %redact_endpoint(network.default_rpc), "connecting rpc provider");
                        EthProvider::new(self.connector.connect(network.default_rpc)?)
                    }
                };
                Ok::<_, AnchorError>(Arc::new(provider))
            })
            .await
    }

    /// Connect to the configured endpoint and ask which chain it serves.
    async fn connect_configured(&self, url: &str) -> AnchorResult<(EthProvider, ChainId)> {
        debug!(endpoint = %redact_endpoint(url), "connecting configured rpc provider");
        let provider = EthProvider::new(self.connector.connect(url)?);
        let chain_id = ChainId::eip155(provider.chain_id().await?);
        Ok((provider, chain_id))
    }

    /// Connect to the configured endpoint, refusing it unless it serves `expected`.
    async fn connect_expecting(&self, url: &str, expected: &ChainId) -> AnchorResult<EthProvider> {
        let (provider, actual) = self.connect_configured(url).await?;
        if &actual != expected {
            return Err(AnchorError::NetworkMismatch {
                endpoint: redact_endpoint(url),
                expected: expected.clone(),
                actual,
            });
        }
        Ok(provider)
    }

    /// Ask the configured endpoint which chain it serves and keep the connection.
    async fn detect_configured_chain(&self, url: &str) -> AnchorResult<ChainId> {
        let (provider, chain_id) = self.connect_configured(url).await?;
        self.cache
            .providers()
            .insert(chain_id.clone(), Arc::new(provider));
        Ok(chain_id)
    }

    async fn transaction(
        &self,
        provider: &EthProvider,
        chain_id: &ChainId,
        tx_hash: &str,
    ) -> AnchorResult<Arc<EthTransaction>> {
        let not_found = || AnchorError::NotFound {
            chain_id: chain_id.clone(),
            what: "transaction",
            id: tx_hash.to_string(),
        };
        self.cache
            .transactions()
            .get_or_try_insert_with((chain_id.clone(), tx_hash.to_string()), || async {
                let tx = provider.transaction(tx_hash).await?.ok_or_else(not_found)?;
                // An unmined transaction can still change block; never cache it.
                if tx.block_hash.is_none() || tx.block_number.is_none() {
                    return Err(not_found());
                }
                Ok::<_, AnchorError>(Arc::new(tx))
            })
            .await
    }

    async fn block(
        &self,
        provider: &EthProvider,
        chain_id: &ChainId,
        block_hash: &str,
    ) -> AnchorResult<Arc<EthBlock>> {
        self.cache
            .blocks()
            .get_or_try_insert_with((chain_id.clone(), block_hash.to_string()), || async {
                provider
                    .block(block_hash)
                    .await?
                    .map(Arc::new)
                    .ok_or_else(|| AnchorError::NotFound {
                        chain_id: chain_id.clone(),
                        what: "block",
                        id: block_hash.to_string(),
                    })
            })
            .await
    }
}

#[async_trait]
impl AnchorValidator for EthereumAnchorValidator {
    fn namespace(&self) -> &'static str {
        EIP155_NAMESPACE
    }

    fn chain_id(&self) -> Option<ChainId> {
        self.fixed_chain.get().cloned()
    }

    async fn init(&self, chain_id: Option<&ChainId>) -> AnchorResult<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(AnchorError::AlreadyInitialized);
        }

        let fixed = match (chain_id, &self.config.rpc_url) {
            (Some(expected), Some(url)) => {
                self.check_namespace(expected)?;
                let actual = self.detect_configured_chain(url).await?;
                if &actual != expected {
                    return Err(AnchorError::NetworkMismatch {
                        endpoint: redact_endpoint(url),
                        expected: expected.clone(),
                        actual,
                    });
                }
                Some(actual)
            }
            (Some(expected), None) => {
                self.check_namespace(expected)?;
                if lookup_network(expected.reference()).is_none() {
                    return Err(AnchorError::NoProvider(expected.clone()));
                }
                Some(expected.clone())
            }
            (None, Some(url)) => Some(self.detect_configured_chain(url).await?),
            (None, None) => None,
        };

        match fixed {
            Some(chain) => {
                let endpoint = self.config.rpc_url.as_deref().map(redact_endpoint);
                info!(chain = %chain, endpoint = ?endpoint, "ethereum anchor validator initialized");
                let _ = self.fixed_chain.set(chain);
            }
            None => info!("ethereum anchor validator initialized for all known networks"),
        }
        Ok(())
    }

    async fn validate_chain_inclusion(&self, proof: &AnchorProof) -> AnchorResult<()> {
        let chain_id = &proof.chain_id;
        self.check_namespace(chain_id)?;
        if let Some(fixed) = self.fixed_chain.get() {
            if fixed != chain_id {
                return Err(AnchorError::ChainIdMismatch {
                    configured: fixed.clone(),
                    requested: chain_id.clone(),
                });
            }
        }
        if proof.tx_hash.code() != Multihash::KECCAK_256 {
            return Err(AnchorError::UnsupportedTxHash {
                chain_id: chain_id.clone(),
                code: proof.tx_hash.code(),
            });
        }

        let provider = self.provider_for(chain_id).await?;
        let tx_hash = proof.tx_hash_hex();
        let tx = self.transaction(&provider, chain_id, &tx_hash).await?;

        let (Some(block_hash), Some(tx_block_number)) = (&tx.block_hash, tx.block_number) else {
            return Err(AnchorError::NotFound {
                chain_id: chain_id.clone(),
                what: "transaction",
                id: tx_hash,
            });
        };
        let block = self.block(&provider, chain_id, block_hash).await?;

        verify_inclusion(
            proof,
            &ObservedInclusion {
                tx_hash: &tx.hash,
                tx_data: &tx.input,
                tx_block_number,
                block_hash: &block.hash,
                block_timestamp: block.timestamp,
            },
        )?;
        debug!(chain = %chain_id, tx = %tx.hash, block = tx_block_number, "anchor proof validated");
        Ok(())
    }
}
