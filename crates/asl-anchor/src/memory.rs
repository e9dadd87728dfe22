use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use asl_types::{AnchorProof, ChainId, Cid, Multihash};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{AnchorError, AnchorResult};
use crate::inclusion::{verify_inclusion, ObservedInclusion};
use crate::validator::AnchorValidator;

/// Namespace of the simulated chain.
pub const INMEMORY_NAMESPACE: &str = "inmemory";

const TX_DOMAIN: &str = "asl-inmemory-tx";
const BLOCK_DOMAIN: &str = "asl-inmemory-block";
const GENESIS_TIMESTAMP: u64 = 1_600_000_000;
const BLOCK_INTERVAL_SECS: u64 = 12;

#[derive(Clone)]
struct SimulatedTx {
    hash: String,
    input: Vec<u8>,
    block_number: u64,
    block_hash: String,
    block_timestamp: u64,
}

#[derive(Default)]
struct SimulatedChain {
    height: u64,
    transactions: HashMap<Vec<u8>, SimulatedTx>,
}

/// An in-process chain that records anchors and validates them.
///
/// Every [`anchor`](Self::anchor) call mines one block holding one
/// transaction whose input is the anchored root. Proofs go through the same
/// inclusion checks as real chains.
pub struct InMemoryAnchorValidator {
    chain_id: ChainId,
    chain: Mutex<SimulatedChain>,
    initialized: AtomicBool,
}

impl Default for InMemoryAnchorValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAnchorValidator {
    pub fn new() -> Self {
        Self {
            chain_id: Self::default_chain_id(),
            chain: Mutex::new(SimulatedChain::default()),
            initialized: AtomicBool::new(false),
        }
    }

    /// `inmemory:0`.
    pub fn default_chain_id() -> ChainId {
        ChainId::inmemory(0)
    }

    /// Record `root` in a new block and return the proof for it.
    pub fn anchor(&self, root: Cid) -> AnchorProof {
        let mut chain = self.chain.lock();
        chain.height += 1;
        let block_number = chain.height;

        let mut seed = root.as_bytes().to_vec();
        seed.extend_from_slice(&block_number.to_be_bytes());
        let tx_digest = *Cid::digest(TX_DOMAIN, &seed).as_bytes();
        let block_hash = Cid::digest(BLOCK_DOMAIN, &block_number.to_be_bytes());

        let tx = SimulatedTx {
            hash: format!("0x{}", hex::encode(tx_digest)),
            input: root.as_bytes().to_vec(),
            block_number,
            block_hash: format!("0x{}", block_hash.to_hex()),
            block_timestamp: GENESIS_TIMESTAMP + block_number * BLOCK_INTERVAL_SECS,
        };
        let proof = AnchorProof {
            chain_id: self.chain_id.clone(),
            tx_hash: Multihash::new(Multihash::BLAKE3, tx_digest.to_vec()),
            root,
            block_number,
            block_timestamp: tx.block_timestamp,
        };
        chain.transactions.insert(tx_digest.to_vec(), tx);
        debug!(root = %root, block = block_number, "anchored on in-memory chain");
        proof
    }

    /// Number of blocks mined so far.
    pub fn height(&self) -> u64 {
        self.chain.lock().height
    }
}

#[async_trait]
impl AnchorValidator for InMemoryAnchorValidator {
    fn namespace(&self) -> &'static str {
        INMEMORY_NAMESPACE
    }

    fn chain_id(&self) -> Option<ChainId> {
        Some(self.chain_id.clone())
    }

    async fn init(&self, chain_id: Option<&ChainId>) -> AnchorResult<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(AnchorError::AlreadyInitialized);
        }
        match chain_id {
            Some(requested) if requested.namespace() != INMEMORY_NAMESPACE => {
                Err(AnchorError::UnsupportedNamespace {
                    chain_id: requested.clone(),
                    supported: INMEMORY_NAMESPACE,
                })
            }
            Some(requested) if *requested != self.chain_id => Err(AnchorError::NetworkMismatch {
                endpoint: INMEMORY_NAMESPACE.into(),
                expected: requested.clone(),
                actual: self.chain_id.clone(),
            }),
            _ => Ok(()),
        }
    }

    async fn validate_chain_inclusion(&self, proof: &AnchorProof) -> AnchorResult<()> {
        if proof.chain_id != self.chain_id {
            return Err(AnchorError::ChainIdMismatch {
                configured: self.chain_id.clone(),
                requested: proof.chain_id.clone(),
            });
        }
        let tx = self
            .chain
            .lock()
            .transactions
            .get(proof.tx_hash.digest())
            .cloned()
            .ok_or_else(|| AnchorError::NotFound {
                chain_id: self.chain_id.clone(),
                what: "transaction",
                id: proof.tx_hash_hex(),
            })?;

        verify_inclusion(
            proof,
            &ObservedInclusion {
                tx_hash: &tx.hash,
                tx_data: &tx.input,
                tx_block_number: tx.block_number,
                block_hash: &tx.block_hash,
                block_timestamp: tx.block_timestamp,
            },
        )
    }
}
