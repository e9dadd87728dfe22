use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::cid::Cid;
use crate::multihash::Multihash;

/// Claim, produced by an anchoring service, that `root` was written into
/// transaction `tx_hash` on chain `chain_id`, mined in block `block_number`
/// at `block_timestamp`.
///
/// Proofs are immutable once created, but they are only claims: every field
/// must be checked against the chain before the anchor is trusted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorProof {
    pub chain_id: ChainId,
    pub tx_hash: Multihash,
    pub root: Cid,
    pub block_number: u64,
    /// Unix seconds.
    pub block_timestamp: u64,
}

impl AnchorProof {
    /// Transaction hash digest in the `0x…` form chain RPCs expect.
    pub fn tx_hash_hex(&self) -> String {
        self.tx_hash.digest_hex()
    }
}
