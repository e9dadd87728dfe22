use asl_types::AnchorProof;
use tracing::warn;

use crate::error::{AnchorError, AnchorResult};

/// What the chain says about the transaction a proof points at.
#[derive(Clone, Copy, Debug)]
pub struct ObservedInclusion<'a> {
    pub tx_hash: &'a str,
    /// Transaction input data.
    pub tx_data: &'a [u8],
    pub tx_block_number: u64,
    pub block_hash: &'a str,
    pub block_timestamp: u64,
}

/// Check a proof against observed chain data.
///
/// All three checks must hold: root equals transaction data as a number,
/// the block numbers agree, and the block timestamps agree. The first
/// disagreement is returned with both values.
pub fn verify_inclusion(proof: &AnchorProof, observed: &ObservedInclusion<'_>) -> AnchorResult<()> {
    let root = proof.root.as_bytes();
    if !numerically_equal(root, observed.tx_data) {
        warn!(tx = observed.tx_hash, root = %proof.root, "anchor root not found in transaction");
        return Err(AnchorError::RootMismatch {
            tx_hash: observed.tx_hash.to_string(),
            proof: hex::encode(root),
            chain: hex::encode(observed.tx_data),
        });
    }

    if proof.block_number != observed.tx_block_number {
        warn!(
            tx = observed.tx_hash,
            proof = proof.block_number,
            chain = observed.tx_block_number,
            "anchor block number mismatch"
        );
        return Err(AnchorError::BlockNumberMismatch {
            tx_hash: observed.tx_hash.to_string(),
            proof: proof.block_number,
            chain: observed.tx_block_number,
        });
    }

    if proof.block_timestamp != observed.block_timestamp {
        warn!(
            tx = observed.tx_hash,
            proof = proof.block_timestamp,
            chain = observed.block_timestamp,
            "anchor block timestamp mismatch"
        );
        return Err(AnchorError::BlockTimestampMismatch {
            tx_hash: observed.tx_hash.to_string(),
            block_hash: observed.block_hash.to_string(),
            proof: proof.block_timestamp,
            chain: observed.block_timestamp,
        });
    }

    Ok(())
}

/// Compare two big-endian byte strings as unsigned integers.
fn numerically_equal(a: &[u8], b: &[u8]) -> bool {
    strip_leading_zeros(a) == strip_leading_zeros(b)
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[first..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_types::{ChainId, Cid, Multihash};

    fn proof() -> AnchorProof {
        AnchorProof {
            chain_id: ChainId::eip155(1),
            tx_hash: Multihash::keccak256([1; 32]),
            root: Cid::from_hash([0x5a; 32]),
            block_number: 100,
            block_timestamp: 1_600_000_000,
        }
    }

    fn observed(data: &[u8]) -> ObservedInclusion<'_> {
        ObservedInclusion {
            tx_hash: "0x01",
            tx_data: data,
            tx_block_number: 100,
            block_hash: "0xbb",
            block_timestamp: 1_600_000_000,
        }
    }

    #[test]
    fn matching_observation_passes() {
        verify_inclusion(&proof(), &observed(&[0x5a; 32])).unwrap();
    }

    #[test]
    fn leading_zero_bytes_are_insignificant() {
        let mut root = [0x5a; 32];
        root[0] = 0;
        let mut p = proof();
        p.root = Cid::from_hash(root);

        let mut padded = vec![0, 0];
        padded.extend_from_slice(&root[1..]);
        verify_inclusion(&p, &observed(&padded)).unwrap();
    }

    #[test]
    fn root_mismatch_reports_both_values() {
        let err = verify_inclusion(&proof(), &observed(&[0x5b; 32])).unwrap_err();
        assert!(matches!(
            &err,
            AnchorError::RootMismatch { proof, chain, .. }
                if proof == &"5a".repeat(32) && chain == &"5b".repeat(32)
        ));
    }

    #[test]
    fn checks_run_in_order() {
        let mut p = proof();
        p.block_number = 1;
        p.block_timestamp = 2;
        let err = verify_inclusion(&p, &observed(&[0x5a; 32])).unwrap_err();
        assert!(matches!(err, AnchorError::BlockNumberMismatch { proof: 1, chain: 100, .. }));

        p.block_number = 100;
        let err = verify_inclusion(&p, &observed(&[0x5a; 32])).unwrap_err();
        assert!(matches!(
            err,
            AnchorError::BlockTimestampMismatch { proof: 2, chain: 1_600_000_000, .. }
        ));
    }

    #[test]
    fn numeric_comparison() {
        assert!(numerically_equal(&[0, 0, 1], &[1]));
        assert!(numerically_equal(&[], &[0, 0]));
        assert!(!numerically_equal(&[1, 0], &[1]));
    }
}
