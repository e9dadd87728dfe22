use std::fmt;
use std::time::Duration;

use asl_types::ChainId;
use thiserror::Error;

/// The three proof fields checked against the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProofField {
    Root,
    BlockNumber,
    BlockTimestamp,
}

impl fmt::Display for ProofField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::BlockNumber => "blockNumber",
            Self::BlockTimestamp => "blockTimestamp",
        })
    }
}

/// How callers should treat an [`AnchorError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong or unsupported chain setup. Fatal; surface to the operator.
    Configuration,
    /// The provider failed or returned nothing. Retry with backoff.
    Transient,
    /// The proof disagrees with the chain. Permanent for this proof.
    ProofMismatch,
}

/// Errors produced by anchor validation.
#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("chain {chain_id} is outside the `{supported}` namespace this validator supports")]
    UnsupportedNamespace {
        chain_id: ChainId,
        supported: &'static str,
    },

    #[error("validator is configured for chain {configured} but the proof is for chain {requested}")]
    ChainIdMismatch {
        configured: ChainId,
        requested: ChainId,
    },

    #[error("rpc endpoint {endpoint} serves chain {actual}, expected {expected}")]
    NetworkMismatch {
        endpoint: String,
        expected: ChainId,
        actual: ChainId,
    },

    #[error("no provider available for chain {0}")]
    NoProvider(ChainId),

    #[error("anchor validator has already been initialized")]
    AlreadyInitialized,

    #[error("invalid validator configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "could not load {what} {id} on chain {chain_id}; the provider returned no data. \
         Public and default providers intermittently return empty results, \
         consider configuring a dedicated rpc endpoint for this chain"
    )]
    NotFound {
        chain_id: ChainId,
        what: &'static str,
        id: String,
    },

    #[error("transaction hash multihash code 0x{code:x} is not supported on chain {chain_id}")]
    UnsupportedTxHash { chain_id: ChainId, code: u64 },

    #[error("root mismatch in transaction {tx_hash}: proof root is 0x{proof}, transaction data is 0x{chain}")]
    RootMismatch {
        tx_hash: String,
        proof: String,
        chain: String,
    },

    #[error("blockNumber mismatch for transaction {tx_hash}: proof declares {proof}, transaction was mined in {chain}")]
    BlockNumberMismatch { tx_hash: String, proof: u64, chain: u64 },

    #[error("blockTimestamp mismatch for transaction {tx_hash}: proof declares {proof}, block {block_hash} has {chain}")]
    BlockTimestampMismatch {
        tx_hash: String,
        block_hash: String,
        proof: u64,
        chain: u64,
    },

    #[error("rpc request {method} to {endpoint} failed: {message}")]
    Rpc {
        endpoint: String,
        method: String,
        message: String,
    },

    #[error("malformed {method} response: {reason}")]
    MalformedResponse { method: String, reason: String },

    #[error("anchor validation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cache error: {0}")]
    Cache(#[from] asl_cache::CacheError),
}

impl AnchorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedNamespace { .. }
            | Self::ChainIdMismatch { .. }
            | Self::NetworkMismatch { .. }
            | Self::NoProvider(_)
            | Self::AlreadyInitialized
            | Self::InvalidConfig(_)
            | Self::Cache(_) => ErrorKind::Configuration,
            Self::NotFound { .. }
            | Self::Rpc { .. }
            | Self::MalformedResponse { .. }
            | Self::Timeout(_) => ErrorKind::Transient,
            Self::UnsupportedTxHash { .. }
            | Self::RootMismatch { .. }
            | Self::BlockNumberMismatch { .. }
            | Self::BlockTimestampMismatch { .. } => ErrorKind::ProofMismatch,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Which proof field disagreed with the chain, for mismatch errors.
    pub fn mismatched_field(&self) -> Option<ProofField> {
        match self {
            Self::RootMismatch { .. } => Some(ProofField::Root),
            Self::BlockNumberMismatch { .. } => Some(ProofField::BlockNumber),
            Self::BlockTimestampMismatch { .. } => Some(ProofField::BlockTimestamp),
            _ => None,
        }
    }
}

pub type AnchorResult<T> = Result<T, AnchorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_messages_name_the_field_and_both_values() {
        let err = AnchorError::BlockNumberMismatch {
            tx_hash: "0xabc".into(),
            proof: 10,
            chain: 11,
        };
        let msg = err.to_string();
        assert!(msg.contains("blockNumber"));
        assert!(msg.contains("10") && msg.contains("11"));
        assert_eq!(err.mismatched_field(), Some(ProofField::BlockNumber));
        assert_eq!(err.kind(), ErrorKind::ProofMismatch);
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_found_suggests_dedicated_endpoint() {
        let err = AnchorError::NotFound {
            chain_id: ChainId::eip155(1),
            what: "transaction",
            id: "0x01".into(),
        };
        assert!(err.to_string().contains("dedicated rpc endpoint"));
        assert!(err.is_retryable());
    }

    #[test]
    fn configuration_errors_are_not_retryable() {
        let err = AnchorError::NoProvider(ChainId::eip155(999));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "no provider available for chain eip155:999");
    }
}
