use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid stream id {input:?}: {reason}")]
    InvalidStreamId { input: String, reason: String },

    #[error("invalid commit id {input:?}: {reason}")]
    InvalidCommitId { input: String, reason: String },

    #[error("unknown stream type code {0}")]
    UnknownStreamType(u8),

    #[error("invalid chain id {input:?}: {reason}")]
    InvalidChainId { input: String, reason: String },

    #[error("invalid multihash: {0}")]
    InvalidMultihash(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
