use asl_types::{Cid, StreamId, TypeError};
use thiserror::Error;

/// Errors produced by stream operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StreamError {
    #[error("expected a genesis commit, found a {found} commit")]
    GenesisExpected { found: &'static str },

    #[error("invalid genesis commit: {0}")]
    InvalidGenesis(String),

    #[error("commit {commit} belongs to stream genesis {genesis}, not {stream}")]
    WrongStream {
        stream: StreamId,
        commit: Cid,
        genesis: Cid,
    },

    #[error("commit {commit} on {stream} links to {prev}, but the tip is {tip}")]
    TipMismatch {
        stream: StreamId,
        commit: Cid,
        prev: Cid,
        tip: Cid,
    },

    #[error("commit {commit} on {stream} links to {prev}, which is not in the log")]
    UnknownPrev {
        stream: StreamId,
        commit: Cid,
        prev: Cid,
    },

    #[error("anchor commit {commit} on {stream} proves root {root}, not its prev {prev}")]
    RootMismatch {
        stream: StreamId,
        commit: Cid,
        root: Cid,
        prev: Cid,
    },

    #[error("anchor commit {commit} on {stream} would discard anchored commit {anchored}")]
    AnchoredHistory {
        stream: StreamId,
        commit: Cid,
        anchored: Cid,
    },

    #[error("invalid patch at {path:?}: {reason}")]
    InvalidPatch { path: String, reason: String },

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type StreamResult<T> = Result<T, StreamError>;
