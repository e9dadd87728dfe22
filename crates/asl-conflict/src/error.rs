use asl_anchor::AnchorError;
use asl_stream::StreamError;
use asl_types::{Cid, StreamId};
use thiserror::Error;

use crate::decision::RejectReason;

/// Errors produced while applying commits or logs.
#[derive(Debug, Error)]
pub enum ConflictError {
    /// An expected outcome of racing writers; re-sync and retry.
    #[error("{reason} (commit {commit} on {stream})")]
    Rejected {
        stream: StreamId,
        commit: Cid,
        reason: RejectReason,
    },

    #[error("anchor proof of commit {commit} on {stream} failed validation: {source}")]
    InvalidAnchor {
        stream: StreamId,
        commit: Cid,
        #[source]
        source: AnchorError,
    },

    #[error("log for {found} cannot be synced into {expected}")]
    ForeignLog { expected: StreamId, found: StreamId },

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}

impl ConflictError {
    /// True for stale-tip rejections, which callers resolve by re-syncing.
    pub fn is_stale_tip(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                reason: RejectReason::StaleTip { .. },
                ..
            }
        )
    }
}

pub type ConflictResult<T> = Result<T, ConflictError>;
