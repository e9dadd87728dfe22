use std::time::Duration;

use asl_stream::StreamError;
use asl_types::StreamId;
use thiserror::Error;

/// Errors produced while resolving a batch.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("multi-query timed out after {0:?}")]
    Timeout(Duration),

    #[error("stream {0} not found")]
    NotFound(StreamId),

    #[error("genesis commit derives stream {derived}, but the query names {expected}")]
    GenesisMismatch { expected: StreamId, derived: StreamId },

    #[error("failed to load stream {stream}: {reason}")]
    Load { stream: StreamId, reason: String },

    #[error("query task failed: {0}")]
    Task(String),

    #[error("invalid query configuration: {0}")]
    InvalidConfig(String),

    #[error("stream error: {0}")]
    Stream(#[from] StreamError),
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
