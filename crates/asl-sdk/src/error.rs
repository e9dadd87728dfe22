use std::path::PathBuf;

use asl_types::StreamId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("stream not found: {0}")]
    StreamNotFound(StreamId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    #[error("anchor error: {0}")]
    Anchor(#[from] asl_anchor::AnchorError),

    #[error(transparent)]
    Conflict(#[from] asl_conflict::ConflictError),

    #[error("query error: {0}")]
    Query(#[from] asl_query::QueryError),

    #[error("stream error: {0}")]
    Stream(#[from] asl_stream::StreamError),

    #[error("type error: {0}")]
    Type(#[from] asl_types::TypeError),
}

pub type SdkResult<T> = Result<T, SdkError>;
