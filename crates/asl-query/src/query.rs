use std::str::FromStr;

use asl_stream::{GenesisCommit, StreamResult};
use asl_types::{CommitId, StreamId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a multi-query batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiQuery {
    pub stream_id: StreamId,
    /// Genesis to apply directly instead of loading the stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis: Option<GenesisCommit>,
    /// Content paths whose values may reference other streams.
    #[serde(default)]
    pub paths: Vec<String>,
}

impl MultiQuery {
    pub fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            genesis: None,
            paths: Vec::new(),
        }
    }

    /// Query a stream that may not exist yet, given its genesis commit.
    pub fn from_genesis(genesis: GenesisCommit) -> StreamResult<Self> {
        Ok(Self {
            stream_id: genesis.stream_id()?,
            genesis: Some(genesis),
            paths: Vec::new(),
        })
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.extend(paths.into_iter().map(Into::into));
        self
    }
}

/// The stream a content value refers to, if it holds a stream or commit id.
pub fn stream_reference(value: &Value) -> Option<StreamId> {
    let text = value.as_str()?;
    if let Ok(id) = StreamId::from_str(text) {
        return Some(id);
    }
    CommitId::from_str(text).ok().map(|c| c.stream_id().clone())
}
