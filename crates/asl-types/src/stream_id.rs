use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cid::Cid;
use crate::error::TypeError;

const STREAM_PREFIX: &str = "stream:";

/// The kind of document a stream holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamType {
    Tile,
    Caip10Link,
    Model,
    ModelInstance,
}

impl StreamType {
    /// Numeric code used in the textual stream id.
    pub const fn code(&self) -> u8 {
        match self {
            Self::Tile => 0,
            Self::Caip10Link => 1,
            Self::Model => 2,
            Self::ModelInstance => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, TypeError> {
        match code {
            0 => Ok(Self::Tile),
            1 => Ok(Self::Caip10Link),
            2 => Ok(Self::Model),
            3 => Ok(Self::ModelInstance),
            other => Err(TypeError::UnknownStreamType(other)),
        }
    }
}

/// Immutable identifier of a stream.
///
/// A `StreamId` is the stream type plus the content hash of the stream's
/// genesis commit. The same genesis commit always produces the same
/// `StreamId`, which is what makes deterministic streams possible.
///
/// Canonical text form: `stream:<type-code>:<64 hex chars>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StreamId {
    kind: StreamType,
    genesis: Cid,
}

impl StreamId {
    pub fn new(kind: StreamType, genesis: Cid) -> Self {
        Self { kind, genesis }
    }

    pub fn stream_type(&self) -> StreamType {
        self.kind
    }

    /// Content hash of the genesis commit.
    pub fn genesis(&self) -> Cid {
        self.genesis
    }

    /// Address a specific commit of this stream.
    pub fn at_commit(&self, commit: Cid) -> CommitId {
        CommitId {
            stream: self.clone(),
            commit,
        }
    }

    /// Short identifier for logs.
    pub fn short_id(&self) -> String {
        format!("{STREAM_PREFIX}{}:{}", self.kind.code(), self.genesis.short_hex())
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self.short_id())
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{STREAM_PREFIX}{}:{}", self.kind.code(), self.genesis.to_hex())
    }
}

impl FromStr for StreamId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidStreamId {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix(STREAM_PREFIX)
            .ok_or_else(|| invalid("missing `stream:` prefix"))?;
        let (code, hash) = rest
            .split_once(':')
            .ok_or_else(|| invalid("expected `stream:<type>:<hash>`"))?;
        let code: u8 = code.parse().map_err(|_| invalid("type code is not a number"))?;
        let kind = StreamType::from_code(code)?;
        let genesis = Cid::from_hex(hash).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self { kind, genesis })
    }
}

impl TryFrom<String> for StreamId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StreamId> for String {
    fn from(id: StreamId) -> Self {
        id.to_string()
    }
}

/// A stream plus one commit in its log.
///
/// Canonical text form: `<stream id>@<64 hex chars>`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CommitId {
    stream: StreamId,
    commit: Cid,
}

impl CommitId {
    pub fn stream_id(&self) -> &StreamId {
        &self.stream
    }

    pub fn commit(&self) -> Cid {
        self.commit
    }

    /// Returns `true` if this addresses the genesis commit.
    pub fn is_genesis(&self) -> bool {
        self.commit == self.stream.genesis
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({}@{})", self.stream.short_id(), self.commit.short_hex())
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.stream, self.commit.to_hex())
    }
}

impl FromStr for CommitId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| TypeError::InvalidCommitId {
            input: s.to_string(),
            reason,
        };
        let (stream, commit) = s
            .split_once('@')
            .ok_or_else(|| invalid("expected `<stream id>@<hash>`".into()))?;
        let stream: StreamId = stream.parse().map_err(|e: TypeError| invalid(e.to_string()))?;
        let commit = Cid::from_hex(commit).map_err(|e| invalid(e.to_string()))?;
        Ok(Self { stream, commit })
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CommitId> for String {
    fn from(id: CommitId) -> Self {
        id.to_string()
    }
}
