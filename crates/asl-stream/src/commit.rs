use asl_types::cid::COMMIT_DOMAIN;
use asl_types::{AnchorProof, Cid, StreamId, StreamType};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{StreamError, StreamResult};

/// Stream metadata set at genesis and optionally updated by signed commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    /// Accounts allowed to write to the stream.
    pub controllers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    /// Salt that makes otherwise identical genesis commits distinct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<String>,
}

impl StreamMetadata {
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controllers: vec![controller.into()],
            family: None,
            unique: None,
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self
    }

    /// Attach a random salt, so the genesis commit yields a fresh stream id.
    pub fn with_unique_salt(mut self) -> Self {
        let salt: [u8; 12] = rand::thread_rng().gen();
        self.unique = Some(hex::encode(salt));
        self
    }
}

/// Metadata fields a signed commit may change. `unique` is fixed at genesis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controllers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

impl MetadataUpdate {
    pub fn apply_to(&self, metadata: &StreamMetadata) -> StreamMetadata {
        let mut next = metadata.clone();
        if let Some(controllers) = &self.controllers {
            next.controllers = controllers.clone();
        }
        if let Some(family) = &self.family {
            next.family = Some(family.clone());
        }
        next
    }
}

/// One JSON-pointer patch operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PatchOp {
    Add { path: String, value: Value },
    Replace { path: String, value: Value },
    Remove { path: String },
}

impl PatchOp {
    pub fn path(&self) -> &str {
        match self {
            Self::Add { path, .. } | Self::Replace { path, .. } | Self::Remove { path } => path,
        }
    }
}

/// First commit of a stream; its hash is the stream's identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisCommit {
    pub stream_type: StreamType,
    pub header: StreamMetadata,
    #[serde(default)]
    pub content: Value,
}

impl GenesisCommit {
    pub fn new(stream_type: StreamType, header: StreamMetadata, content: Value) -> Self {
        Self {
            stream_type,
            header,
            content,
        }
    }

    /// Stream id this genesis commit creates.
    pub fn stream_id(&self) -> StreamResult<StreamId> {
        let cid = Commit::Genesis(self.clone()).cid()?;
        Ok(StreamId::new(self.stream_type, cid))
    }
}

/// Content update linking to the previous tip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCommit {
    pub prev: Cid,
    pub genesis: Cid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<MetadataUpdate>,
    #[serde(default)]
    pub patch: Vec<PatchOp>,
}

impl SignedCommit {
    pub fn new(stream: &StreamId, prev: Cid, patch: Vec<PatchOp>) -> Self {
        Self {
            prev,
            genesis: stream.genesis(),
            header: None,
            patch,
        }
    }

    pub fn with_header(mut self, header: MetadataUpdate) -> Self {
        self.header = Some(header);
        self
    }
}

/// Timestamp of `prev` on a blockchain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorCommit {
    pub prev: Cid,
    pub genesis: Cid,
    pub proof: AnchorProof,
}

impl AnchorCommit {
    pub fn new(stream: &StreamId, prev: Cid, proof: AnchorProof) -> Self {
        Self {
            prev,
            genesis: stream.genesis(),
            proof,
        }
    }
}

/// An immutable, content-addressed log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Commit {
    Genesis(GenesisCommit),
    Signed(SignedCommit),
    Anchor(AnchorCommit),
}

impl Commit {
    /// Content hash of the commit's canonical JSON encoding.
    pub fn cid(&self) -> StreamResult<Cid> {
        Ok(Cid::of_json(COMMIT_DOMAIN, self)?)
    }

    /// Link to the previous commit; `None` for genesis.
    pub fn prev(&self) -> Option<Cid> {
        match self {
            Self::Genesis(_) => None,
            Self::Signed(c) => Some(c.prev),
            Self::Anchor(c) => Some(c.prev),
        }
    }

    /// The genesis this commit claims to extend; `None` for genesis itself.
    pub fn genesis_link(&self) -> Option<Cid> {
        match self {
            Self::Genesis(_) => None,
            Self::Signed(c) => Some(c.genesis),
            Self::Anchor(c) => Some(c.genesis),
        }
    }

    pub fn anchor_proof(&self) -> Option<&AnchorProof> {
        match self {
            Self::Anchor(c) => Some(&c.proof),
            _ => None,
        }
    }

    pub fn is_anchor(&self) -> bool {
        matches!(self, Self::Anchor(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Genesis(_) => "genesis",
            Self::Signed(_) => "signed",
            Self::Anchor(_) => "anchor",
        }
    }

    /// Parse a commit from JSON.
    pub fn from_json(value: Value) -> StreamResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| StreamError::Type(asl_types::TypeError::Serialization(e.to_string())))
    }
}

impl From<GenesisCommit> for Commit {
    fn from(c: GenesisCommit) -> Self {
        Self::Genesis(c)
    }
}

impl From<SignedCommit> for Commit {
    fn from(c: SignedCommit) -> Self {
        Self::Signed(c)
    }
}

impl From<AnchorCommit> for Commit {
    fn from(c: AnchorCommit) -> Self {
        Self::Anchor(c)
    }
}
