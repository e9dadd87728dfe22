//! # asl-sdk
//!
//! A node for the Anchored Stream Log. It ties together:
//!
//! - streams and their per-stream locks (`asl-stream`)
//! - conflict resolution between competing logs (`asl-conflict`)
//! - blockchain anchor validation (`asl-anchor`)
//! - batched multi-query loading (`asl-query`)
//!
//! ```no_run
//! # async fn demo() -> asl_sdk::SdkResult<()> {
//! use asl_sdk::{Node, NodeConfig};
//!
//! let config = NodeConfig::load("asl.toml")?;
//! let node = Node::from_config(&config).await?;
//! println!("{} streams held", node.streams().len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod node;

pub use config::{AnchorConfig, NodeConfig};
pub use error::{SdkError, SdkResult};
pub use node::{Node, NodeBuilder};

pub use asl_anchor::{AnchorError, InMemoryAnchorValidator, ValidatorSet};
pub use asl_conflict::{Applied, ConflictError, SyncStatus};
pub use asl_query::{MultiQuery, QueryConfig, QueryError, StreamLoader};
pub use asl_stream::{
    AnchorCommit, AnchorStatus, Commit, GenesisCommit, MetadataUpdate, PatchOp, SignedCommit,
    StreamMetadata, StreamState,
};
pub use asl_types::{AnchorProof, ChainId, Cid, CommitId, StreamId, StreamType};
