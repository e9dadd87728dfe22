//! Streams: append-only, content-addressed commit logs.
//!
//! A stream starts from a genesis commit and grows through signed commits
//! (content patches) and anchor commits (on-chain timestamps). Its
//! [`StreamState`] is the fold of that log and can always be rebuilt from it.
//!
//! # Key Types
//!
//! - [`Commit`]: genesis, signed, or anchor commit
//! - [`StreamState`]: log, materialized content, metadata and anchor status
//! - [`StreamHandle`] / [`StreamRegistry`]: per-stream locking
//! - [`PinSet`]: which streams a node keeps

pub mod commit;
pub mod error;
pub mod handle;
pub mod patch;
pub mod pin;
pub mod state;

pub use commit::{
    AnchorCommit, Commit, GenesisCommit, MetadataUpdate, PatchOp, SignedCommit, StreamMetadata,
};
pub use error::{StreamError, StreamResult};
pub use handle::{StreamHandle, StreamRegistry};
pub use patch::{apply_patch, get};
pub use pin::{InMemoryPinSet, PinList, PinSet};
pub use state::{AnchorStatus, LogEntry, StreamState};
