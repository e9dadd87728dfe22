//! Foundation types for the Anchored Stream Log (ASL).
//!
//! This crate provides the identity, addressing, and anchoring types used
//! throughout ASL. Every other ASL crate depends on `asl-types`.
//!
//! # Key Types
//!
//! - [`Cid`]: Content hash of a commit (domain-separated BLAKE3)
//! - [`StreamId`]: Stream type plus the content hash of its genesis commit
//! - [`CommitId`]: A stream plus one specific commit in its log
//! - [`ChainId`]: CAIP-2 `namespace:reference` blockchain identifier
//! - [`Multihash`]: Self-describing digest (used for transaction hashes)
//! - [`AnchorProof`]: Claim that a root hash was included on-chain

pub mod anchor;
pub mod chain;
pub mod cid;
pub mod error;
pub mod multihash;
pub mod stream_id;

pub use anchor::AnchorProof;
pub use chain::ChainId;
pub use cid::Cid;
pub use error::TypeError;
pub use multihash::Multihash;
pub use stream_id::{CommitId, StreamId, StreamType};
