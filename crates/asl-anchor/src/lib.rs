//! Anchor validation for the Anchored Stream Log.
//!
//! An anchor commit carries an [`AnchorProof`](asl_types::AnchorProof): a
//! claim that some root hash was written into a blockchain transaction. This
//! crate checks such claims independently of whoever produced them.
//!
//! - [`AnchorValidator`]: the per-chain-family contract (`init`,
//!   `validate_chain_inclusion`)
//! - [`ValidatorSet`]: dispatch by CAIP-2 namespace
//! - [`EthereumAnchorValidator`]: `eip155` chains over JSON-RPC, with
//!   transactions and blocks served through a bounded
//!   [`ProviderCache`](asl_cache::ProviderCache)
//! - [`InMemoryAnchorValidator`]: a simulated chain for tests and local
//!   development
//!
//! Every proof is checked three ways: the root equals the transaction data
//! (numerically), the block number matches, and the block timestamp matches.

pub mod error;
pub mod ethereum;
pub mod inclusion;
pub mod memory;
pub mod validator;

pub use error::{AnchorError, AnchorResult, ErrorKind, ProofField};
pub use ethereum::{
    lookup_network, EthBlock, EthProvider, EthTransaction, EthereumAnchorValidator,
    EthereumConfig, HttpConnector, HttpRpcTransport, JsonRpcTransport, KnownNetwork,
    RpcConnector, EIP155_NAMESPACE, KNOWN_NETWORKS,
};
pub use inclusion::{verify_inclusion, ObservedInclusion};
pub use memory::{InMemoryAnchorValidator, INMEMORY_NAMESPACE};
pub use validator::{AnchorValidator, ValidatorSet};
