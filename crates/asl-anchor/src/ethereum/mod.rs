//! `eip155` chains validated over Ethereum JSON-RPC.

mod config;
mod networks;
mod provider;
mod records;
mod rpc;
mod validator;

pub use config::EthereumConfig;
pub use networks::{lookup_network, KnownNetwork, KNOWN_NETWORKS};
pub use provider::EthProvider;
pub use records::{EthBlock, EthTransaction};
pub use rpc::{HttpConnector, HttpRpcTransport, JsonRpcTransport, RpcConnector};
pub use validator::{EthereumAnchorValidator, EIP155_NAMESPACE};
