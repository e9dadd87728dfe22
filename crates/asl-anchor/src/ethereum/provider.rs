use std::sync::Arc;

use serde_json::{json, Value};

use super::records::{parse_quantity, EthBlock, EthTransaction};
use super::rpc::JsonRpcTransport;
use crate::error::AnchorResult;

/// Typed Ethereum queries over a [`JsonRpcTransport`].
#[derive(Clone)]
pub struct EthProvider {
    transport: Arc<dyn JsonRpcTransport>,
}

impl EthProvider {
    pub fn new(transport: Arc<dyn JsonRpcTransport>) -> Self {
        Self { transport }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> AnchorResult<u64> {
        let result = self.transport.request("eth_chainId", json!([])).await?;
        let quantity = result.as_str().unwrap_or_default();
        parse_quantity("eth_chainId", "result", quantity)
    }

    /// `eth_getTransactionByHash`; `None` when the node does not know it.
    pub async fn transaction(&self, hash: &str) -> AnchorResult<Option<EthTransaction>> {
        let result = self
            .transport
            .request("eth_getTransactionByHash", json!([hash]))
            .await?;
        non_null(result).map(|v| EthTransaction::from_rpc(&v)).transpose()
    }

    /// `eth_getBlockByHash` without transaction bodies.
    pub async fn block(&self, hash: &str) -> AnchorResult<Option<EthBlock>> {
        let result = self
            .transport
            .request("eth_getBlockByHash", json!([hash, false]))
            .await?;
        non_null(result).map(|v| EthBlock::from_rpc(&v)).transpose()
    }
}

fn non_null(value: Value) -> Option<Value> {
    (!value.is_null()).then_some(value)
}
