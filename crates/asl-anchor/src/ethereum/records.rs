use serde_json::Value;

use crate::error::{AnchorError, AnchorResult};

/// The fields of an Ethereum transaction that anchor validation reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EthTransaction {
    pub hash: String,
    /// `None` while the transaction is pending.
    pub block_hash: Option<String>,
    pub block_number: Option<u64>,
    pub input: Vec<u8>,
}

/// The fields of an Ethereum block header that anchor validation reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EthBlock {
    pub hash: String,
    pub number: u64,
    /// Unix seconds.
    pub timestamp: u64,
}

impl EthTransaction {
    /// Parse an `eth_getTransactionByHash` result object.
    pub fn from_rpc(value: &Value) -> AnchorResult<Self> {
        const METHOD: &str = "eth_getTransactionByHash";
        Ok(Self {
            hash: required_str(METHOD, value, "hash")?.to_ascii_lowercase(),
            block_hash: optional_str(value, "blockHash").map(str::to_ascii_lowercase),
            block_number: match optional_str(value, "blockNumber") {
                Some(q) => Some(parse_quantity(METHOD, "blockNumber", q)?),
                None => None,
            },
            input: decode_data(METHOD, "input", required_str(METHOD, value, "input")?)?,
        })
    }
}

impl EthBlock {
    /// Parse an `eth_getBlockByHash` result object.
    pub fn from_rpc(value: &Value) -> AnchorResult<Self> {
        const METHOD: &str = "eth_getBlockByHash";
        Ok(Self {
            hash: required_str(METHOD, value, "hash")?.to_ascii_lowercase(),
            number: parse_quantity(METHOD, "number", required_str(METHOD, value, "number")?)?,
            timestamp: parse_quantity(
                METHOD,
                "timestamp",
                required_str(METHOD, value, "timestamp")?,
            )?,
        })
    }
}

fn optional_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

fn required_str<'a>(method: &str, value: &'a Value, field: &str) -> AnchorResult<&'a str> {
    optional_str(value, field).ok_or_else(|| AnchorError::MalformedResponse {
        method: method.to_string(),
        reason: format!("missing string field `{field}`"),
    })
}

/// Parse a JSON-RPC quantity (`0x`-prefixed hex, no leading zeros required).
pub(crate) fn parse_quantity(method: &str, field: &str, quantity: &str) -> AnchorResult<u64> {
    let malformed = || AnchorError::MalformedResponse {
        method: method.to_string(),
        reason: format!("`{field}` is not a hex quantity: {quantity}"),
    };
    let digits = quantity.strip_prefix("0x").ok_or_else(malformed)?;
    if digits.is_empty() {
        return Err(malformed());
    }
    u64::from_str_radix(digits, 16).map_err(|_| malformed())
}

/// Decode JSON-RPC unformatted data (`0x`-prefixed, even-length hex).
pub(crate) fn decode_data(method: &str, field: &str, data: &str) -> AnchorResult<Vec<u8>> {
    let malformed = |reason: String| AnchorError::MalformedResponse {
        method: method.to_string(),
        reason: format!("`{field}`: {reason}"),
    };
    let digits = data
        .strip_prefix("0x")
        .ok_or_else(|| malformed("missing 0x prefix".into()))?;
    hex::decode(digits).map_err(|e| malformed(e.to_string()))
}
