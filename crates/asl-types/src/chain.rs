use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// CAIP-2 blockchain identifier: `namespace:reference`, e.g. `eip155:1`.
///
/// The namespace names a chain family (`eip155` for Ethereum-style chains),
/// the reference names one network inside that family. Both parts are
/// validated against the CAIP-2 character rules on parse.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// Build a chain id from its two parts, validating both.
    pub fn new(namespace: &str, reference: &str) -> Result<Self, TypeError> {
        let input = format!("{namespace}:{reference}");
        let invalid = |reason: &str| TypeError::InvalidChainId {
            input: input.clone(),
            reason: reason.to_string(),
        };

        if !(3..=8).contains(&namespace.len())
            || !namespace
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(invalid("namespace must be 3-8 characters of [-a-z0-9]"));
        }
        if !(1..=32).contains(&reference.len())
            || !reference
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(invalid("reference must be 1-32 characters of [-_a-zA-Z0-9]"));
        }

        Ok(Self {
            namespace: namespace.to_string(),
            reference: reference.to_string(),
        })
    }

    /// Ethereum-family chain id (`eip155:<chain id>`).
    pub fn eip155(chain_id: u64) -> Self {
        Self {
            namespace: "eip155".into(),
            reference: chain_id.to_string(),
        }
    }

    /// Simulated in-process chain id (`inmemory:<reference>`).
    pub fn inmemory(reference: u64) -> Self {
        Self {
            namespace: "inmemory".into(),
            reference: reference.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Debug for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainId({self})")
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl FromStr for ChainId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, reference) =
            s.split_once(':').ok_or_else(|| TypeError::InvalidChainId {
                input: s.to_string(),
                reason: "expected `namespace:reference`".into(),
            })?;
        Self::new(namespace, reference)
    }
}

impl TryFrom<String> for ChainId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChainId> for String {
    fn from(id: ChainId) -> Self {
        id.to_string()
    }
}
