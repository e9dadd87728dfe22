use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Largest varint we accept (u64 needs at most 10 bytes, multihash codes fit in 9).
const MAX_VARINT_LEN: usize = 9;

/// Self-describing digest: `<varint code><varint length><digest bytes>`.
///
/// Anchor proofs carry the anchoring transaction hash in this form, so a
/// verifier can tell which hash function produced it before looking it up.
/// On the wire the encoded bytes are a hex string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Multihash {
    code: u64,
    digest: Vec<u8>,
}

impl Multihash {
    pub const SHA2_256: u64 = 0x12;
    pub const KECCAK_256: u64 = 0x1b;
    pub const BLAKE3: u64 = 0x1e;

    pub fn new(code: u64, digest: Vec<u8>) -> Self {
        Self { code, digest }
    }

    /// Wrap a 32-byte keccak-256 digest (Ethereum transaction hashes).
    pub fn keccak256(digest: [u8; 32]) -> Self {
        Self::new(Self::KECCAK_256, digest.to_vec())
    }

    pub fn code(&self) -> u64 {
        self.code
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Digest as a `0x`-prefixed hex string, the form JSON-RPC expects.
    pub fn digest_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.digest))
    }

    /// Decode from multihash bytes. Trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        let (code, rest) = read_varint(bytes)?;
        let (len, rest) = read_varint(rest)?;
        let len = usize::try_from(len)
            .map_err(|_| TypeError::InvalidMultihash(format!("digest length {len} overflows")))?;
        if rest.len() != len {
            return Err(TypeError::InvalidMultihash(format!(
                "declared digest length {len}, found {}",
                rest.len()
            )));
        }
        Ok(Self {
            code,
            digest: rest.to_vec(),
        })
    }

    /// Encode to multihash bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.digest.len() + 4);
        write_varint(self.code, &mut out);
        write_varint(self.digest.len() as u64, &mut out);
        out.extend_from_slice(&self.digest);
        out
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

fn read_varint(bytes: &[u8]) -> Result<(u64, &[u8]), TypeError> {
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate().take(MAX_VARINT_LEN) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, &bytes[i + 1..]));
        }
    }
    if bytes.len() < MAX_VARINT_LEN {
        Err(TypeError::InvalidMultihash("truncated varint".into()))
    } else {
        Err(TypeError::InvalidMultihash("varint too long".into()))
    }
}

fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash(0x{:x}, {})", self.code, hex::encode(&self.digest))
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for Multihash {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Multihash> for String {
    fn from(mh: Multihash) -> Self {
        mh.to_hex()
    }
}
