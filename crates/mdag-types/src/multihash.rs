use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::algorithm::HashAlgorithm;
use crate::error::TypeError;
use crate::varint::{decode_varint, encode_varint};

/// Self-describing content digest: `varint(code) ‖ varint(len) ‖ digest`.
///
/// A `Multihash` is the address of a block. Identical content hashed with the
/// same algorithm always produces the same `Multihash`, and the algorithm tag
/// lets digests from different hash functions live side by side in one graph.
///
/// Construction always validates; a `Multihash` value is well-formed by type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Multihash {
    bytes: Vec<u8>,
    algorithm: HashAlgorithm,
    prefix_len: usize,
}

impl Multihash {
    /// Wrap a raw digest produced by `algorithm`.
    pub fn wrap(algorithm: HashAlgorithm, digest: &[u8]) -> Result<Self, TypeError> {
        if digest.len() != algorithm.digest_len() {
            return Err(TypeError::MalformedDigest(format!(
                "{algorithm} digest must be {} bytes, got {}",
                algorithm.digest_len(),
                digest.len()
            )));
        }
        let mut bytes = Vec::with_capacity(digest.len() + 2);
        encode_varint(&mut bytes, algorithm.code());
        encode_varint(&mut bytes, digest.len() as u64);
        let prefix_len = bytes.len();
        bytes.extend_from_slice(digest);
        Ok(Self {
            bytes,
            algorithm,
            prefix_len,
        })
    }

    /// Parse and validate an encoded multihash.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TypeError> {
        let (code, code_len) = decode_varint(data)
            .map_err(|e| TypeError::MalformedDigest(format!("hash code: {e}")))?;
        let (len, len_len) = decode_varint(&data[code_len..])
            .map_err(|e| TypeError::MalformedDigest(format!("digest length: {e}")))?;
        let prefix_len = code_len + len_len;
        let remaining = data.len() - prefix_len;
        if len == 0 {
            return Err(TypeError::MalformedDigest("empty digest".into()));
        }
        if len != remaining as u64 {
            return Err(TypeError::MalformedDigest(format!(
                "length prefix says {len} bytes, found {remaining}"
            )));
        }
        let algorithm = HashAlgorithm::from_code(code)?;
        if remaining != algorithm.digest_len() {
            return Err(TypeError::MalformedDigest(format!(
                "{algorithm} digest must be {} bytes, got {remaining}",
                algorithm.digest_len()
            )));
        }
        Ok(Self {
            bytes: data.to_vec(),
            algorithm,
            prefix_len,
        })
    }

    /// The algorithm this digest was produced with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The raw digest without the multihash prefix.
    pub fn digest(&self) -> &[u8] {
        &self.bytes[self.prefix_len..]
    }

    /// The full encoded multihash.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the full encoded multihash.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Hex-encoded string representation of the full multihash.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Short hex representation (first 8 characters of the raw digest).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.digest()[..4])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Base58btc text form (`Qm...` for SHA2-256).
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.bytes).into_string()
    }

    /// Parse from a base58btc string.
    pub fn from_base58(s: &str) -> Result<Self, TypeError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| TypeError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Parse either text form.
    ///
    /// Every supported hex multihash carries a `0` in its prefix, which is
    /// outside the base58 alphabet, so a string that parses as hex is taken
    /// as hex and anything else as base58.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            if let Ok(mh) = Self::from_hex(s) {
                return Ok(mh);
            }
        }
        Self::from_base58(s)
    }
}

impl fmt::Debug for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multihash({}:{})", self.algorithm, self.short_hex())
    }
}

impl fmt::Display for Multihash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl std::str::FromStr for Multihash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&[u8]> for Multihash {
    type Error = TypeError;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(data)
    }
}

impl AsRef<[u8]> for Multihash {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Serialize for Multihash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Multihash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
