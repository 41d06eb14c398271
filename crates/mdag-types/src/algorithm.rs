use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Hash functions a [`Multihash`](crate::Multihash) may be tagged with.
///
/// The numeric codes follow the multihash table so digests produced here are
/// readable by any peer speaking the same format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA2-256, the default for every new node.
    #[default]
    #[serde(rename = "sha2-256")]
    Sha2_256,
    #[serde(rename = "sha2-512")]
    Sha2_512,
    #[serde(rename = "sha3-512")]
    Sha3_512,
    #[serde(rename = "sha3-256")]
    Sha3_256,
    #[serde(rename = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// Every supported algorithm.
    pub const ALL: [HashAlgorithm; 5] = [
        Self::Sha2_256,
        Self::Sha2_512,
        Self::Sha3_512,
        Self::Sha3_256,
        Self::Blake3,
    ];

    /// Multihash code identifying this algorithm.
    pub const fn code(self) -> u64 {
        match self {
            Self::Sha2_256 => 0x12,
            Self::Sha2_512 => 0x13,
            Self::Sha3_512 => 0x14,
            Self::Sha3_256 => 0x16,
            Self::Blake3 => 0x1e,
        }
    }

    /// Length in bytes of the digests this algorithm produces.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Sha2_256 | Self::Sha3_256 | Self::Blake3 => 32,
            Self::Sha2_512 | Self::Sha3_512 => 64,
        }
    }

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha2_256 => "sha2-256",
            Self::Sha2_512 => "sha2-512",
            Self::Sha3_512 => "sha3-512",
            Self::Sha3_256 => "sha3-256",
            Self::Blake3 => "blake3",
        }
    }

    /// Look an algorithm up by its multihash code.
    pub fn from_code(code: u64) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.code() == code)
            .ok_or_else(|| TypeError::UnknownHashFunction(format!("code {code:#x}")))
    }
}

impl FromStr for HashAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == s)
            .ok_or_else(|| TypeError::UnknownHashFunction(s.to_string()))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_sha2_256() {
        assert_eq!(HashAlgorithm::default(), HashAlgorithm::Sha2_256);
        assert_eq!(HashAlgorithm::default().code(), 0x12);
    }

    #[test]
    fn code_roundtrip() {
        for alg in HashAlgorithm::ALL {
            assert_eq!(HashAlgorithm::from_code(alg.code()).unwrap(), alg);
        }
    }

    #[test]
    fn name_roundtrip() {
        for alg in HashAlgorithm::ALL {
            assert_eq!(alg.name().parse::<HashAlgorithm>().unwrap(), alg);
            assert_eq!(alg.to_string(), alg.name());
        }
    }

    #[test]
    fn unknown_code() {
        let err = HashAlgorithm::from_code(0x11).unwrap_err();
        assert!(matches!(err, TypeError::UnknownHashFunction(_)));
    }

    #[test]
    fn unknown_name() {
        let err = "md5".parse::<HashAlgorithm>().unwrap_err();
        assert_eq!(err, TypeError::UnknownHashFunction("md5".into()));
    }

    #[test]
    fn serde_uses_names() {
        let json = serde_json::to_string(&HashAlgorithm::Sha3_256).unwrap();
        assert_eq!(json, "\"sha3-256\"");
        let parsed: HashAlgorithm = serde_json::from_str("\"blake3\"").unwrap();
        assert_eq!(parsed, HashAlgorithm::Blake3);
    }
}
