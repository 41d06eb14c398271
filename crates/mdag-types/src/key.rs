use std::fmt;

use crate::error::TypeError;
use crate::multihash::Multihash;

/// A `/<namespace>/<multihash>` path naming a node.
///
/// The digest segment is base58btc (`/ipfs/Qm...`); hex is accepted on input.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DagPath {
    pub namespace: String,
    pub digest: Multihash,
}

impl DagPath {
    /// Create a path in the given namespace.
    pub fn new(namespace: impl Into<String>, digest: Multihash) -> Self {
        Self {
            namespace: namespace.into(),
            digest,
        }
    }

    /// Parse `/<namespace>/<multihash>`.
    ///
    /// Exactly two non-empty segments are accepted; a trailing slash is
    /// tolerated.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| TypeError::InvalidPath(format!("{s:?} does not start with '/'")))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let (namespace, encoded) = rest
            .split_once('/')
            .ok_or_else(|| TypeError::InvalidPath(format!("{s:?} has no digest segment")))?;
        if namespace.is_empty() || encoded.is_empty() || encoded.contains('/') {
            return Err(TypeError::InvalidPath(format!(
                "{s:?} is not of the form /<namespace>/<digest>"
            )));
        }
        let digest = Multihash::parse(encoded)?;
        Ok(Self::new(namespace, digest))
    }
}

impl fmt::Display for DagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.namespace, self.digest)
    }
}

/// Any of the key forms accepted when looking up a node.
///
/// Keys are validated locally by [`DagKey::to_multihash`] so malformed input
/// is rejected before any block store I/O is issued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DagKey {
    /// An already-parsed digest.
    Digest(Multihash),
    /// Encoded multihash bytes, not yet validated.
    Bytes(Vec<u8>),
    /// A bare base58 or hex multihash, or a `/<namespace>/<multihash>` path.
    Text(String),
}

impl DagKey {
    /// Returns `true` if the key carries no content at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Digest(_) => false,
            Self::Bytes(b) => b.is_empty(),
            Self::Text(s) => s.is_empty(),
        }
    }

    /// Validate the key and extract the digest it names.
    ///
    /// Paths must use `namespace`; the prefix is stripped before parsing.
    pub fn to_multihash(&self, namespace: &str) -> Result<Multihash, TypeError> {
        match self {
            Self::Digest(mh) => Ok(mh.clone()),
            Self::Bytes(bytes) => Multihash::from_bytes(bytes),
            Self::Text(s) if s.starts_with('/') => {
                let path = DagPath::parse(s)?;
                if path.namespace != namespace {
                    return Err(TypeError::NamespaceMismatch {
                        expected: namespace.to_string(),
                        actual: path.namespace,
                    });
                }
                Ok(path.digest)
            }
            Self::Text(s) => Multihash::parse(s),
        }
    }
}

impl fmt::Display for DagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digest(mh) => write!(f, "{mh}"),
            Self::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<Multihash> for DagKey {
    fn from(mh: Multihash) -> Self {
        Self::Digest(mh)
    }
}

impl From<&Multihash> for DagKey {
    fn from(mh: &Multihash) -> Self {
        Self::Digest(mh.clone())
    }
}

impl From<DagPath> for DagKey {
    fn from(path: DagPath) -> Self {
        Self::Text(path.to_string())
    }
}

impl From<Vec<u8>> for DagKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for DagKey {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<String> for DagKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for DagKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashAlgorithm;

    fn digest() -> Multihash {
        Multihash::wrap(HashAlgorithm::Sha2_256, &[9u8; 32]).unwrap()
    }

    #[test]
    fn path_roundtrip() {
        let path = DagPath::new("ipfs", digest());
        let text = path.to_string();
        assert!(text.starts_with("/ipfs/Qm"));
        assert_eq!(DagPath::parse(&text).unwrap(), path);
    }

    #[test]
    fn path_tolerates_trailing_slash() {
        let text = format!("/ipfs/{}/", digest());
        assert_eq!(DagPath::parse(&text).unwrap().digest, digest());
    }

    #[test]
    fn path_rejects_bad_shapes() {
        for bad in ["ipfs/abc", "/ipfs", "/ipfs/", "//1220", "/ipfs/a/b"] {
            assert!(DagPath::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn path_rejects_bad_digest() {
        let err = DagPath::parse("/ipfs/bad path").unwrap_err();
        assert!(matches!(err, TypeError::InvalidBase58(_)));
    }

    #[test]
    fn path_accepts_hex_segment() {
        let text = format!("/ipfs/{}", digest().to_hex());
        assert_eq!(DagPath::parse(&text).unwrap().digest, digest());
    }

    #[test]
    fn base58_keys() {
        let text = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
        let bare = DagKey::from(text).to_multihash("ipfs").unwrap();
        let path = DagKey::from(format!("/ipfs/{text}")).to_multihash("ipfs").unwrap();
        assert_eq!(bare, path);
        assert_eq!(bare.algorithm(), HashAlgorithm::Sha2_256);
        assert_eq!(bare.to_string(), text);
        assert_eq!(DagPath::new("ipfs", bare).to_string(), format!("/ipfs/{text}"));
    }

    #[test]
    fn key_from_each_form() {
        let mh = digest();
        let keys: Vec<DagKey> = vec![
            mh.clone().into(),
            mh.as_bytes().into(),
            mh.to_hex().into(),
            mh.to_base58().into(),
            DagPath::new("ipfs", mh.clone()).into(),
        ];
        for key in keys {
            assert_eq!(key.to_multihash("ipfs").unwrap(), mh);
        }
    }

    #[test]
    fn key_namespace_must_match() {
        let key: DagKey = DagPath::new("other", digest()).into();
        let err = key.to_multihash("ipfs").unwrap_err();
        assert!(matches!(err, TypeError::NamespaceMismatch { .. }));
    }

    #[test]
    fn malformed_bytes_key() {
        let key = DagKey::from(&b"bad path"[..]);
        assert!(key.to_multihash("ipfs").is_err());
    }

    #[test]
    fn empty_keys() {
        assert!(DagKey::from("").is_empty());
        assert!(DagKey::from(Vec::new()).is_empty());
        assert!(!DagKey::from(digest()).is_empty());
    }
}
