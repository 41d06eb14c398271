use std::fmt;

use mdag_types::Multihash;
use serde::{Deserialize, Serialize};

use crate::error::DagResult;
use crate::node::Node;

/// A named, sized edge from a node to another node's digest.
///
/// Links are immutable values. Two links are equal when their name, size, and
/// digest all match. Resolving a link to the node it names goes through a
/// [`ResolvedDag`](crate::ResolvedDag) or a [`Resolver`](crate::Resolver);
/// the link itself never holds the target.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    name: String,
    size: u64,
    digest: Multihash,
}

impl Link {
    /// Create a link. `size` is the cumulative size of the target subgraph.
    pub fn new(name: impl Into<String>, size: u64, digest: Multihash) -> Self {
        Self {
            name: name.into(),
            size,
            digest,
        }
    }

    /// Create a link from encoded multihash bytes.
    ///
    /// Fails with [`MalformedDigest`](crate::DagError::MalformedDigest) when
    /// the bytes are not a well-formed multihash.
    pub fn from_digest_bytes(name: impl Into<String>, size: u64, digest: &[u8]) -> DagResult<Self> {
        let digest = Multihash::from_bytes(digest)?;
        Ok(Self::new(name, size, digest))
    }

    /// An unnamed link pointing at `node`.
    pub fn from_node(node: &Node) -> Self {
        Self::new("", node.size(), node.digest())
    }

    /// The same link under a different name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(name, self.size, self.digest.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn digest(&self) -> &Multihash {
        &self.digest
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link <{:?} -> {}, size: {}>", self.name, self.digest, self.size)
    }
}
