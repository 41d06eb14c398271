use std::fmt;
use std::sync::OnceLock;

use mdag_crypto::ContentHasher;
use mdag_types::{HashAlgorithm, Multihash};
use serde::{Deserialize, Serialize};

use crate::codec::{decode_node, encode_node};
use crate::error::{DagError, DagResult};
use crate::link::Link;

/// A block in the Merkle DAG: an opaque payload plus named links to children.
///
/// Links are kept stable-sorted by name bytes, so two nodes built from the
/// same payload and the same links (in any order) encode to identical bytes
/// and share a digest. Links with duplicate names are legal and keep their
/// insertion order.
///
/// The canonical encoding and digest are computed lazily and cached. Every
/// mutation drops the cache, so [`Node::digest`] always reflects the current
/// payload and links.
pub struct Node {
    /// `None` when the payload field is absent from the encoding.
    payload: Option<Vec<u8>>,
    links: Vec<Link>,
    algorithm: HashAlgorithm,
    encoded: OnceLock<Encoded>,
}

#[derive(Debug)]
struct Encoded {
    bytes: Vec<u8>,
    digest: Multihash,
}

impl Node {
    /// Create a node with no links. An empty payload is omitted from the
    /// encoding.
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self::with_links(payload, Vec::new())
    }

    /// Create a node with neither payload nor links.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Create a node from a payload and links, sorting the links.
    pub fn with_links(payload: impl Into<Vec<u8>>, links: impl IntoIterator<Item = Link>) -> Self {
        let payload = payload.into();
        let mut node = Self {
            payload: (!payload.is_empty()).then_some(payload),
            links: links.into_iter().collect(),
            algorithm: HashAlgorithm::default(),
            encoded: OnceLock::new(),
        };
        node.sort_links();
        node
    }

    /// Use `algorithm` for this node's digest.
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self.invalidate();
        self
    }

    /// Decode canonical bytes into a node hashed with the default algorithm.
    pub fn decode(bytes: &[u8]) -> DagResult<Self> {
        Self::decode_with(bytes, HashAlgorithm::default())
    }

    /// Decode canonical bytes into a node hashed with `algorithm`.
    ///
    /// Links are re-sorted after decoding; the result is equal to the node
    /// that produced the bytes.
    pub fn decode_with(bytes: &[u8], algorithm: HashAlgorithm) -> DagResult<Self> {
        let decoded = decode_node(bytes)?;
        let mut node = Self {
            payload: decoded.payload,
            links: decoded.links,
            algorithm,
            encoded: OnceLock::new(),
        };
        node.sort_links();
        Ok(node)
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn payload(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The first link named `name`.
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name() == name)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        let payload = payload.into();
        self.payload = (!payload.is_empty()).then_some(payload);
        self.invalidate();
    }

    /// Append a link and restore the sort order.
    pub fn add_link(&mut self, link: Link) {
        self.links.push(link);
        self.sort_links();
        self.invalidate();
    }

    /// Add a link named `name` pointing at `node`.
    pub fn add_link_to_node(&mut self, name: impl Into<String>, node: &Node) {
        self.add_link(Link::new(name, node.size(), node.digest()));
    }

    /// Remove every link named `name`. Returns how many were removed.
    pub fn remove_link_by_name(&mut self, name: &str) -> usize {
        self.remove_links_where(|l| l.name() == name)
    }

    /// Remove every link pointing at `digest`. Returns how many were removed.
    pub fn remove_link_by_digest(&mut self, digest: &Multihash) -> usize {
        self.remove_links_where(|l| l.digest() == digest)
    }

    /// A copy of this node with every link named `name` replaced by a single
    /// link to `node`. `self` is left untouched.
    pub fn with_updated_link(&self, name: &str, node: &Node) -> Node {
        let mut updated = self.copy();
        updated.remove_link_by_name(name);
        updated.add_link_to_node(name, node);
        updated
    }

    /// An independent copy with the same payload and links and empty caches.
    pub fn copy(&self) -> Node {
        Self {
            payload: self.payload.clone(),
            links: self.links.clone(),
            algorithm: self.algorithm,
            encoded: OnceLock::new(),
        }
    }

    fn remove_links_where(&mut self, pred: impl Fn(&Link) -> bool) -> usize {
        let before = self.links.len();
        self.links.retain(|l| !pred(l));
        let removed = before - self.links.len();
        if removed > 0 {
            self.invalidate();
        }
        removed
    }

    fn sort_links(&mut self) {
        // slice::sort_by is stable: equal names keep insertion order.
        self.links.sort_by(|a, b| a.name().as_bytes().cmp(b.name().as_bytes()));
    }

    fn invalidate(&mut self) {
        self.encoded.take();
    }

    // ---------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------

    /// Payload length plus the recorded size of every link, saturating at
    /// `u64::MAX`.
    ///
    /// This is not the encoded length. Other dag-pb implementations record
    /// the encoded length plus child sizes as a link's `Tsize`, so a parent
    /// built with [`add_link_to_node`](Self::add_link_to_node) hashes
    /// differently from the same tree built there. Use
    /// [`add_link`](Self::add_link) with an explicit size to match them.
    pub fn size(&self) -> u64 {
        self.size_checked().unwrap_or(u64::MAX)
    }

    /// [`size`](Self::size), or `None` if the sum overflows.
    pub fn size_checked(&self) -> Option<u64> {
        checked_sum(
            std::iter::once(self.payload().len() as u64).chain(self.links.iter().map(Link::size)),
        )
    }

    /// Canonical bytes, computed once and cached until the next mutation.
    pub fn encode(&self) -> &[u8] {
        &self.cached().bytes
    }

    /// Drop the cache and re-encode.
    pub fn encode_forced(&mut self) -> &[u8] {
        self.invalidate();
        self.encode()
    }

    /// Digest of the canonical bytes under this node's algorithm.
    pub fn digest(&self) -> Multihash {
        self.cached().digest.clone()
    }

    /// Digest of the canonical bytes under `algorithm`.
    ///
    /// Only digests under the node's own algorithm are cached.
    pub fn digest_with(&self, algorithm: HashAlgorithm) -> Multihash {
        if algorithm == self.algorithm {
            return self.digest();
        }
        ContentHasher::new(algorithm).hash(self.encode())
    }

    fn cached(&self) -> &Encoded {
        self.encoded.get_or_init(|| {
            let bytes = encode_node(self.payload.as_deref(), &self.links);
            let digest = ContentHasher::new(self.algorithm).hash(&bytes);
            Encoded { bytes, digest }
        })
    }

    // ---------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------

    /// Read-only projection for tooling.
    pub fn to_json_view(&self) -> NodeView {
        NodeView {
            payload: hex::encode(self.payload()),
            links: self.links.clone(),
            digest: self.digest(),
            size: self.size(),
        }
    }

    /// The JSON projection as a string.
    pub fn to_json(&self) -> DagResult<String> {
        serde_json::to_string(&self.to_json_view()).map_err(|e| DagError::Serialization(e.to_string()))
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::empty()
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload && self.links == other.links
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("payload_len", &self.payload().len())
            .field("links", &self.links)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node <payload: {:?}, links: {}>",
            String::from_utf8_lossy(self.payload()),
            self.links.len()
        )
    }
}

fn checked_sum(iter: impl IntoIterator<Item = u64>) -> Option<u64> {
    iter.into_iter().try_fold(0u64, |acc, i| acc.checked_add(i))
}

/// JSON projection of a [`Node`]: `{ payload, links, digest, size }` with the
/// payload as hex and digests as base58.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub payload: String,
    pub links: Vec<Link>,
    pub digest: Multihash,
    pub size: u64,
}
