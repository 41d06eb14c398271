//! The DAG service: nodes in and out of a block store.
//!
//! [`DagService`] is the only component that talks to a [`BlockStore`]. It
//! encodes nodes on the way in, decodes them on the way out, validates keys
//! before issuing any I/O, and resolves whole subgraphs with
//! [`DagService::get_recursive`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mdag_store::{BlockStore, InMemoryBlockStore};
use mdag_types::{DagKey, Multihash};
use tracing::{debug, warn};

use crate::config::DagConfig;
use crate::error::{DagError, DagResult};
use crate::node::Node;
use crate::resolved::ResolvedDag;
use crate::traversal::Resolver;

/// Stores and fetches nodes through a shared [`BlockStore`].
///
/// Cloning is cheap; clones share the same store.
#[derive(Clone)]
pub struct DagService {
    store: Arc<dyn BlockStore>,
    config: DagConfig,
}

impl DagService {
    /// Create a service over `store` with the default configuration.
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self::with_config(store, DagConfig::default())
    }

    pub fn with_config(store: Arc<dyn BlockStore>, config: DagConfig) -> Self {
        Self { store, config }
    }

    /// A service over a fresh in-memory store keyed by the configured
    /// hash algorithm.
    pub fn in_memory(config: DagConfig) -> Self {
        let store = InMemoryBlockStore::with_algorithm(config.hash_algorithm);
        Self::with_config(Arc::new(store), config)
    }

    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    /// A new node hashed with the configured algorithm.
    pub fn new_node(&self, payload: impl Into<Vec<u8>>) -> Node {
        Node::new(payload).with_algorithm(self.config.hash_algorithm)
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    /// Encode `node` and store it. Returns the key the store assigned.
    pub async fn add(&self, node: &Node) -> DagResult<Multihash> {
        let bytes = node.encode();
        let key = self.store.put_block(bytes).await?;
        debug!(digest = %key.short_hex(), len = bytes.len(), links = node.links().len(), "added node");
        Ok(key)
    }

    /// Delete the block for `key`. Deleting an absent block succeeds.
    pub async fn remove(&self, key: impl Into<DagKey>) -> DagResult<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(DagError::InvalidKey("empty key".into()));
        }
        let digest = self.parse_key(&key)?;
        self.store.delete_block(&digest).await?;
        debug!(digest = %digest.short_hex(), "removed node");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Fetch and decode the node for `key`.
    pub async fn get(&self, key: impl Into<DagKey>) -> DagResult<Node> {
        let digest = self.parse_key(&key.into())?;
        self.fetch(&digest).await
    }

    /// Fetch several nodes, reporting a result per key.
    ///
    /// Every key is validated first; one malformed key fails the whole call
    /// before any I/O. After that, a missing or corrupt block fails only its
    /// own entry.
    pub async fn get_many<K, I>(&self, keys: I) -> DagResult<HashMap<Multihash, DagResult<Node>>>
    where
        K: Into<DagKey>,
        I: IntoIterator<Item = K>,
    {
        let digests = self.parse_keys(keys)?;
        let blocks = self.store.get_blocks(&digests).await;
        Ok(blocks
            .into_iter()
            .map(|(digest, block)| {
                let node = block
                    .map_err(DagError::from)
                    .and_then(|bytes| Node::decode_with(&bytes, digest.algorithm()));
                (digest, node)
            })
            .collect())
    }

    /// Raw block bytes for `key`, without decoding.
    pub async fn get_block(&self, key: impl Into<DagKey>) -> DagResult<Vec<u8>> {
        let digest = self.parse_key(&key.into())?;
        Ok(self.store.get_block(&digest).await?)
    }

    /// Raw block bytes for several keys, validated like [`get_many`](Self::get_many).
    pub async fn get_blocks<K, I>(&self, keys: I) -> DagResult<HashMap<Multihash, DagResult<Vec<u8>>>>
    where
        K: Into<DagKey>,
        I: IntoIterator<Item = K>,
    {
        let digests = self.parse_keys(keys)?;
        let blocks = self.store.get_blocks(&digests).await;
        Ok(blocks
            .into_iter()
            .map(|(digest, block)| (digest, block.map_err(DagError::from)))
            .collect())
    }

    /// Fetch `root` and every node reachable from it.
    ///
    /// Nodes are fetched depth-first, each distinct digest once. If the root
    /// itself cannot be fetched, its error is returned as is. A failure after
    /// that returns [`DagError::IncompleteRecursiveFetch`] carrying every
    /// node fetched so far.
    pub async fn get_recursive(&self, root: impl Into<DagKey>) -> DagResult<ResolvedDag> {
        let root = self.parse_key(&root.into())?;
        let mut dag = ResolvedDag::new();
        let mut pending = vec![root];

        while let Some(digest) = pending.pop() {
            if dag.contains(&digest) {
                continue;
            }
            let node = match self.fetch(&digest).await {
                Ok(node) => node,
                Err(err) if dag.is_empty() => return Err(err),
                Err(err) => {
                    warn!(digest = %digest.short_hex(), fetched = dag.len(), error = %err, "recursive fetch stalled");
                    return Err(DagError::IncompleteRecursiveFetch {
                        fetched: dag,
                        source: Box::new(err),
                    });
                }
            };
            pending.extend(node.links().iter().map(|l| l.digest().clone()));
            dag.insert(digest, node);
        }

        debug!(count = dag.len(), "recursive fetch complete");
        Ok(dag)
    }

    async fn fetch(&self, digest: &Multihash) -> DagResult<Node> {
        let bytes = self.store.get_block(digest).await?;
        let node = Node::decode_with(&bytes, digest.algorithm())?;
        debug!(digest = %digest.short_hex(), links = node.links().len(), "fetched node");
        Ok(node)
    }

    fn parse_key(&self, key: &DagKey) -> DagResult<Multihash> {
        key.to_multihash(&self.config.namespace)
            .map_err(|e| DagError::InvalidKey(format!("{key}: {e}")))
    }

    fn parse_keys<K, I>(&self, keys: I) -> DagResult<Vec<Multihash>>
    where
        K: Into<DagKey>,
        I: IntoIterator<Item = K>,
    {
        keys.into_iter().map(|k| self.parse_key(&k.into())).collect()
    }
}

impl std::fmt::Debug for DagService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DagService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Resolver for DagService {
    async fn resolve(&self, digest: &Multihash) -> DagResult<Node> {
        self.fetch(digest).await
    }
}
