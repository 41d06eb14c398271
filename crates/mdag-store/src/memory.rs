use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use mdag_crypto::ContentHasher;
use mdag_types::{HashAlgorithm, Multihash};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::traits::BlockStore;

/// In-memory, HashMap-based block store.
///
/// Intended for tests and embedding. All blocks are held in memory behind a
/// `RwLock` for safe concurrent access. Keys are derived with the store's
/// configured hash algorithm.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<Multihash, Vec<u8>>>,
    hasher: ContentHasher,
}

impl InMemoryBlockStore {
    /// Create a new empty store keyed by SHA2-256.
    pub fn new() -> Self {
        Self::with_algorithm(HashAlgorithm::default())
    }

    /// Create a new empty store deriving keys with `algorithm`.
    pub fn with_algorithm(algorithm: HashAlgorithm) -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            hasher: ContentHasher::new(algorithm),
        }
    }

    /// The algorithm used to derive block keys.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.hasher.algorithm()
    }

    /// Number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn put_block(&self, data: &[u8]) -> StoreResult<Multihash> {
        let key = self.hasher.hash(data);
        let mut map = self.blocks.write().expect("lock poisoned");
        if !map.contains_key(&key) {
            debug!(key = %key.short_hex(), len = data.len(), "stored block");
            map.insert(key.clone(), data.to_vec());
        }
        Ok(key)
    }

    async fn get_block(&self, key: &Multihash) -> StoreResult<Vec<u8>> {
        let map = self.blocks.read().expect("lock poisoned");
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn delete_block(&self, key: &Multihash) -> StoreResult<()> {
        let mut map = self.blocks.write().expect("lock poisoned");
        map.remove(key);
        Ok(())
    }

    async fn has_block(&self, key: &Multihash) -> StoreResult<bool> {
        let map = self.blocks.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &self.len())
            .field("algorithm", &self.algorithm())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Core put / get
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_and_get_block() {
        let store = InMemoryBlockStore::new();
        let key = store.put_block(b"hello world").await.unwrap();
        assert_eq!(key.algorithm(), HashAlgorithm::Sha2_256);

        let data = store.get_block(&key).await.unwrap();
        assert_eq!(data, b"hello world");
    }

    #[tokio::test]
    async fn key_is_content_digest() {
        let store = InMemoryBlockStore::with_algorithm(HashAlgorithm::Blake3);
        let key = store.put_block(b"content").await.unwrap();
        assert_eq!(key, ContentHasher::BLAKE3.hash(b"content"));
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryBlockStore::new();
        let key = ContentHasher::SHA2_256.hash(b"missing");
        let err = store.get_block(&key).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(k) if k == key));
    }

    // -----------------------------------------------------------------------
    // Idempotency
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn put_is_idempotent() {
        let store = InMemoryBlockStore::new();
        let k1 = store.put_block(b"same").await.unwrap();
        let k2 = store.put_block(b"same").await.unwrap();
        assert_eq!(k1, k2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryBlockStore::new();
        let key = store.put_block(b"to-delete").await.unwrap();
        store.delete_block(&key).await.unwrap();
        assert!(!store.has_block(&key).await.unwrap());
        store.delete_block(&key).await.unwrap();
    }

    // -----------------------------------------------------------------------
    // Batch reads
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_blocks_reports_per_key() {
        let store = InMemoryBlockStore::new();
        let present = store.put_block(b"exists").await.unwrap();
        let missing = ContentHasher::SHA2_256.hash(b"missing");

        let results = store.get_blocks(&[present.clone(), missing.clone()]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[&present].as_ref().unwrap(), b"exists");
        assert!(matches!(results[&missing], Err(StoreError::NotFound(_))));
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn len_and_is_empty() {
        let store = InMemoryBlockStore::new();
        assert!(store.is_empty());
        store.put_block(b"12345").await.unwrap();
        store.put_block(b"123456789").await.unwrap();
        store.put_block(b"12345").await.unwrap();
        assert_eq!(store.len(), 2);
        assert!(!store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_reads_are_safe() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryBlockStore::new());
        let key = store.put_block(b"shared data").await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let key = key.clone();
                tokio::spawn(async move {
                    let data = store.get_block(&key).await.unwrap();
                    assert!(ContentHasher::verify(&data, &key));
                })
            })
            .collect();

        for h in handles {
            h.await.expect("task should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryBlockStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryBlockStore"));
        assert!(debug.contains("block_count"));
    }
}
