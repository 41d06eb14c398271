use std::collections::HashMap;

use async_trait::async_trait;
use mdag_types::Multihash;

use crate::error::StoreResult;

/// Content-keyed block store.
///
/// All implementations must satisfy these invariants:
/// - The key returned by `put_block` is derived from the block bytes alone,
///   so the same bytes always land under the same key.
/// - Blocks are immutable once written.
/// - Independent keys may be accessed concurrently; consistency for
///   concurrent writers to the same key is the backend's responsibility.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store a block and return the key derived from its bytes.
    ///
    /// If the block already exists, this is a no-op (idempotent).
    async fn put_block(&self, data: &[u8]) -> StoreResult<Multihash>;

    /// Fetch a block by key.
    ///
    /// Returns `Err(StoreError::NotFound)` if the store has no data for it.
    async fn get_block(&self, key: &Multihash) -> StoreResult<Vec<u8>>;

    /// Delete a block. Succeeds whether or not the key existed.
    async fn delete_block(&self, key: &Multihash) -> StoreResult<()>;

    /// Check whether a block exists.
    async fn has_block(&self, key: &Multihash) -> StoreResult<bool>;

    /// Fetch several blocks, reporting a result per key.
    ///
    /// A missing block fails only its own entry. Default implementation calls
    /// `get_block()` for each key, one at a time; backends may override for
    /// fewer round-trips.
    async fn get_blocks(&self, keys: &[Multihash]) -> HashMap<Multihash, StoreResult<Vec<u8>>> {
        let mut results = HashMap::with_capacity(keys.len());
        for key in keys {
            let block = self.get_block(key).await;
            results.insert(key.clone(), block);
        }
        results
    }
}
