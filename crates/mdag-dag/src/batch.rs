//! Buffered node writes.
//!
//! A [`Batch`] collects nodes and writes them to the [`DagService`] in one
//! go, either when its pending bytes pass a threshold or on an explicit
//! [`Batch::commit`]. [`BatchSink`] feeds a batch from a channel on a
//! background task and commits once every sender is gone.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{DagError, DagResult};
use crate::node::Node;
use crate::service::DagService;

/// Pending node writes with a byte threshold.
pub struct Batch {
    service: DagService,
    pending: Vec<(Node, usize)>,
    pending_bytes: usize,
    max_bytes: usize,
}

impl Batch {
    /// A batch using the service's configured threshold.
    pub fn new(service: DagService) -> Self {
        let max_bytes = service.config().batch_max_bytes;
        Self::with_max_bytes(service, max_bytes)
    }

    pub fn with_max_bytes(service: DagService, max_bytes: usize) -> Self {
        Self {
            service,
            pending: Vec::new(),
            pending_bytes: 0,
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Number of nodes waiting to be written.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Encoded bytes waiting to be written.
    pub fn pending_bytes(&self) -> usize {
        self.pending_bytes
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue `node`. Commits everything pending, `node` included, once the
    /// pending bytes exceed the threshold.
    ///
    /// Returns how many nodes were written by that commit (0 if none ran).
    pub async fn add(&mut self, node: Node) -> DagResult<usize> {
        let size = node.encode().len();
        self.pending.push((node, size));
        self.pending_bytes += size;
        if self.pending_bytes > self.max_bytes {
            debug!(count = self.pending.len(), bytes = self.pending_bytes, "batch threshold exceeded");
            return self.commit().await;
        }
        Ok(0)
    }

    /// Write every pending node, in insertion order.
    ///
    /// The pending list is cleared first. If a write fails, the error is
    /// returned and the nodes after it are dropped unwritten.
    pub async fn commit(&mut self) -> DagResult<usize> {
        let pending = std::mem::take(&mut self.pending);
        let bytes = std::mem::take(&mut self.pending_bytes);
        let total = pending.len();

        for (index, (node, _)) in pending.into_iter().enumerate() {
            if let Err(err) = self.service.add(&node).await {
                warn!(
                    written = index,
                    abandoned = total - index,
                    error = %err,
                    "batch commit failed"
                );
                return Err(err);
            }
        }

        debug!(count = total, bytes, "batch committed");
        Ok(total)
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(count = self.pending.len(), "batch dropped with uncommitted nodes");
        }
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("pending", &self.pending.len())
            .field("pending_bytes", &self.pending_bytes)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

/// A channel-fed [`Batch`] running on a background task.
///
/// Nodes sent with [`BatchSink::write`] are added to the batch in order.
/// [`BatchSink::finish`] closes the channel, commits what is left, and
/// reports the total number of nodes written.
pub struct BatchSink {
    sender: mpsc::Sender<Node>,
    task: JoinHandle<DagResult<usize>>,
}

impl BatchSink {
    /// Spawn the background task. `capacity` bounds the channel.
    pub fn spawn(mut batch: Batch, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel(capacity.max(1));
        let task = tokio::spawn(async move {
            let mut written = 0;
            while let Some(node) = receiver.recv().await {
                written += batch.add(node).await?;
            }
            written += batch.commit().await?;
            Ok(written)
        });
        Self { sender, task }
    }

    /// Queue `node`. Fails if the background task already stopped on an
    /// error; [`finish`](Self::finish) reports that error.
    pub async fn write(&self, node: Node) -> DagResult<()> {
        self.sender
            .send(node)
            .await
            .map_err(|_| DagError::BatchClosed("writer task stopped".into()))
    }

    /// Close the channel and wait for the final commit.
    pub async fn finish(self) -> DagResult<usize> {
        drop(self.sender);
        self.task
            .await
            .map_err(|e| DagError::BatchClosed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use mdag_store::{BlockStore, InMemoryBlockStore, StoreError, StoreResult};
    use mdag_types::Multihash;

    use super::*;

    fn service() -> (DagService, Arc<InMemoryBlockStore>) {
        let store = Arc::new(InMemoryBlockStore::new());
        (DagService::new(store.clone()), store)
    }

    fn nodes(count: usize) -> Vec<Node> {
        (0..count).map(|i| Node::new(format!("node {i:03}").into_bytes())).collect()
    }

    #[tokio::test]
    async fn explicit_commit_writes_everything() {
        let (dag, store) = service();
        let mut batch = Batch::new(dag.clone());
        let nodes = nodes(3);
        for node in &nodes {
            assert_eq!(batch.add(node.clone()).await.unwrap(), 0);
        }
        assert_eq!(batch.pending_len(), 3);
        assert!(store.is_empty());

        assert_eq!(batch.commit().await.unwrap(), 3);
        assert!(batch.is_empty());
        assert_eq!(batch.pending_bytes(), 0);
        for node in &nodes {
            assert_eq!(dag.get(&node.digest()).await.unwrap(), *node);
        }
    }

    #[tokio::test]
    async fn threshold_triggers_implicit_commit() {
        let (dag, store) = service();
        let nodes = nodes(4);
        let each = nodes[0].encode().len();
        // Crossed on the third node, not before.
        let mut batch = Batch::with_max_bytes(dag.clone(), each * 2);

        assert_eq!(batch.add(nodes[0].clone()).await.unwrap(), 0);
        assert_eq!(batch.add(nodes[1].clone()).await.unwrap(), 0);
        assert_eq!(batch.add(nodes[2].clone()).await.unwrap(), 3);
        assert!(batch.is_empty());
        assert_eq!(store.len(), 3);

        assert_eq!(batch.add(nodes[3].clone()).await.unwrap(), 0);
        assert_eq!(batch.commit().await.unwrap(), 1);
        assert_eq!(batch.commit().await.unwrap(), 0);
        for node in &nodes {
            assert!(dag.get(&node.digest()).await.is_ok());
        }
    }

    #[tokio::test]
    async fn threshold_is_strictly_greater() {
        let (dag, _) = service();
        let nodes = nodes(2);
        let each = nodes[0].encode().len();
        let mut batch = Batch::with_max_bytes(dag, each * 2);
        batch.add(nodes[0].clone()).await.unwrap();
        assert_eq!(batch.add(nodes[1].clone()).await.unwrap(), 0);
        assert_eq!(batch.pending_bytes(), each * 2);
        batch.commit().await.unwrap();
    }

    #[tokio::test]
    async fn default_threshold_comes_from_config() {
        let (dag, _) = service();
        let batch = Batch::new(dag);
        assert_eq!(batch.max_bytes(), crate::DEFAULT_BATCH_MAX_BYTES);
    }

    /// Store that accepts a fixed number of writes, then fails.
    struct FailAfter {
        inner: InMemoryBlockStore,
        remaining: std::sync::Mutex<usize>,
    }

    #[async_trait]
    impl BlockStore for FailAfter {
        async fn put_block(&self, data: &[u8]) -> StoreResult<Multihash> {
            {
                let mut remaining = self.remaining.lock().expect("lock poisoned");
                if *remaining == 0 {
                    return Err(StoreError::Backend("quota exceeded".into()));
                }
                *remaining -= 1;
            }
            self.inner.put_block(data).await
        }
        async fn get_block(&self, key: &Multihash) -> StoreResult<Vec<u8>> {
            self.inner.get_block(key).await
        }
        async fn delete_block(&self, key: &Multihash) -> StoreResult<()> {
            self.inner.delete_block(key).await
        }
        async fn has_block(&self, key: &Multihash) -> StoreResult<bool> {
            self.inner.has_block(key).await
        }
        async fn get_blocks(&self, keys: &[Multihash]) -> HashMap<Multihash, StoreResult<Vec<u8>>> {
            self.inner.get_blocks(keys).await
        }
    }

    #[tokio::test]
    async fn failed_write_abandons_the_rest() {
        let store = Arc::new(FailAfter {
            inner: InMemoryBlockStore::new(),
            remaining: std::sync::Mutex::new(1),
        });
        let dag = DagService::new(store.clone());
        let mut batch = Batch::with_max_bytes(dag.clone(), usize::MAX);
        let nodes = nodes(3);
        for node in &nodes {
            batch.add(node.clone()).await.unwrap();
        }

        let err = batch.commit().await.unwrap_err();
        assert!(matches!(err, DagError::Store(StoreError::Backend(_))));
        assert!(batch.is_empty());
        assert_eq!(store.inner.len(), 1);
        assert!(dag.get(&nodes[0].digest()).await.is_ok());
        assert!(matches!(dag.get(&nodes[2].digest()).await, Err(DagError::NotFound(_))));
    }

    #[tokio::test]
    async fn sink_commits_on_finish() {
        let (dag, store) = service();
        let sink = BatchSink::spawn(Batch::new(dag.clone()), 4);
        let nodes = nodes(10);
        for node in &nodes {
            sink.write(node.clone()).await.unwrap();
        }
        assert_eq!(sink.finish().await.unwrap(), 10);
        assert_eq!(store.len(), 10);
        for node in &nodes {
            assert_eq!(dag.get(&node.digest()).await.unwrap(), *node);
        }
    }

    #[tokio::test]
    async fn sink_counts_implicit_commits() {
        let (dag, store) = service();
        let nodes = nodes(5);
        let each = nodes[0].encode().len();
        let sink = BatchSink::spawn(Batch::with_max_bytes(dag, each), 1);
        for node in nodes {
            sink.write(node).await.unwrap();
        }
        assert_eq!(sink.finish().await.unwrap(), 5);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn sink_reports_store_failure() {
        let store = Arc::new(FailAfter {
            inner: InMemoryBlockStore::new(),
            remaining: std::sync::Mutex::new(0),
        });
        let sink = BatchSink::spawn(Batch::new(DagService::new(store)), 8);
        sink.write(Node::new(b"doomed".to_vec())).await.unwrap();
        let err = sink.finish().await.unwrap_err();
        assert!(matches!(err, DagError::Store(_)));
    }
}
