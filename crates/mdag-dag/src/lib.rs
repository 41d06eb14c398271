//! Content-addressed Merkle DAG.
//!
//! A [`Node`] is an opaque payload plus named [`Link`]s to other nodes. Each
//! node is identified by the digest of its canonical encoding, so any change
//! below a node changes the node's own identity.
//!
//! - [`DagService`] stores, fetches, and recursively resolves nodes against a
//!   [`BlockStore`](mdag_store::BlockStore).
//! - [`Traversal`] walks a graph depth-first or breadth-first, running a
//!   [`Visitor`] in pre- or post-order and never visiting a digest twice.
//! - [`Batch`] and [`BatchSink`] buffer writes and flush them past a byte
//!   threshold.
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), mdag_dag::DagError> {
//! use std::sync::Arc;
//! use mdag_dag::{DagService, Node, Order, Traversal};
//! use mdag_store::InMemoryBlockStore;
//!
//! let dag = DagService::new(Arc::new(InMemoryBlockStore::new()));
//! let leaf = Node::new(b"leaf".to_vec());
//! let mut root = Node::new(b"root".to_vec());
//! root.add_link_to_node("leaf", &leaf);
//! dag.add(&leaf).await?;
//! let key = dag.add(&root).await?;
//!
//! let resolved = dag.get_recursive(&key).await?;
//! let visits = Traversal::from_resolved(resolved, Order::DepthFirst)?
//!     .collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(visits.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod codec;
pub mod config;
pub mod error;
pub mod link;
pub mod node;
pub mod resolved;
pub mod service;
pub mod traversal;

pub use batch::{Batch, BatchSink};
pub use config::{DagConfig, DEFAULT_BATCH_MAX_BYTES, DEFAULT_NAMESPACE};
pub use error::{DagError, DagResult};
pub use link::Link;
pub use node::{Node, NodeView};
pub use resolved::ResolvedDag;
pub use service::DagService;
pub use traversal::{Action, NoVisitor, Order, Resolver, Step, Traversal, Visit, VisitContext, Visitor};

pub use mdag_types::{DagKey, DagPath, HashAlgorithm, Multihash};
