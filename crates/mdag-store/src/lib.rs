//! Block storage boundary for the Merkle DAG.
//!
//! A block store is a content-keyed byte store: callers hand it encoded node
//! bytes and get back the key (a [`Multihash`](mdag_types::Multihash)) the
//! store derived from them. The store never interprets block contents.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlockStore`] trait:
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Blocks are immutable once written (content-addressing guarantees this).
//! 2. `put_block` is idempotent: writing the same bytes twice is a no-op.
//! 3. `delete_block` is idempotent: deleting a missing key succeeds.
//! 4. Concurrent access to independent keys is always safe.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlockStore;
pub use traits::BlockStore;
