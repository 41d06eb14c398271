//! Error types for the Merkle DAG.

use mdag_store::StoreError;
use mdag_types::{Multihash, TypeError};

use crate::resolved::ResolvedDag;

/// Errors that can occur during DAG operations.
#[derive(Debug, thiserror::Error)]
pub enum DagError {
    /// A key or path was malformed; detected before any I/O.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Bytes that do not match the canonical node encoding.
    #[error("corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// An ill-formed hash value was supplied for a link.
    #[error("malformed digest: {0}")]
    MalformedDigest(String),

    /// A hash algorithm identifier that is not supported.
    #[error("unknown hash function: {0}")]
    UnknownHashFunction(String),

    /// The block store has no data for the key.
    #[error("node not found: {0}")]
    NotFound(Multihash),

    /// A recursive fetch stalled after fetching at least one node.
    ///
    /// `fetched` holds every node resolved before the failure.
    #[error("could not complete the recursive fetch after {} nodes", .fetched.len())]
    IncompleteRecursiveFetch {
        /// Nodes resolved before the failure, in discovery order.
        fetched: ResolvedDag,
        /// The error that stopped the fetch.
        source: Box<DagError>,
    },

    /// A traversal hit an unresolved link and had no resolver to fetch it.
    #[error("no resolver available for unresolved link {0}")]
    MissingResolver(Multihash),

    /// A traversal was started over an empty resolved graph.
    #[error("cannot traverse an empty graph")]
    EmptyGraph,

    /// The background batch writer stopped before the batch was finished.
    #[error("batch writer closed: {0}")]
    BatchClosed(String),

    /// Serialization of an inspection view failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Block store failure other than a missing block.
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for DagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound(key),
            other => Self::Store(other),
        }
    }
}

impl From<TypeError> for DagError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::MalformedDigest(reason) => Self::MalformedDigest(reason),
            TypeError::UnknownHashFunction(name) => Self::UnknownHashFunction(name),
            other => Self::InvalidKey(other.to_string()),
        }
    }
}

impl DagError {
    /// Returns `true` for errors caused by bad input rather than I/O.
    ///
    /// These are never retried; they surface straight to the caller.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey(_)
                | Self::CorruptEncoding(_)
                | Self::MalformedDigest(_)
                | Self::UnknownHashFunction(_)
        )
    }

    /// The partial result carried by an incomplete recursive fetch.
    pub fn partial_result(&self) -> Option<&ResolvedDag> {
        match self {
            Self::IncompleteRecursiveFetch { fetched, .. } => Some(fetched),
            _ => None,
        }
    }
}

/// Convenience alias for DAG results.
pub type DagResult<T> = Result<T, DagError>;
