//! Foundation types for the Merkle DAG.
//!
//! This crate provides the addressing types shared by every other crate in
//! the workspace: the self-describing digest that names a block, the table
//! of supported hash algorithms, and the key forms accepted when fetching.
//!
//! # Key Types
//!
//! - [`Multihash`] -- Digest tagged with its hash algorithm (`code ‖ len ‖ bytes`)
//! - [`HashAlgorithm`] -- Supported hash functions and their multihash codes
//! - [`DagKey`] -- Anything a caller may pass to look up a node
//! - [`DagPath`] -- `/<namespace>/<multihash>` path addressing

pub mod algorithm;
pub mod error;
pub mod key;
pub mod multihash;
pub mod varint;

pub use algorithm::HashAlgorithm;
pub use error::TypeError;
pub use key::{DagKey, DagPath};
pub use multihash::Multihash;
