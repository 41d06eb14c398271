//! Hash primitives for the Merkle DAG.
//!
//! Provides algorithm-tagged content hashing over the algorithms listed in
//! [`HashAlgorithm`](mdag_types::HashAlgorithm). Every digest comes back as a
//! [`Multihash`](mdag_types::Multihash) so it can be stored in links and used
//! as a block key without further wrapping.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::ContentHasher;
