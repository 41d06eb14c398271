use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid base58 string: {0}")]
    InvalidBase58(String),

    #[error("malformed digest: {0}")]
    MalformedDigest(String),

    #[error("unknown hash function: {0}")]
    UnknownHashFunction(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("namespace mismatch: expected /{expected}/, got /{actual}/")]
    NamespaceMismatch { expected: String, actual: String },
}
