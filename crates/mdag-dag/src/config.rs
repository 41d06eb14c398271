use std::path::Path;

use mdag_types::HashAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};

/// Default flush threshold for [`Batch`](crate::Batch): 8 MiB of encoded nodes.
pub const DEFAULT_BATCH_MAX_BYTES: usize = 8 * 1024 * 1024;

/// Default namespace prefix accepted in `/<namespace>/<digest>` paths.
pub const DEFAULT_NAMESPACE: &str = "ipfs";

/// Configuration for a [`DagService`](crate::DagService).
///
/// Every field has a default, so a TOML document only needs to name the
/// values it changes:
///
/// ```toml
/// hash_algorithm = "blake3"
/// batch_max_bytes = 1048576
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Hash function for nodes created through the service.
    pub hash_algorithm: HashAlgorithm,
    /// Namespace segment that path keys must carry.
    pub namespace: String,
    /// Pending encoded bytes above which a batch commits on its own.
    pub batch_max_bytes: usize,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            batch_max_bytes: DEFAULT_BATCH_MAX_BYTES,
        }
    }
}

impl DagConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> DagResult<Self> {
        toml::from_str(text).map_err(|e| DagError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> DagResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DagError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> DagResult<String> {
        toml::to_string(self).map_err(|e| DagError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DagConfig::default();
        assert_eq!(config.hash_algorithm, HashAlgorithm::Sha2_256);
        assert_eq!(config.namespace, "ipfs");
        assert_eq!(config.batch_max_bytes, 8 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = DagConfig::from_toml_str("hash_algorithm = \"blake3\"").unwrap();
        assert_eq!(config.hash_algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.batch_max_bytes, DEFAULT_BATCH_MAX_BYTES);
    }

    #[test]
    fn toml_roundtrip() {
        let config = DagConfig {
            hash_algorithm: HashAlgorithm::Sha3_512,
            namespace: "dag".into(),
            batch_max_bytes: 4096,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(DagConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let err = DagConfig::from_toml_str("hash_algorithm = \"md5\"").unwrap_err();
        assert!(matches!(err, DagError::Config(_)));
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = DagConfig::load("/nonexistent/mdag.toml").unwrap_err();
        assert!(matches!(err, DagError::Config(_)));
    }
}
