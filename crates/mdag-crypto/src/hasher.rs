use mdag_types::{HashAlgorithm, Multihash};
use sha2::Digest;

/// Algorithm-tagged content hasher.
///
/// Each hasher is bound to one [`HashAlgorithm`]; every digest it returns is
/// a [`Multihash`] carrying that algorithm's code, so digests produced by
/// different hashers never compare equal even over identical bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    /// SHA2-256 hasher, the default for new nodes.
    pub const SHA2_256: Self = Self::new(HashAlgorithm::Sha2_256);
    pub const SHA2_512: Self = Self::new(HashAlgorithm::Sha2_512);
    pub const SHA3_256: Self = Self::new(HashAlgorithm::Sha3_256);
    pub const SHA3_512: Self = Self::new(HashAlgorithm::Sha3_512);
    pub const BLAKE3: Self = Self::new(HashAlgorithm::Blake3);

    /// Create a hasher for the given algorithm.
    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Hash raw bytes and tag the digest with this hasher's algorithm.
    pub fn hash(&self, data: &[u8]) -> Multihash {
        let digest = Self::raw_hash(self.algorithm, data);
        // raw_hash always yields algorithm.digest_len() bytes.
        Multihash::wrap(self.algorithm, &digest).expect("digest length matches algorithm")
    }

    /// Verify that data produces the expected digest.
    ///
    /// The expected digest's own algorithm is used, so a hasher can check
    /// digests produced by any supported function.
    pub fn verify(data: &[u8], expected: &Multihash) -> bool {
        Self::raw_hash(expected.algorithm(), data) == expected.digest()
    }

    /// Untagged digest bytes (for low-level use).
    pub fn raw_hash(algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        match algorithm {
            HashAlgorithm::Sha2_256 => sha2::Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha2_512 => sha2::Sha512::digest(data).to_vec(),
            HashAlgorithm::Sha3_256 => sha3::Sha3_256::digest(data).to_vec(),
            HashAlgorithm::Sha3_512 => sha3::Sha3_512::digest(data).to_vec(),
            HashAlgorithm::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        }
    }

    /// The algorithm used by this hasher.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::SHA2_256
    }
}

impl From<HashAlgorithm> for ContentHasher {
    fn from(algorithm: HashAlgorithm) -> Self {
        Self::new(algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        assert_eq!(ContentHasher::SHA2_256.hash(data), ContentHasher::SHA2_256.hash(data));
    }

    #[test]
    fn sha2_256_known_vector() {
        let mh = ContentHasher::SHA2_256.hash(b"");
        assert_eq!(
            hex::encode(mh.digest()),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(&mh.as_bytes()[..2], &[0x12, 0x20]);
    }

    #[test]
    fn every_algorithm_tags_its_digest() {
        for alg in HashAlgorithm::ALL {
            let mh = ContentHasher::new(alg).hash(b"same content");
            assert_eq!(mh.algorithm(), alg);
            assert_eq!(mh.digest().len(), alg.digest_len());
        }
    }

    #[test]
    fn different_algorithms_produce_different_digests() {
        let data = b"same content";
        let a = ContentHasher::SHA2_256.hash(data);
        let b = ContentHasher::SHA3_256.hash(data);
        let c = ContentHasher::BLAKE3.hash(data);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn verify_correct_data() {
        let id = ContentHasher::BLAKE3.hash(b"test data");
        assert!(ContentHasher::verify(b"test data", &id));
    }

    #[test]
    fn verify_incorrect_data() {
        let id = ContentHasher::SHA2_512.hash(b"original");
        assert!(!ContentHasher::verify(b"tampered", &id));
    }

    #[test]
    fn default_is_sha2_256() {
        assert_eq!(ContentHasher::default().algorithm(), HashAlgorithm::Sha2_256);
    }
}
