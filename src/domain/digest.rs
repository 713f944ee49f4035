//! Digest algorithm domain type and streaming digest computer.
//!
//! The algorithm value chosen here is threaded through both the PKCS#1
//! DigestInfo and the certificate's signature-algorithm field, so the two
//! can never disagree.

use std::fmt;
use std::str::FromStr;

use der::asn1::ObjectIdentifier;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::infra::error::{SigningError, SigningResult};

/// Supported digest algorithms for RSA PKCS#1 v1.5 signatures.
///
/// SHA-1 is retained for interoperability with legacy token deployments
/// only; new certificates should use the default, SHA-256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Digest output length in bytes.
    #[must_use]
    pub const fn digest_size(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// OID of the bare digest algorithm, embedded in the DigestInfo.
    #[must_use]
    pub const fn digest_oid(self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => ObjectIdentifier::new_unwrap("1.3.14.3.2.26"),
            HashAlgorithm::Sha256 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1"),
            HashAlgorithm::Sha384 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2"),
            HashAlgorithm::Sha512 => ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3"),
        }
    }

    /// OID of the `<hash>WithRSAEncryption` signature algorithm, embedded in
    /// the certificate's signature-algorithm fields.
    #[must_use]
    pub const fn signature_oid(self) -> ObjectIdentifier {
        match self {
            HashAlgorithm::Sha1 => ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5"),
            HashAlgorithm::Sha256 => ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11"),
            HashAlgorithm::Sha384 => ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12"),
            HashAlgorithm::Sha512 => ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13"),
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> SigningResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha384" | "sha-384" => Ok(HashAlgorithm::Sha384),
            "sha512" | "sha-512" => Ok(HashAlgorithm::Sha512),
            other => Err(SigningError::InvalidInput(format!(
                "unknown hash algorithm: {other}"
            ))),
        }
    }
}

enum Hasher {
    Sha1(Sha1),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

/// Streaming digest over accumulated input bytes.
///
/// `finish` consumes the computer, so use-after-finish is a compile error
/// rather than a runtime state check. The output is a pure function of the
/// concatenation of all `update` inputs.
pub struct DigestComputer {
    algorithm: HashAlgorithm,
    hasher: Hasher,
}

impl DigestComputer {
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let hasher = match algorithm {
            HashAlgorithm::Sha1 => Hasher::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            HashAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            HashAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        };
        Self { algorithm, hasher }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.hasher {
            Hasher::Sha1(h) => h.update(data),
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    /// Finalize and return the digest, `algorithm().digest_size()` bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        match self.hasher {
            Hasher::Sha1(h) => h.finalize().to_vec(),
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha384(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

impl fmt::Debug for DigestComputer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DigestComputer(algo={:?})", self.algorithm)
    }
}
