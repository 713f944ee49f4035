//! Error types for token-backed certificate issuance.

use thiserror::Error;

/// Result type for signing and certificate-building operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Error taxonomy for the certificate issuance workflow.
///
/// Every variant is fatal for the build in progress: no partial certificate
/// is ever returned. Whether to re-authenticate and retry from a fresh
/// `initialize_sign` is the caller's decision.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SigningError {
    /// The DER-encoded DigestInfo plus the minimum PKCS#1 v1.5 padding
    /// overhead does not fit into the RSA modulus.
    #[error("DigestInfo too large for modulus: need {needed} bytes, modulus holds {capacity}")]
    EncodingTooLarge { needed: usize, capacity: usize },

    #[error("signing engine called out of sequence: {0}")]
    InvalidState(&'static str),

    #[error("token lacks required capability: {0}")]
    UnsupportedMechanism(String),

    /// The token rejected or failed the raw RSA operation. Not retried
    /// automatically; token state after a failed sign is unknown.
    #[error("token signing failed: {0}")]
    SigningFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid certificate subject: {0}")]
    InvalidSubject(String),

    #[error("invalid validity window: notBefore is after notAfter")]
    InvalidValidity,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1(String),

    #[error("PKCS#11 token error: {0}")]
    Token(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<der::Error> for SigningError {
    fn from(error: der::Error) -> Self {
        SigningError::Asn1(error.to_string())
    }
}

impl From<cryptoki::error::Error> for SigningError {
    fn from(error: cryptoki::error::Error) -> Self {
        SigningError::Token(error.to_string())
    }
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::Io(error.to_string())
    }
}
