//! RSA public key material recovered from the token.

use std::fmt;

use crate::infra::error::{SigningError, SigningResult};

/// Big-endian unsigned RSA public key components, as read from the token's
/// CKA_MODULUS and CKA_PUBLIC_EXPONENT attributes.
///
/// Only public material; the private key never leaves the token.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPublicKeyParts {
    modulus: Vec<u8>,
    exponent: Vec<u8>,
}

impl RsaPublicKeyParts {
    /// Normalizes both components by stripping leading zero bytes, so
    /// `modulus_len` reflects the actual modulus size.
    pub fn new(modulus: Vec<u8>, exponent: Vec<u8>) -> SigningResult<Self> {
        let modulus = strip_leading_zeros(modulus);
        let exponent = strip_leading_zeros(exponent);
        if modulus.is_empty() {
            return Err(SigningError::InvalidInput(
                "RSA modulus is zero or empty".to_string(),
            ));
        }
        if exponent.is_empty() {
            return Err(SigningError::InvalidInput(
                "RSA public exponent is zero or empty".to_string(),
            ));
        }
        Ok(Self { modulus, exponent })
    }

    #[must_use]
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    #[must_use]
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Modulus size in bytes; the width of every raw RSA input and output.
    #[must_use]
    pub fn modulus_len(&self) -> usize {
        self.modulus.len()
    }
}

impl fmt::Debug for RsaPublicKeyParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RsaPublicKeyParts(modulus_len={}, exponent_len={})",
            self.modulus.len(),
            self.exponent.len()
        )
    }
}

fn strip_leading_zeros(mut bytes: Vec<u8>) -> Vec<u8> {
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    bytes.drain(..first_nonzero);
    bytes
}
