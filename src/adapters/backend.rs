//! Token signing boundary.
//!
//! The engine and builder only see this trait, never PKCS#11 types, so
//! they can be exercised against a software stub without hardware.

use crate::infra::error::SigningResult;

/// Raw RSA signing capability exposed by a token session.
///
/// Implementations apply the private-key transform to an already-padded
/// block (PKCS#11 mechanism CKM_RSA_X_509); all padding happens on the
/// host. The session is exclusively owned by the calling thread for the
/// duration of one signing operation; implementations perform no internal
/// locking.
pub trait RawRsaSigner {
    /// Opaque reference to a private key living inside the token. Key
    /// material is never exposed to the host process.
    type KeyHandle;

    /// Whether the token advertises the raw RSA mechanism with the sign
    /// flag set. Checked again at engine construction even though the
    /// caller is expected to have probed it already.
    fn supports_raw_rsa_sign(&self) -> SigningResult<bool>;

    /// RSA modulus length in bytes for the referenced key.
    fn modulus_len(&self, key: &Self::KeyHandle) -> SigningResult<usize>;

    /// Apply the raw private-key transform to `padded`, which must be
    /// exactly `modulus_len` bytes. Returns the signature, also
    /// `modulus_len` bytes, big-endian, with no further encoding.
    ///
    /// May block on device I/O. A failure leaves the token in an unknown
    /// state; callers must not blindly retry.
    fn sign_raw(&self, key: &Self::KeyHandle, padded: &[u8]) -> SigningResult<Vec<u8>>;
}
