//! Digest-then-sign adapter over the raw RSA token operation.
//!
//! Presents the conventional initialize/update/sign protocol while the
//! actual RSA transform runs inside the token: the accumulated input is
//! hashed on the host, wrapped in an EMSA-PKCS1-v1_5 block of the modulus
//! width, and handed to the token's raw mechanism.

use crate::adapters::backend::RawRsaSigner;
use crate::domain::digest::{DigestComputer, HashAlgorithm};
use crate::domain::pkcs1;
use crate::infra::error::{SigningError, SigningResult};

enum Phase<K> {
    Uninitialized,
    Accumulating { key: K, digest: DigestComputer },
    Done,
}

/// Three-phase signing engine bound to one token session.
///
/// Phases: Uninitialized -> Accumulating -> Done. `sign` reaches Done on
/// success and failure alike; a fresh `initialize_sign` is required for
/// another operation. The engine performs no internal locking and assumes
/// exclusive access to the session for the whole cycle.
pub struct SigningEngine<'a, S: RawRsaSigner> {
    signer: &'a S,
    algorithm: HashAlgorithm,
    phase: Phase<S::KeyHandle>,
}

impl<'a, S: RawRsaSigner> core::fmt::Debug for SigningEngine<'a, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let phase = match self.phase {
            Phase::Uninitialized => "Uninitialized",
            Phase::Accumulating { .. } => "Accumulating",
            Phase::Done => "Done",
        };
        f.debug_struct("SigningEngine")
            .field("algorithm", &self.algorithm)
            .field("phase", &phase)
            .finish_non_exhaustive()
    }
}

impl<'a, S: RawRsaSigner> SigningEngine<'a, S> {
    /// Bind an engine to a token session, re-verifying that the token
    /// advertises raw RSA signing even if the caller already probed it.
    pub fn new(signer: &'a S, algorithm: HashAlgorithm) -> SigningResult<Self> {
        if !signer.supports_raw_rsa_sign()? {
            return Err(SigningError::UnsupportedMechanism(
                "token does not advertise raw RSA with the sign flag".to_string(),
            ));
        }
        Ok(Self {
            signer,
            algorithm,
            phase: Phase::Uninitialized,
        })
    }

    /// The digest algorithm this engine pads with. The certificate's
    /// signature-algorithm field must be derived from the same value.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Bind a key handle for one signing operation and start a fresh
    /// digest. Valid from Uninitialized, or from Done when the caller
    /// retries a whole operation from scratch.
    pub fn initialize_sign(&mut self, key: S::KeyHandle) -> SigningResult<()> {
        match self.phase {
            Phase::Uninitialized | Phase::Done => {
                self.phase = Phase::Accumulating {
                    key,
                    digest: DigestComputer::new(self.algorithm),
                };
                Ok(())
            }
            Phase::Accumulating { .. } => Err(SigningError::InvalidState(
                "initialize_sign while a signing operation is in progress",
            )),
        }
    }

    /// Accumulate data to be signed. Multiple calls are equivalent to one
    /// call over the concatenation.
    pub fn update(&mut self, data: &[u8]) -> SigningResult<()> {
        match &mut self.phase {
            Phase::Accumulating { digest, .. } => {
                digest.update(data);
                Ok(())
            }
            Phase::Uninitialized => Err(SigningError::InvalidState(
                "update before initialize_sign",
            )),
            Phase::Done => Err(SigningError::InvalidState("update after sign")),
        }
    }

    /// Finalize the digest, pad it, and run the token's raw RSA transform.
    ///
    /// Returns the signature unmodified: exactly `modulus_len` bytes,
    /// big-endian. May block on device I/O. Device failures surface as
    /// `SigningFailed` with the cause attached and are not retried here;
    /// the token may require PIN re-entry first.
    pub fn sign(&mut self) -> SigningResult<Vec<u8>> {
        // Done is reached whether or not the token call succeeds.
        let phase = std::mem::replace(&mut self.phase, Phase::Done);
        let (key, digest) = match phase {
            Phase::Accumulating { key, digest } => (key, digest),
            Phase::Uninitialized => {
                return Err(SigningError::InvalidState("sign before initialize_sign"))
            }
            Phase::Done => return Err(SigningError::InvalidState("sign called twice")),
        };

        let digest = digest.finish();
        let modulus_len = self.signer.modulus_len(&key)?;
        let padded = pkcs1::encode_emsa_pkcs1_v15(self.algorithm, &digest, modulus_len)?;

        log::debug!(
            "submitting {}-byte padded block to token ({} digest)",
            padded.len(),
            self.algorithm
        );
        let signature = self
            .signer
            .sign_raw(&key, &padded)
            .map_err(|e| SigningError::SigningFailed(Box::new(e)))?;

        if signature.len() != modulus_len {
            return Err(SigningError::SigningFailed(
                format!(
                    "token returned {} signature bytes, expected {modulus_len}",
                    signature.len()
                )
                .into(),
            ));
        }
        Ok(signature)
    }
}
