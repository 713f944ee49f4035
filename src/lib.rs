//! Self-signed X.509 certificate issuance backed by a PKCS#11 token.
//!
//! The private key never leaves the token. The certificate's to-be-signed
//! bytes are hashed on the host, wrapped into an EMSA-PKCS1-v1_5 block of
//! the modulus width, and pushed through the token's raw RSA mechanism
//! (CKM_RSA_X_509). The signing engine presents the familiar
//! initialize/update/sign protocol on top of that raw operation.
//!
//! Layers:
//! - [`domain`]: digest algorithms, PKCS#1 encoding, key material
//! - [`adapters`]: the [`RawRsaSigner`] boundary and its `cryptoki` backend
//! - [`services`]: the signing engine and the certificate builder
//! - [`infra`]: the error taxonomy

pub mod adapters;
pub mod domain;
pub mod infra;
pub mod services;

pub use adapters::backend::RawRsaSigner;
pub use adapters::pkcs11::TokenSession;
pub use domain::digest::{DigestComputer, HashAlgorithm};
pub use domain::keys::RsaPublicKeyParts;
pub use infra::error::{SigningError, SigningResult};
pub use services::builder::{CertificateBuilder, CertificateProfile, SignedCertificate};
pub use services::engine::SigningEngine;
