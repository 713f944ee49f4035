//! Pure domain types: digest algorithms, PKCS#1 encoding, key material.
//!
//! Nothing in this layer touches the token or performs I/O.

pub mod digest;
pub mod keys;
pub mod pkcs1;

pub use digest::{DigestComputer, HashAlgorithm};
pub use keys::RsaPublicKeyParts;
