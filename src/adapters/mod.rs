//! Token adapters: the signing trait boundary and its PKCS#11 backend.

pub mod backend;
pub mod pkcs11;

pub use backend::RawRsaSigner;
pub use pkcs11::TokenSession;
