//! Orchestration: the signing engine and the certificate builder.

pub mod builder;
pub mod engine;

pub use builder::{CertificateBuilder, CertificateProfile, SignedCertificate};
pub use engine::SigningEngine;
