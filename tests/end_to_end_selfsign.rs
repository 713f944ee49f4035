//! End-to-end issuance against a software token, verified independently.

mod common;

use std::time::{Duration, SystemTime};

use der::{Decode, Encode};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::sha2::{Digest, Sha256};
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use x509_cert::Certificate;

use pkcs11_selfsign::domain::pkcs1;
use pkcs11_selfsign::{
    CertificateBuilder, CertificateProfile, HashAlgorithm, SigningEngine,
};

use common::TextbookRsaSigner;

const NOT_BEFORE_UNIX: u64 = 1_700_000_000;
const THREE_YEARS: u64 = 3 * 365 * 24 * 60 * 60;

fn fixed_profile() -> CertificateProfile {
    let not_before = SystemTime::UNIX_EPOCH + Duration::from_secs(NOT_BEFORE_UNIX);
    CertificateProfile::new("CN=Test", 1, not_before, not_before + Duration::from_secs(THREE_YEARS))
}

fn issue() -> (TextbookRsaSigner, Vec<u8>) {
    let signer = TextbookRsaSigner::from_test_key();
    let public_key = signer.public_key_parts();
    let mut engine = SigningEngine::new(&signer, HashAlgorithm::Sha256).unwrap();
    let certificate =
        CertificateBuilder::build(&fixed_profile(), &public_key, &mut engine, ()).unwrap();
    let der = certificate.into_der();
    (signer, der)
}

#[test]
fn signature_verifies_against_embedded_public_key() {
    let (_, der) = issue();
    let parsed = Certificate::from_der(&der).expect("well-formed DER certificate");

    // The public key embedded in the certificate is the verification key.
    let spki_bits = parsed
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_bytes()
        .expect("no unused bits");
    let public_key = RsaPublicKey::from_pkcs1_der(spki_bits).expect("RSAPublicKey in SPKI");

    // Re-encoding the parsed TBS must reproduce the exact signed bytes.
    let tbs_der = parsed.tbs_certificate.to_der().unwrap();
    let digest = Sha256::digest(&tbs_der);

    let signature = parsed.signature.as_bytes().expect("no unused bits");
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .expect("signature must verify against the certificate's own TBS bytes");
}

#[test]
fn raw_public_transform_recovers_padded_block() {
    let (signer, der) = issue();
    let parsed = Certificate::from_der(&der).unwrap();
    let tbs_der = parsed.tbs_certificate.to_der().unwrap();
    let signature = parsed.signature.as_bytes().unwrap();

    // sig^e mod n must equal the deterministic EMSA-PKCS1-v1_5 block.
    let recovered = signer.apply_public(signature);
    let digest = Sha256::digest(&tbs_der);
    let expected =
        pkcs1::encode_emsa_pkcs1_v15(HashAlgorithm::Sha256, &digest, recovered.len()).unwrap();
    assert_eq!(recovered, expected);
}

#[test]
fn tampered_tbs_byte_fails_verification() {
    let (_, der) = issue();
    let parsed = Certificate::from_der(&der).unwrap();

    let spki_bits = parsed
        .tbs_certificate
        .subject_public_key_info
        .subject_public_key
        .as_bytes()
        .unwrap();
    let public_key = RsaPublicKey::from_pkcs1_der(spki_bits).unwrap();

    let mut tbs_der = parsed.tbs_certificate.to_der().unwrap();
    let flip = tbs_der.len() / 2;
    tbs_der[flip] ^= 0x01;

    let digest = Sha256::digest(&tbs_der);
    let signature = parsed.signature.as_bytes().unwrap();
    assert!(public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .is_err());
}

#[test]
fn certificate_is_self_signed_with_requested_fields() {
    let (_, der) = issue();
    let parsed = Certificate::from_der(&der).unwrap();
    let tbs = &parsed.tbs_certificate;

    assert_eq!(tbs.issuer, tbs.subject);
    assert_eq!(tbs.subject.to_string(), "CN=Test");
    assert_eq!(tbs.serial_number.as_bytes(), &[1]);

    // sha256WithRSAEncryption in both algorithm fields, matching the digest
    // the padding was built with.
    let expected_oid = HashAlgorithm::Sha256.signature_oid();
    assert_eq!(tbs.signature.oid, expected_oid);
    assert_eq!(parsed.signature_algorithm.oid, expected_oid);

    let extensions = tbs.extensions.as_ref().expect("extensions present");
    assert_eq!(extensions.len(), 3);

    assert_eq!(unix_secs(&tbs.validity.not_before), NOT_BEFORE_UNIX);
    assert_eq!(unix_secs(&tbs.validity.not_after), NOT_BEFORE_UNIX + THREE_YEARS);
}

fn unix_secs(time: &x509_cert::time::Time) -> u64 {
    use x509_cert::time::Time;
    match time {
        Time::UtcTime(t) => t.to_unix_duration().as_secs(),
        Time::GeneralTime(t) => t.to_unix_duration().as_secs(),
    }
}

#[test]
fn issuance_is_deterministic_for_fixed_inputs() {
    // No randomness anywhere in the scheme: same profile, same key, same
    // bytes out.
    let (_, a) = issue();
    let (_, b) = issue();
    assert_eq!(a, b);
}
