//! Self-signed certificate assembly and signing.
//!
//! Builds the to-be-signed structure, encodes it to DER once, drives the
//! signing engine over those exact bytes, and wraps the returned signature
//! into the final certificate. DER is canonical, so re-encoding the same
//! in-memory structure during verification reproduces byte-identical input.

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use der::asn1::{AnyRef, BitString, ObjectIdentifier, OctetString, UintRef};
use der::{Any, DateTime, Decode, Encode, Sequence};
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::ext::pkix::certpolicy::{PolicyInformation, PolicyQualifierInfo};
use x509_cert::ext::pkix::{BasicConstraints, CertificatePolicies, KeyUsage, KeyUsages};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

use crate::adapters::backend::RawRsaSigner;
use crate::domain::keys::RsaPublicKeyParts;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::engine::SigningEngine;

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ID_CE_KEY_USAGE: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.15");
const ID_CE_BASIC_CONSTRAINTS: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.19");
const ID_CE_CERTIFICATE_POLICIES: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.32");
const ID_QT_UNOTICE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.2.2");

/// Policy OID carried by the demo certificates this tool issues.
const DEMO_POLICY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.2706.2.2.1.1.1.1.1");

const DEFAULT_POLICY_NOTICE: &str =
    "This certificate may be used for demonstration purposes only.";

/// Parameters of the certificate to issue.
///
/// The certificate is always self-signed: issuer == subject.
#[derive(Debug, Clone)]
pub struct CertificateProfile {
    /// RFC 4514 subject string, e.g. `CN=Test,O=Example,C=AT`.
    pub subject: String,
    /// Host-assigned serial number; must be positive and unique per issuer.
    pub serial: u64,
    pub not_before: SystemTime,
    pub not_after: SystemTime,
    /// User-notice text placed in the certificate-policies extension.
    pub policy_notice: String,
}

impl CertificateProfile {
    pub fn new(
        subject: impl Into<String>,
        serial: u64,
        not_before: SystemTime,
        not_after: SystemTime,
    ) -> Self {
        Self {
            subject: subject.into(),
            serial,
            not_before,
            not_after,
            policy_notice: DEFAULT_POLICY_NOTICE.to_string(),
        }
    }
}

/// A fully signed, DER-encoded certificate. Immutable once produced.
#[derive(Clone)]
pub struct SignedCertificate {
    certificate: Certificate,
    der: Vec<u8>,
}

impl SignedCertificate {
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }
}

impl fmt::Debug for SignedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedCertificate(der_len={})", self.der.len())
    }
}

/// RFC 8017 RSAPublicKey, encoded into the SPKI bit string.
#[derive(Sequence)]
struct RsaPublicKeyDer<'a> {
    modulus: UintRef<'a>,
    public_exponent: UintRef<'a>,
}

/// RFC 5280 UserNotice, with only explicitText populated.
#[derive(Sequence)]
struct UserNotice {
    explicit_text: Option<String>,
}

/// Assembles and signs self-signed certificates over a token-backed engine.
pub struct CertificateBuilder;

impl CertificateBuilder {
    /// Build and sign a self-signed certificate.
    ///
    /// Any failure aborts with no partial output; a returned certificate's
    /// signature always verifies against its own to-be-signed bytes.
    pub fn build<S: RawRsaSigner>(
        profile: &CertificateProfile,
        public_key: &RsaPublicKeyParts,
        engine: &mut SigningEngine<'_, S>,
        key: S::KeyHandle,
    ) -> SigningResult<SignedCertificate> {
        let subject = parse_subject(&profile.subject)?;
        let validity = encode_validity(profile.not_before, profile.not_after)?;
        let serial_number = encode_serial(profile.serial)?;
        let spki = encode_spki(public_key)?;
        let extensions = build_extensions(&profile.policy_notice)?;

        let signature_algorithm = AlgorithmIdentifierOwned {
            oid: engine.algorithm().signature_oid(),
            parameters: Some(Any::from(AnyRef::NULL)),
        };

        let tbs_certificate = TbsCertificate {
            version: Version::V3,
            serial_number,
            signature: signature_algorithm.clone(),
            // Self-signed: issuer and subject are the same name.
            issuer: subject.clone(),
            validity,
            subject,
            subject_public_key_info: spki,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        };

        let tbs_der = tbs_certificate.to_der()?;
        log::info!(
            "signing certificate for {:?} ({} to-be-signed bytes)",
            profile.subject,
            tbs_der.len()
        );

        engine.initialize_sign(key)?;
        engine.update(&tbs_der)?;
        let signature = engine.sign()?;

        let certificate = Certificate {
            tbs_certificate,
            signature_algorithm,
            signature: BitString::from_bytes(&signature)?,
        };
        let der = certificate.to_der()?;
        log::info!("issued certificate, {} DER bytes", der.len());

        Ok(SignedCertificate { certificate, der })
    }
}

fn parse_subject(subject: &str) -> SigningResult<Name> {
    if subject.trim().is_empty() {
        return Err(SigningError::InvalidSubject(
            "subject name is empty".to_string(),
        ));
    }
    Name::from_str(subject)
        .map_err(|e| SigningError::InvalidSubject(format!("{subject:?}: {e}")))
}

fn encode_validity(not_before: SystemTime, not_after: SystemTime) -> SigningResult<Validity> {
    if not_before > not_after {
        return Err(SigningError::InvalidValidity);
    }
    Ok(Validity {
        not_before: encode_time(not_before)?,
        not_after: encode_time(not_after)?,
    })
}

/// RFC 5280: UTCTime through 2049, GeneralizedTime from 2050 on.
fn encode_time(time: SystemTime) -> SigningResult<Time> {
    let datetime = DateTime::try_from(time)?;
    if datetime.year() < 2050 {
        Ok(Time::UtcTime(der::asn1::UtcTime::from_date_time(datetime)?))
    } else {
        Ok(Time::GeneralTime(
            der::asn1::GeneralizedTime::from_date_time(datetime),
        ))
    }
}

fn encode_serial(serial: u64) -> SigningResult<SerialNumber> {
    if serial == 0 {
        return Err(SigningError::InvalidInput(
            "serial number must be positive".to_string(),
        ));
    }
    let bytes = serial.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    Ok(SerialNumber::new(&bytes[first_nonzero..])?)
}

fn encode_spki(public_key: &RsaPublicKeyParts) -> SigningResult<SubjectPublicKeyInfoOwned> {
    let key_der = RsaPublicKeyDer {
        modulus: UintRef::new(public_key.modulus())?,
        public_exponent: UintRef::new(public_key.exponent())?,
    }
    .to_der()?;

    Ok(SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: RSA_ENCRYPTION,
            parameters: Some(Any::from(AnyRef::NULL)),
        },
        subject_public_key: BitString::from_bytes(&key_der)?,
    })
}

/// Fixed extension order: basic-constraints, key-usage, certificate-policies.
fn build_extensions(policy_notice: &str) -> SigningResult<Vec<Extension>> {
    let basic_constraints = BasicConstraints {
        ca: true,
        path_len_constraint: None,
    }
    .to_der()?;

    let key_usage =
        KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyCertSign | KeyUsages::CRLSign)
            .to_der()?;

    let user_notice = UserNotice {
        explicit_text: Some(policy_notice.to_string()),
    }
    .to_der()?;
    let policies = CertificatePolicies(vec![PolicyInformation {
        policy_identifier: DEMO_POLICY,
        policy_qualifiers: Some(vec![PolicyQualifierInfo {
            policy_qualifier_id: ID_QT_UNOTICE,
            qualifier: Some(Any::from_der(&user_notice)?),
        }]),
    }])
    .to_der()?;

    Ok(vec![
        Extension {
            extn_id: ID_CE_BASIC_CONSTRAINTS,
            critical: true,
            extn_value: OctetString::new(basic_constraints)?,
        },
        Extension {
            extn_id: ID_CE_KEY_USAGE,
            critical: true,
            extn_value: OctetString::new(key_usage)?,
        },
        Extension {
            extn_id: ID_CE_CERTIFICATE_POLICIES,
            critical: false,
            extn_value: OctetString::new(policies)?,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_subject_rejected() {
        assert!(matches!(
            parse_subject("").unwrap_err(),
            SigningError::InvalidSubject(_)
        ));
        assert!(matches!(
            parse_subject("   ").unwrap_err(),
            SigningError::InvalidSubject(_)
        ));
    }

    #[test]
    fn test_subject_parses_rfc4514() {
        assert!(parse_subject("CN=Test").is_ok());
        assert!(parse_subject("CN=Test,O=Example,C=AT").is_ok());
    }

    #[test]
    fn test_validity_window_ordering() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let later = now + Duration::from_secs(3600);
        assert!(encode_validity(now, later).is_ok());
        assert!(encode_validity(now, now).is_ok());
        assert!(matches!(
            encode_validity(later, now).unwrap_err(),
            SigningError::InvalidValidity
        ));
    }

    #[test]
    fn test_serial_encoding() {
        assert!(matches!(
            encode_serial(0).unwrap_err(),
            SigningError::InvalidInput(_)
        ));
        assert!(encode_serial(1).is_ok());
        assert!(encode_serial(u64::MAX).is_ok());
    }

    #[test]
    fn test_extension_order_and_criticality() {
        let extensions = build_extensions(DEFAULT_POLICY_NOTICE).unwrap();
        assert_eq!(extensions.len(), 3);
        assert_eq!(extensions[0].extn_id, ID_CE_BASIC_CONSTRAINTS);
        assert!(extensions[0].critical);
        assert_eq!(extensions[1].extn_id, ID_CE_KEY_USAGE);
        assert!(extensions[1].critical);
        assert_eq!(extensions[2].extn_id, ID_CE_CERTIFICATE_POLICIES);
        assert!(!extensions[2].critical);
    }

    #[test]
    fn test_time_encoding_boundary() {
        // 2049 still fits UTCTime; 2050 switches to GeneralizedTime.
        let y2049 = SystemTime::UNIX_EPOCH + Duration::from_secs(2_500_000_000);
        assert!(matches!(encode_time(y2049).unwrap(), Time::UtcTime(_)));
        let y2065 = SystemTime::UNIX_EPOCH + Duration::from_secs(3_000_000_000);
        assert!(matches!(encode_time(y2065).unwrap(), Time::GeneralTime(_)));
    }
}
