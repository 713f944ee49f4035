//! PKCS#11 token session adapter built on `cryptoki`.
//!
//! Owns the loaded module, the slot, and one logged-in session. Module
//! discovery, interactive selection, and PIN prompting are the caller's
//! business; this adapter takes a module path, a slot index, and a PIN.

use cryptoki::context::{CInitializeArgs, Pkcs11};
use cryptoki::mechanism::{Mechanism, MechanismType};
use cryptoki::object::{Attribute, AttributeType, KeyType, ObjectClass, ObjectHandle};
use cryptoki::session::{Session, UserType};
use cryptoki::slot::Slot;
use cryptoki::types::AuthPin;

use crate::adapters::backend::RawRsaSigner;
use crate::domain::keys::RsaPublicKeyParts;
use crate::infra::error::{SigningError, SigningResult};

/// A logged-in session on one PKCS#11 token.
///
/// Exclusively owned by the calling thread; serializing access across
/// threads is the caller's responsibility.
pub struct TokenSession {
    #[allow(dead_code)]
    pkcs11: Pkcs11,
    slot: Slot,
    session: Session,
}

impl TokenSession {
    /// Load the PKCS#11 module, open a read-only session on the token at
    /// `slot_index`, and log the user in.
    pub fn open(module_path: &str, slot_index: usize, pin: &str) -> SigningResult<Self> {
        log::info!("loading PKCS#11 module {module_path}");
        let pkcs11 = Pkcs11::new(module_path)?;
        pkcs11.initialize(CInitializeArgs::OsThreads)?;

        let slots = pkcs11.get_slots_with_token()?;
        let slot = slots.get(slot_index).copied().ok_or_else(|| {
            SigningError::Token(format!(
                "no token in slot index {slot_index} ({} slot(s) with a token present)",
                slots.len()
            ))
        })?;

        let session = pkcs11.open_ro_session(slot)?;
        session.login(UserType::User, Some(&AuthPin::new(pin.into())))?;
        log::info!("opened authorized session on slot index {slot_index}");

        Ok(Self {
            pkcs11,
            slot,
            session,
        })
    }

    /// Find an RSA private key with the sign attribute set, optionally
    /// narrowed by CKA_LABEL. The first match wins.
    pub fn find_signing_key(&self, label: Option<&str>) -> SigningResult<ObjectHandle> {
        let mut template = vec![
            Attribute::Class(ObjectClass::PRIVATE_KEY),
            Attribute::KeyType(KeyType::RSA),
            Attribute::Sign(true),
        ];
        if let Some(label) = label {
            template.push(Attribute::Label(label.as_bytes().to_vec()));
        }

        let keys = self.session.find_objects(&template)?;
        log::info!("found {} candidate RSA signing key(s)", keys.len());
        keys.first().copied().ok_or_else(|| {
            SigningError::Token(match label {
                Some(label) => format!("no RSA signing key with label {label:?} on token"),
                None => "no RSA signing key on token".to_string(),
            })
        })
    }

    /// Read the public key components off the private key object, the same
    /// way the certificate subject's key is recovered before issuance.
    pub fn public_key_parts(&self, key: ObjectHandle) -> SigningResult<RsaPublicKeyParts> {
        let attributes = self.session.get_attributes(
            key,
            &[AttributeType::Modulus, AttributeType::PublicExponent],
        )?;

        let mut modulus = None;
        let mut exponent = None;
        for attribute in attributes {
            match attribute {
                Attribute::Modulus(bytes) => modulus = Some(bytes),
                Attribute::PublicExponent(bytes) => exponent = Some(bytes),
                _ => {}
            }
        }

        let modulus = modulus.ok_or_else(|| {
            SigningError::Token("token did not return CKA_MODULUS for the key".to_string())
        })?;
        let exponent = exponent.ok_or_else(|| {
            SigningError::Token("token did not return CKA_PUBLIC_EXPONENT for the key".to_string())
        })?;

        RsaPublicKeyParts::new(modulus, exponent)
    }
}

impl RawRsaSigner for TokenSession {
    type KeyHandle = ObjectHandle;

    fn supports_raw_rsa_sign(&self) -> SigningResult<bool> {
        let mechanisms = self.pkcs11.get_mechanism_list(self.slot)?;
        if !mechanisms.contains(&MechanismType::RSA_X_509) {
            return Ok(false);
        }
        let info = self
            .pkcs11
            .get_mechanism_info(self.slot, MechanismType::RSA_X_509)?;
        Ok(info.sign())
    }

    fn modulus_len(&self, key: &ObjectHandle) -> SigningResult<usize> {
        Ok(self.public_key_parts(*key)?.modulus_len())
    }

    fn sign_raw(&self, key: &ObjectHandle, padded: &[u8]) -> SigningResult<Vec<u8>> {
        log::debug!("raw RSA sign over {} padded bytes", padded.len());
        let signature = self.session.sign(&Mechanism::RsaX509, *key, padded)?;
        Ok(signature)
    }
}
