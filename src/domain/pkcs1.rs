//! EMSA-PKCS1-v1_5 encoding for raw RSA token signing.
//!
//! The token only exposes the raw private-key transform (CKM_RSA_X_509),
//! so the padded block has to be produced on the host. Output is fully
//! deterministic: no randomness is involved anywhere in this scheme.

use crate::domain::digest::HashAlgorithm;
use crate::infra::error::{SigningError, SigningResult};

/// Minimum EMSA-PKCS1-v1_5 overhead: `0x00 0x01`, at least eight `0xFF`
/// padding bytes, and the `0x00` separator.
const MIN_PAD_OVERHEAD: usize = 11;

/// Build the DER-encoded DigestInfo structure:
///
/// ```text
/// DigestInfo ::= SEQUENCE {
///     digestAlgorithm AlgorithmIdentifier,
///     digest          OCTET STRING
/// }
/// ```
pub fn digest_info(algorithm: HashAlgorithm, digest: &[u8]) -> SigningResult<Vec<u8>> {
    if digest.len() != algorithm.digest_size() {
        return Err(SigningError::InvalidInput(format!(
            "digest length mismatch for {algorithm}: expected {}, got {}",
            algorithm.digest_size(),
            digest.len()
        )));
    }

    let prefix: &[u8] = match algorithm {
        HashAlgorithm::Sha1 => &[
            0x30, 0x21, // SEQUENCE, length 33
            0x30, 0x09, // SEQUENCE, length 9
            0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, // SHA-1 OID
            0x05, 0x00, // NULL
            0x04, 0x14, // OCTET STRING, length 20
        ],
        HashAlgorithm::Sha256 => &[
            0x30, 0x31, // SEQUENCE, length 49
            0x30, 0x0d, // SEQUENCE, length 13
            0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, // SHA-256 OID
            0x05, 0x00, // NULL
            0x04, 0x20, // OCTET STRING, length 32
        ],
        HashAlgorithm::Sha384 => &[
            0x30, 0x41, // SEQUENCE, length 65
            0x30, 0x0d, // SEQUENCE, length 13
            0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x02, // SHA-384 OID
            0x05, 0x00, // NULL
            0x04, 0x30, // OCTET STRING, length 48
        ],
        HashAlgorithm::Sha512 => &[
            0x30, 0x51, // SEQUENCE, length 81
            0x30, 0x0d, // SEQUENCE, length 13
            0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x03, // SHA-512 OID
            0x05, 0x00, // NULL
            0x04, 0x40, // OCTET STRING, length 64
        ],
    };

    let mut info = Vec::with_capacity(prefix.len() + digest.len());
    info.extend_from_slice(prefix);
    info.extend_from_slice(digest);
    Ok(info)
}

/// Encode a digest into an EMSA-PKCS1-v1_5 block of exactly `modulus_len`
/// bytes:
///
/// ```text
/// 0x00 || 0x01 || FF..FF || 0x00 || DigestInfo
/// ```
///
/// Fails with `EncodingTooLarge` when the DigestInfo plus the minimum
/// padding overhead exceeds the modulus capacity.
pub fn encode_emsa_pkcs1_v15(
    algorithm: HashAlgorithm,
    digest: &[u8],
    modulus_len: usize,
) -> SigningResult<Vec<u8>> {
    let info = digest_info(algorithm, digest)?;

    let needed = info.len() + MIN_PAD_OVERHEAD;
    if modulus_len < needed {
        return Err(SigningError::EncodingTooLarge {
            needed,
            capacity: modulus_len,
        });
    }

    let mut block = Vec::with_capacity(modulus_len);
    block.push(0x00);
    block.push(0x01);
    block.resize(modulus_len - info.len() - 1, 0xff);
    block.push(0x00);
    block.extend_from_slice(&info);
    debug_assert_eq!(block.len(), modulus_len);
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_layout() {
        let digest = vec![0xAB; 32];
        let block = encode_emsa_pkcs1_v15(HashAlgorithm::Sha256, &digest, 256).unwrap();

        assert_eq!(block.len(), 256);
        assert_eq!(&block[..2], &[0x00, 0x01]);

        // 0xFF fill runs up to the single 0x00 separator before DigestInfo.
        let info_len = 19 + 32;
        let separator = 256 - info_len - 1;
        assert!(block[2..separator].iter().all(|&b| b == 0xff));
        assert_eq!(block[separator], 0x00);
        assert_eq!(&block[separator + 1..separator + 3], &[0x30, 0x31]);
        assert_eq!(&block[256 - 32..], &digest[..]);
    }

    #[test]
    fn test_output_length_across_algorithms_and_moduli() {
        for algorithm in [
            HashAlgorithm::Sha1,
            HashAlgorithm::Sha256,
            HashAlgorithm::Sha384,
            HashAlgorithm::Sha512,
        ] {
            let digest = vec![0x42; algorithm.digest_size()];
            for modulus_len in [128, 256, 384, 512] {
                let block = encode_emsa_pkcs1_v15(algorithm, &digest, modulus_len).unwrap();
                assert_eq!(block.len(), modulus_len);
                assert_eq!(&block[..2], &[0x00, 0x01]);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let digest = vec![0x11; 32];
        let a = encode_emsa_pkcs1_v15(HashAlgorithm::Sha256, &digest, 256).unwrap();
        let b = encode_emsa_pkcs1_v15(HashAlgorithm::Sha256, &digest, 256).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_modulus_too_small() {
        let digest = vec![0x11; 32];
        // DigestInfo for SHA-256 is 51 bytes; 51 + 11 = 62 is the minimum.
        let err = encode_emsa_pkcs1_v15(HashAlgorithm::Sha256, &digest, 61).unwrap_err();
        assert!(matches!(
            err,
            SigningError::EncodingTooLarge {
                needed: 62,
                capacity: 61
            }
        ));
        assert!(encode_emsa_pkcs1_v15(HashAlgorithm::Sha256, &digest, 62).is_ok());
    }

    #[test]
    fn test_digest_length_mismatch() {
        let err = digest_info(HashAlgorithm::Sha256, &[0u8; 20]).unwrap_err();
        assert!(matches!(err, SigningError::InvalidInput(_)));
    }

    #[test]
    fn test_sha1_digest_info_header() {
        let info = digest_info(HashAlgorithm::Sha1, &[0u8; 20]).unwrap();
        assert_eq!(info.len(), 35);
        assert_eq!(&info[..2], &[0x30, 0x21]);
    }
}
