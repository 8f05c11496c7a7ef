//! Crypto module: the RSA envelope protocol.
//!
//! `seal` draws a fresh 32-byte secret, encrypts it under an RSA public key
//! with OAEP (SHA-256, empty label) and returns an [`EnvelopeRecord`] holding
//! the URL-safe base64 ciphertext and a digest of the secret. `unseal` reverses
//! this with the matching private key and refuses to hand back a secret whose
//! digest does not match the record.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::SealError;
use crate::record::EnvelopeRecord;

/// Length of the sealed secret in bytes (a 256-bit symmetric key).
pub const SECRET_LEN: usize = 32;

/// Secret recovered from, or sealed into, an envelope.
///
/// The buffer is zeroed on drop. `Debug` never prints the bytes and the type
/// is deliberately not `Serialize`.
pub struct SecretKey(Zeroizing<Vec<u8>>);

impl SecretKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Digest of the secret, as stored in [`EnvelopeRecord::digest`].
    pub fn digest(&self) -> String {
        compute_digest(&self.0)
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED; {} bytes])", self.0.len())
    }
}

/// Lowercase hex SHA-256 of `bytes`.
///
/// Used only as an integrity check on the recovered secret. It must stay
/// stable across versions or existing envelopes stop verifying.
pub fn compute_digest(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Read [`SECRET_LEN`] bytes from the operating system's secure random source.
pub fn generate_secret() -> Result<SecretKey, SealError> {
    let mut buf = Zeroizing::new(vec![0u8; SECRET_LEN]);
    OsRng.try_fill_bytes(&mut buf).map_err(SealError::Random)?;
    Ok(SecretKey(buf))
}

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Seal a fresh secret under `public_key`.
///
/// Returns the envelope to persist and the secret itself, which the caller
/// keeps in memory for as long as it needs the symmetric key. Every call
/// produces a new secret and a new ciphertext. Random-source and OAEP
/// failures (e.g. a modulus too small for a 32-byte OAEP-SHA256 message) are
/// returned unchanged; nothing is retried.
pub fn seal(public_key: &RsaPublicKey) -> Result<(EnvelopeRecord, SecretKey), SealError> {
    let secret = generate_secret()?;

    let encrypted = public_key
        .encrypt(&mut OsRng, oaep(), secret.as_bytes())
        .map_err(SealError::EncryptFailed)?;

    let record = EnvelopeRecord {
        ciphertext: URL_SAFE.encode(&encrypted),
        digest: secret.digest(),
        timestamp: Utc::now(),
    };
    debug!(digest = %record.digest, ciphertext_len = encrypted.len(), "sealed secret");

    Ok((record, secret))
}

/// Recover and verify the secret in `record` with `private_key`.
///
/// Fails on undecodable ciphertext, on OAEP decryption failure (wrong key,
/// corrupted ciphertext) and on a digest mismatch. On any failure no secret
/// is returned; the decrypted buffer is zeroed before the error propagates.
pub fn unseal(private_key: &RsaPrivateKey, record: &EnvelopeRecord) -> Result<SecretKey, SealError> {
    let ciphertext = URL_SAFE
        .decode(record.ciphertext.as_bytes())
        .map_err(SealError::CiphertextDecode)?;

    let plaintext = private_key
        .decrypt(oaep(), &ciphertext)
        .map(Zeroizing::new)
        .map_err(SealError::DecryptFailed)?;

    let secret = SecretKey(plaintext);
    let actual = secret.digest();
    if actual != record.digest {
        return Err(SealError::DigestMismatch {
            expected: record.digest.clone(),
            actual,
        });
    }
    debug!(digest = %actual, "unsealed and verified secret");

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};

    fn key_a() -> RsaPrivateKey {
        RsaPrivateKey::from_pkcs8_pem(include_str!("../../tests/fixtures/rsa_a_pkcs8.pem"))
            .expect("fixture key A must parse")
    }

    fn key_b() -> RsaPrivateKey {
        RsaPrivateKey::from_pkcs8_pem(include_str!("../../tests/fixtures/rsa_b_pkcs8.pem"))
            .expect("fixture key B must parse")
    }

    fn public_a() -> RsaPublicKey {
        RsaPublicKey::from_public_key_pem(include_str!("../../tests/fixtures/rsa_a_pkix.pem"))
            .expect("fixture public key A must parse")
    }

    #[test]
    fn test_compute_digest_known_vector() {
        // SHA-256("abc")
        assert_eq!(
            compute_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(compute_digest(&[]).len(), 64, "digest must be 64 hex chars");
    }

    #[test]
    fn test_generate_secret_length_and_freshness() {
        let a = generate_secret().expect("random source");
        let b = generate_secret().expect("random source");
        assert_eq!(a.len(), SECRET_LEN);
        assert_ne!(a.as_bytes(), b.as_bytes(), "two secrets must differ");
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = generate_secret().expect("random source");
        let shown = format!("{secret:?}");
        assert_eq!(shown, "SecretKey([REDACTED; 32 bytes])");
    }

    #[test]
    fn test_seal_unseal_round_trip() {
        let (record, sealed) = seal(&public_a()).expect("seal should succeed");
        assert_eq!(record.digest, compute_digest(sealed.as_bytes()));

        let recovered = unseal(&key_a(), &record).expect("unseal should succeed");
        assert_eq!(
            recovered.as_bytes(),
            sealed.as_bytes(),
            "unsealed secret must equal the sealed one"
        );
    }

    #[test]
    fn test_seal_ciphertext_is_url_safe_base64() {
        let (record, _) = seal(&public_a()).expect("seal should succeed");
        assert!(
            !record.ciphertext.contains('+') && !record.ciphertext.contains('/'),
            "ciphertext must use the URL-safe alphabet, got: {}",
            record.ciphertext
        );
        let raw = URL_SAFE.decode(&record.ciphertext).expect("valid base64");
        assert_eq!(raw.len(), 256, "2048-bit key yields 256-byte ciphertext");
    }

    #[test]
    fn test_seal_is_fresh_each_time() {
        let public = public_a();
        let (first, s1) = seal(&public).expect("first seal");
        let (second, s2) = seal(&public).expect("second seal");
        assert_ne!(first.ciphertext, second.ciphertext);
        assert_ne!(first.digest, second.digest);
        assert_ne!(s1.as_bytes(), s2.as_bytes());

        let private = key_a();
        assert_eq!(unseal(&private, &first).expect("first").as_bytes(), s1.as_bytes());
        assert_eq!(unseal(&private, &second).expect("second").as_bytes(), s2.as_bytes());
    }

    #[test]
    fn test_unseal_wrong_key_fails() {
        let (record, _) = seal(&public_a()).expect("seal should succeed");
        let err = unseal(&key_b(), &record).expect_err("wrong key must not unseal");
        assert!(
            matches!(err, SealError::DecryptFailed(_) | SealError::DigestMismatch { .. }),
            "expected decrypt failure or digest mismatch, got {err:?}"
        );
    }

    #[test]
    fn test_unseal_flipped_byte_fails() {
        let (record, _) = seal(&public_a()).expect("seal should succeed");
        let raw = URL_SAFE.decode(&record.ciphertext).expect("valid base64");
        let private = key_a();

        for index in [0, raw.len() / 2, raw.len() - 1] {
            let mut tampered = raw.clone();
            tampered[index] ^= 0x01;
            let record = EnvelopeRecord {
                ciphertext: URL_SAFE.encode(&tampered),
                ..record.clone()
            };
            let err = unseal(&private, &record).expect_err("tampered ciphertext must fail");
            assert!(
                matches!(err, SealError::DecryptFailed(_) | SealError::DigestMismatch { .. }),
                "flipping byte {index} should fail decryption or verification, got {err:?}"
            );
        }
    }

    #[test]
    fn test_unseal_digest_mismatch_reports_both_digests() {
        let (mut record, sealed) = seal(&public_a()).expect("seal should succeed");
        record.digest = compute_digest(b"something else");

        match unseal(&key_a(), &record) {
            Err(SealError::DigestMismatch { expected, actual }) => {
                assert_eq!(expected, record.digest);
                assert_eq!(actual, sealed.digest());
            }
            other => panic!("expected DigestMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unseal_bad_base64() {
        let (mut record, _) = seal(&public_a()).expect("seal should succeed");
        record.ciphertext = "not*base64!".to_string();
        let err = unseal(&key_a(), &record).expect_err("invalid base64 must fail");
        assert!(matches!(err, SealError::CiphertextDecode(_)), "got {err:?}");
    }

    #[test]
    fn test_seal_modulus_too_small() {
        // OAEP-SHA256 needs k >= 2*32 + 2 + SECRET_LEN = 98 bytes; 512 bits is 64.
        let small = RsaPrivateKey::new(&mut OsRng, 512).expect("generate 512-bit key");
        let err = seal(&small.to_public_key()).expect_err("message too long for modulus");
        assert!(
            err.to_string().contains("encrypting secret key failed"),
            "got: {err}"
        );
    }
}
