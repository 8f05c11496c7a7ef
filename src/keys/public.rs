//! Public-key path: authorized-key line, then SSH2 block, then PEM.

use std::str::FromStr;

use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::{DecodePublicKey, SubjectPublicKeyInfoRef};
use rsa::RsaPublicKey;
use tracing::debug;

use super::{classify_oid, classify_ssh_public, parse_ssh2_public_key, KeyEncoding, KeyMaterial, Parsed};
use crate::error::SealError;
use crate::pem;

/// Outcome of one parser in the fallback chain.
enum Attempt {
    Found(KeyMaterial<RsaPublicKey>),
    /// Decoded, but not an RSA key. The chain continues; the algorithm is kept
    /// for the final error.
    WrongType(String),
    NoMatch,
    Failed(SealError),
}

type Parser = fn(&[u8]) -> Attempt;

/// Parsers in priority order. An SSH parser fails hard only when it decoded
/// an RSA key whose numbers are unusable.
const PARSERS: &[(&str, Parser)] = &[
    ("authorized-key", try_authorized_key as Parser),
    ("ssh2", try_ssh2 as Parser),
    ("pem", try_pem as Parser),
];

/// Find an RSA public key in `bytes`, whatever its encoding.
pub fn locate_public_key(bytes: &[u8]) -> Result<KeyMaterial<RsaPublicKey>, SealError> {
    let mut wrong_type: Option<String> = None;

    for &(name, parser) in PARSERS {
        match parser(bytes) {
            Attempt::Found(material) => {
                debug!(encoding = %material.encoding, "public key located");
                return Ok(material);
            }
            Attempt::WrongType(found) => {
                debug!(parser = name, found = %found, "not an RSA key, trying next format");
                wrong_type.get_or_insert(found);
            }
            Attempt::NoMatch => {
                debug!(parser = name, "no match, trying next format");
            }
            Attempt::Failed(SealError::PemDecodingFailed) if wrong_type.is_some() => {
                break;
            }
            Attempt::Failed(err) => return Err(err),
        }
    }

    match wrong_type {
        Some(found) => Err(SealError::NotRsa {
            role: "public key",
            found,
        }),
        None => Err(SealError::PemDecodingFailed),
    }
}

fn ssh_attempt(key: &ssh_key::PublicKey, encoding: KeyEncoding) -> Attempt {
    match classify_ssh_public(key) {
        Ok(Parsed::Rsa(key)) => Attempt::Found(KeyMaterial { encoding, key }),
        Ok(other) => Attempt::WrongType(other.algorithm()),
        Err(e) => Attempt::Failed(e),
    }
}

/// First parseable key line of an `authorized_keys`-style text. Blank
/// lines, `#` comments and lines that do not parse are skipped; leading
/// options are allowed.
fn try_authorized_key(bytes: &[u8]) -> Attempt {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return Attempt::NoMatch;
    };
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .find_map(|l| ssh_key::authorized_keys::Entry::from_str(l).ok())
        .map_or(Attempt::NoMatch, |entry| {
            ssh_attempt(entry.public_key(), KeyEncoding::AuthorizedKey)
        })
}

fn try_ssh2(bytes: &[u8]) -> Attempt {
    let text = String::from_utf8_lossy(bytes);
    match parse_ssh2_public_key(&text) {
        Ok(key) => ssh_attempt(&key, KeyEncoding::Ssh2),
        Err(e) => {
            debug!(error = %e, "ssh2 parse failed");
            Attempt::NoMatch
        }
    }
}

/// Only the first PEM block is considered.
fn try_pem(bytes: &[u8]) -> Attempt {
    let blocks = pem::decode_blocks(bytes);
    let Some(block) = blocks.first() else {
        return Attempt::Failed(SealError::PemDecodingFailed);
    };

    match block.label.as_str() {
        "RSA PUBLIC KEY" => match RsaPublicKey::from_pkcs1_der(&block.contents) {
            Ok(key) => Attempt::Found(KeyMaterial {
                encoding: KeyEncoding::Pkcs1,
                key,
            }),
            Err(e) => Attempt::Failed(SealError::InvalidPkcs1PublicKey(e)),
        },
        "PUBLIC KEY" => match decode_pkix(&block.contents) {
            Ok(key) => Attempt::Found(KeyMaterial {
                encoding: KeyEncoding::Pkix,
                key,
            }),
            Err(e) => Attempt::Failed(e),
        },
        other => Attempt::Failed(SealError::UnsupportedKeyType(other.to_string())),
    }
}

/// SubjectPublicKeyInfo must carry rsaEncryption; any other algorithm is a
/// type mismatch rather than a parse failure.
fn decode_pkix(der: &[u8]) -> Result<RsaPublicKey, SealError> {
    let spki = SubjectPublicKeyInfoRef::try_from(der)
        .map_err(|e| SealError::InvalidPkixPublicKey(e.to_string()))?;
    classify_oid(&spki.algorithm)
        .try_map(|()| {
            RsaPublicKey::from_public_key_der(der)
                .map_err(|e| SealError::InvalidPkixPublicKey(e.to_string()))
        })?
        .require_rsa("public key")
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use rsa::traits::PublicKeyParts;

    const PKIX: &str = include_str!("../../tests/fixtures/rsa_a_pkix.pem");
    const PKCS1: &str = include_str!("../../tests/fixtures/rsa_a_pkcs1_pub.pem");
    const AUTHORIZED: &str = include_str!("../../tests/fixtures/rsa_a.pub");
    const SSH2: &str = include_str!("../../tests/fixtures/rsa_a_ssh2.pub");
    const EC_PKIX: &str = include_str!("../../tests/fixtures/ec_p256_pkix.pem");
    const ED25519_PKIX: &str = include_str!("../../tests/fixtures/ed25519_pkix.pem");
    const ED25519_LINE: &str = include_str!("../../tests/fixtures/ed25519.pub");
    const ECDSA_LINE: &str = include_str!("../../tests/fixtures/ecdsa_p256.pub");
    const PKIX_1024: &str = include_str!("../../tests/fixtures/rsa_c_1024_pkix.pem");
    const AUTHORIZED_1024: &str = include_str!("../../tests/fixtures/rsa_c_1024.pub");
    const SSH2_1024: &str = include_str!("../../tests/fixtures/rsa_c_1024_ssh2.pub");

    #[test]
    fn test_locate_each_encoding() {
        let cases = [
            (AUTHORIZED, KeyEncoding::AuthorizedKey),
            (SSH2, KeyEncoding::Ssh2),
            (PKCS1, KeyEncoding::Pkcs1),
            (PKIX, KeyEncoding::Pkix),
        ];
        let reference = locate_public_key(PKIX.as_bytes()).expect("pkix fixture must parse").key;
        for (input, expected) in cases {
            let material = locate_public_key(input.as_bytes())
                .unwrap_or_else(|e| panic!("{expected} fixture must parse: {e}"));
            assert_eq!(material.encoding, expected);
            assert_eq!(
                material.key, reference,
                "{expected} encoding must yield the same key as PKIX"
            );
            assert_eq!(material.key.size() * 8, 2048);
        }
    }

    #[test]
    fn test_authorized_key_with_options_and_comments() {
        let text = format!(
            "# deploy key\n\nfrom=\"10.0.0.0/8\",no-pty {}",
            AUTHORIZED.trim()
        );
        let material = locate_public_key(text.as_bytes()).expect("options must be accepted");
        assert_eq!(material.encoding, KeyEncoding::AuthorizedKey);
    }

    #[test]
    fn test_no_pem_blocks_fails() {
        let err = locate_public_key(b"definitely not a key").expect_err("garbage must fail");
        assert!(
            matches!(err, SealError::PemDecodingFailed),
            "expected PemDecodingFailed, got {err:?}"
        );
        assert!(err.to_string().contains("pem file decoding failed"));
    }

    #[test]
    fn test_unsupported_pem_label() {
        let pem = include_str!("../../tests/fixtures/rsa_a_pkcs8.pem");
        let err = locate_public_key(pem.as_bytes()).expect_err("private key is not a public key");
        match err {
            SealError::UnsupportedKeyType(label) => assert_eq!(label, "PRIVATE KEY"),
            other => panic!("expected UnsupportedKeyType, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_pkcs1_body_is_terminal() {
        let pem = "-----BEGIN RSA PUBLIC KEY-----\naGVsbG8=\n-----END RSA PUBLIC KEY-----\n";
        let err = locate_public_key(pem.as_bytes()).expect_err("garbage DER must fail");
        assert!(matches!(err, SealError::InvalidPkcs1PublicKey(_)), "got {err:?}");
    }

    #[test]
    fn test_corrupt_pkix_body_is_terminal() {
        let pem = "-----BEGIN PUBLIC KEY-----\naGVsbG8=\n-----END PUBLIC KEY-----\n";
        let err = locate_public_key(pem.as_bytes()).expect_err("garbage DER must fail");
        assert!(matches!(err, SealError::InvalidPkixPublicKey(_)), "got {err:?}");
        assert!(err.to_string().contains("error parsing PKIX public key"));
    }

    #[test]
    fn test_authorized_key_skips_unparsable_lines() {
        let text = format!("not a key at all\nssh-rsa !!!broken!!!\n{}", AUTHORIZED.trim());
        let material = locate_public_key(text.as_bytes()).expect("later valid line must be used");
        assert_eq!(material.encoding, KeyEncoding::AuthorizedKey);
        let reference = locate_public_key(PKIX.as_bytes()).expect("pkix fixture must parse").key;
        assert_eq!(material.key, reference);
    }

    #[test]
    fn test_1024_bit_ssh_keys_are_accepted() {
        let reference = locate_public_key(PKIX_1024.as_bytes())
            .expect("1024-bit pkix fixture must parse")
            .key;
        assert_eq!(reference.size() * 8, 1024);
        for (input, expected) in [
            (AUTHORIZED_1024, KeyEncoding::AuthorizedKey),
            (SSH2_1024, KeyEncoding::Ssh2),
        ] {
            let material = locate_public_key(input.as_bytes())
                .unwrap_or_else(|e| panic!("1024-bit {expected} key must parse: {e}"));
            assert_eq!(material.encoding, expected);
            assert_eq!(material.key, reference);
        }
    }

    #[test]
    fn test_unusable_ssh_rsa_numbers_are_terminal() {
        // ssh-rsa with e = 1 and a 1-byte modulus: decodes, but is no RSA key.
        let mut blob = Vec::new();
        for field in [&b"ssh-rsa"[..], &[0x01][..], &[0x05][..]] {
            blob.extend_from_slice(&(field.len() as u32).to_be_bytes());
            blob.extend_from_slice(field);
        }
        let line = format!("ssh-rsa {}", base64::engine::general_purpose::STANDARD.encode(&blob));
        match locate_public_key(line.as_bytes()) {
            Err(SealError::InvalidSshRsaKey(_)) => {}
            other => panic!("expected InvalidSshRsaKey, got {other:?}"),
        }
    }

    #[test]
    fn test_non_rsa_pkix_is_type_mismatch() {
        for (input, needle) in [(EC_PKIX, "ECDSA"), (ED25519_PKIX, "Ed25519")] {
            match locate_public_key(input.as_bytes()) {
                Err(SealError::NotRsa { found, .. }) => assert!(
                    found.contains(needle),
                    "mismatch should name {needle}, got {found}"
                ),
                other => panic!("expected NotRsa, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_non_rsa_ssh_line_is_type_mismatch() {
        for (input, needle) in [(ED25519_LINE, "Ed25519"), (ECDSA_LINE, "ECDSA")] {
            match locate_public_key(input.as_bytes()) {
                Err(SealError::NotRsa { role, found }) => {
                    assert_eq!(role, "public key");
                    assert!(found.contains(needle), "mismatch should name {needle}, got {found}");
                }
                other => panic!("expected NotRsa, got {other:?}"),
            }
        }
    }
}
