//! Private-key path: raw SSH/PEM private key first (including OpenSSL-encrypted
//! PKCS #1), encrypted PKCS #8 second.
//!
//! The passphrase source is consulted lazily, only when the key on hand is
//! actually protected.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rsa::RsaPrivateKey;
use tracing::debug;

use super::{classify_oid, classify_ssh_private, legacy, KeyEncoding, KeyMaterial, Parsed};
use crate::error::SealError;
use crate::passphrase::PassphraseSource;
use crate::pem::{self, PemBlock};

/// Find an RSA private key in `bytes`.
///
/// Tries the key as a raw private key (OpenSSH, PKCS #1 or PKCS #8 PEM) and
/// falls back to an `ENCRYPTED PRIVATE KEY` block. When neither applies, the
/// error from the first attempt is returned.
pub fn locate_private_key(
    bytes: &[u8],
    passphrase: &dyn PassphraseSource,
) -> Result<KeyMaterial<RsaPrivateKey>, SealError> {
    let (encoding, parsed) = match parse_raw_private_key(bytes, passphrase) {
        Ok(found) => found,
        Err(raw_err) => {
            debug!(error = %raw_err, "raw private key parse failed, scanning pem blocks");
            let blocks = pem::decode_blocks(bytes);
            match blocks.first() {
                Some(block) if block.label == "ENCRYPTED PRIVATE KEY" => {
                    (KeyEncoding::EncryptedPkcs8, decrypt_pkcs8(block, passphrase)?)
                }
                _ => return Err(raw_err),
            }
        }
    };

    let key = parsed.require_rsa("private key")?;
    debug!(encoding = %encoding, "private key located");
    Ok(KeyMaterial { encoding, key })
}

/// Parse the first PEM block as an unencrypted (or OpenSSH-protected) key.
fn parse_raw_private_key(
    bytes: &[u8],
    passphrase: &dyn PassphraseSource,
) -> Result<(KeyEncoding, Parsed<RsaPrivateKey>), SealError> {
    let (block, _) = pem::decode(bytes).ok_or(SealError::NoPrivateKey)?;

    match block.label.as_str() {
        "OPENSSH PRIVATE KEY" => Ok((KeyEncoding::OpenSsh, parse_openssh(&block, passphrase)?)),
        "RSA PRIVATE KEY" if legacy::is_encrypted(&block) => Ok((
            KeyEncoding::EncryptedPkcs1,
            Parsed::Rsa(decrypt_pkcs1(&block, passphrase)?),
        )),
        "RSA PRIVATE KEY" => {
            let key = RsaPrivateKey::from_pkcs1_der(&block.contents)
                .map_err(|e| invalid("PKCS #1", e))?;
            Ok((KeyEncoding::Pkcs1, Parsed::Rsa(key)))
        }
        "PRIVATE KEY" => Ok((KeyEncoding::Pkcs8, parse_pkcs8(&block.contents)?)),
        "EC PRIVATE KEY" => Err(SealError::NotRsa {
            role: "private key",
            found: "ECDSA (SEC1)".to_string(),
        }),
        "DSA PRIVATE KEY" => Err(SealError::NotRsa {
            role: "private key",
            found: "DSA".to_string(),
        }),
        other => Err(SealError::UnsupportedKeyType(other.to_string())),
    }
}

fn parse_openssh(
    block: &PemBlock,
    passphrase: &dyn PassphraseSource,
) -> Result<Parsed<RsaPrivateKey>, SealError> {
    let mut key =
        ssh_key::PrivateKey::from_bytes(&block.contents).map_err(|e| invalid("OpenSSH", e))?;
    if key.is_encrypted() {
        debug!(cipher = %key.cipher(), "openssh key is passphrase protected");
        let pass = passphrase.passphrase()?;
        key = key
            .decrypt(pass.as_bytes())
            .map_err(SealError::OpenSshDecryptFailed)?;
    }
    classify_ssh_private(&key)
}

fn parse_pkcs8(der: &[u8]) -> Result<Parsed<RsaPrivateKey>, SealError> {
    let info = PrivateKeyInfo::try_from(der).map_err(|e| invalid("PKCS #8", e))?;
    classify_oid(&info.algorithm)
        .try_map(|()| RsaPrivateKey::from_pkcs8_der(der).map_err(|e| invalid("PKCS #8", e)))
}

/// Decrypt a PBES2 `ENCRYPTED PRIVATE KEY` block and parse the PKCS #8 inside.
fn decrypt_pkcs8(
    block: &PemBlock,
    passphrase: &dyn PassphraseSource,
) -> Result<Parsed<RsaPrivateKey>, SealError> {
    let encrypted = EncryptedPrivateKeyInfo::try_from(block.contents.as_slice())
        .map_err(|e| invalid("encrypted PKCS #8", e))?;
    debug!(scheme = %encrypted.encryption_algorithm.oid(), "pkcs8 key is passphrase protected");

    let pass = passphrase.passphrase()?;
    let document = encrypted.decrypt(pass.as_bytes()).map_err(|e| {
        debug!(error = %e, "pkcs8 decryption failed");
        SealError::Pkcs8DecryptFailed
    })?;

    // A wrong passphrase occasionally yields valid padding over garbage.
    parse_pkcs8(document.as_bytes()).map_err(|e| {
        debug!(error = %e, "decrypted pkcs8 payload is not a private key");
        SealError::Pkcs8DecryptFailed
    })
}

/// Decrypt an OpenSSL-encrypted `RSA PRIVATE KEY` block.
fn decrypt_pkcs1(
    block: &PemBlock,
    passphrase: &dyn PassphraseSource,
) -> Result<RsaPrivateKey, SealError> {
    let dek = legacy::DekInfo::from_block(block)?;
    let pass = passphrase.passphrase()?;
    let der = dek.decrypt(&block.contents, pass.as_bytes())?;
    // Wrong passphrases get past the padding check about once in 256 tries.
    RsaPrivateKey::from_pkcs1_der(&der).map_err(|e| {
        debug!(error = %e, "decrypted pkcs1 payload is not a private key");
        SealError::PemDecryptFailed
    })
}

fn invalid(encoding: &'static str, err: impl std::fmt::Display) -> SealError {
    SealError::InvalidPrivateKey {
        encoding,
        reason: err.to_string(),
    }
}
