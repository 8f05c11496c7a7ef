//! Key material detection.
//!
//! Raw bytes handed in by the caller are interpreted by trying a fixed list
//! of encodings in priority order. Each parser decodes into [`Parsed`], a
//! variant over the algorithm families we can recognise, and only the RSA arm
//! is accepted by the locators in [`public`] and [`private`].

use std::fmt;

use rsa::pkcs8::ObjectIdentifier;
use rsa::BigUint;

use crate::error::SealError;

mod legacy;
pub mod private;
pub mod public;
pub mod ssh2;

pub use private::locate_private_key;
pub use public::locate_public_key;
pub use ssh2::parse_ssh2_public_key;

const OID_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const OID_X25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.110");
const OID_DSA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");
const OID_SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const OID_SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

/// How the caller's bytes were interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    /// Single-line OpenSSH `authorized_keys` public key.
    AuthorizedKey,
    /// RFC 4716 `---- BEGIN SSH2 PUBLIC KEY ----` block.
    Ssh2,
    /// PEM `RSA PUBLIC KEY` / `RSA PRIVATE KEY` (PKCS #1 DER).
    Pkcs1,
    /// PEM `PUBLIC KEY` (X.509 SubjectPublicKeyInfo DER).
    Pkix,
    /// PEM `RSA PRIVATE KEY` with `Proc-Type: 4,ENCRYPTED` (OpenSSL AES-CBC).
    EncryptedPkcs1,
    /// PEM `PRIVATE KEY` (unencrypted PKCS #8 DER).
    Pkcs8,
    /// PEM `ENCRYPTED PRIVATE KEY` (PBES2-protected PKCS #8).
    EncryptedPkcs8,
    /// PEM `OPENSSH PRIVATE KEY`, optionally passphrase protected.
    OpenSsh,
}

impl KeyEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyEncoding::AuthorizedKey => "authorized-key",
            KeyEncoding::Ssh2 => "ssh2",
            KeyEncoding::Pkcs1 => "pkcs1",
            KeyEncoding::EncryptedPkcs1 => "encrypted-pkcs1",
            KeyEncoding::Pkix => "pkix",
            KeyEncoding::Pkcs8 => "pkcs8",
            KeyEncoding::EncryptedPkcs8 => "encrypted-pkcs8",
            KeyEncoding::OpenSsh => "openssh",
        }
    }
}

impl fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A usable key together with the encoding it was read from.
///
/// Built fresh for every operation and never persisted.
#[derive(Debug, Clone)]
pub struct KeyMaterial<K> {
    pub encoding: KeyEncoding,
    pub key: K,
}

/// The result of decoding key bytes, before the RSA requirement is applied.
#[derive(Debug)]
pub enum Parsed<K> {
    Rsa(K),
    /// ECDSA key; the payload names the curve.
    Ecdsa(String),
    Ed25519,
    /// Any other algorithm, named as precisely as the encoding allows.
    Other(String),
}

impl<K> Parsed<K> {
    /// Human-readable algorithm name, used in type-mismatch errors.
    pub fn algorithm(&self) -> String {
        match self {
            Parsed::Rsa(_) => "RSA".to_string(),
            Parsed::Ecdsa(curve) => format!("ECDSA ({curve})"),
            Parsed::Ed25519 => "Ed25519".to_string(),
            Parsed::Other(name) => name.clone(),
        }
    }

    /// Unwrap the RSA arm, turning every other arm into a type mismatch.
    pub fn require_rsa(self, role: &'static str) -> Result<K, SealError> {
        match self {
            Parsed::Rsa(key) => Ok(key),
            other => Err(SealError::NotRsa {
                role,
                found: other.algorithm(),
            }),
        }
    }

    /// Convert the RSA payload, keeping non-RSA arms as they are.
    pub fn try_map<T, E>(self, f: impl FnOnce(K) -> Result<T, E>) -> Result<Parsed<T>, E> {
        Ok(match self {
            Parsed::Rsa(key) => Parsed::Rsa(f(key)?),
            Parsed::Ecdsa(curve) => Parsed::Ecdsa(curve),
            Parsed::Ed25519 => Parsed::Ed25519,
            Parsed::Other(name) => Parsed::Other(name),
        })
    }
}

/// Classify an X.509 / PKCS #8 algorithm identifier.
///
/// Returns `Parsed::Rsa(())` for rsaEncryption so the caller can decode the
/// key body with the matching RSA decoder.
pub(crate) fn classify_oid(
    algorithm: &rsa::pkcs8::AlgorithmIdentifierRef<'_>,
) -> Parsed<()> {
    match algorithm.oid {
        OID_RSA_ENCRYPTION => Parsed::Rsa(()),
        OID_EC_PUBLIC_KEY => {
            let curve = match algorithm.parameters_oid() {
                Ok(OID_SECP256R1) => "P-256".to_string(),
                Ok(OID_SECP384R1) => "P-384".to_string(),
                Ok(OID_SECP521R1) => "P-521".to_string(),
                Ok(other) => other.to_string(),
                Err(_) => "unknown curve".to_string(),
            };
            Parsed::Ecdsa(curve)
        }
        OID_ED25519 => Parsed::Ed25519,
        OID_X25519 => Parsed::Other("X25519".to_string()),
        OID_DSA => Parsed::Other("DSA".to_string()),
        other => Parsed::Other(format!("algorithm {other}")),
    }
}

/// Classify an SSH public key, converting RSA keys into the rsa crate type.
///
/// The RSA key is rebuilt from its mpints rather than through ssh-key's own
/// conversion, which refuses moduli under 2048 bits.
pub(crate) fn classify_ssh_public(
    key: &ssh_key::PublicKey,
) -> Result<Parsed<rsa::RsaPublicKey>, SealError> {
    use ssh_key::public::KeyData;

    Ok(match key.key_data() {
        KeyData::Rsa(rsa_key) => Parsed::Rsa(ssh_rsa_public(rsa_key)?),
        KeyData::Ecdsa(ec_key) => Parsed::Ecdsa(ec_key.curve().as_str().to_string()),
        KeyData::Ed25519(_) => Parsed::Ed25519,
        other => Parsed::Other(other.algorithm().to_string()),
    })
}

/// Classify a decrypted OpenSSH private key.
pub(crate) fn classify_ssh_private(
    key: &ssh_key::PrivateKey,
) -> Result<Parsed<rsa::RsaPrivateKey>, SealError> {
    use ssh_key::private::KeypairData;

    Ok(match key.key_data() {
        KeypairData::Rsa(keypair) => Parsed::Rsa(ssh_rsa_private(keypair)?),
        KeypairData::Ecdsa(keypair) => Parsed::Ecdsa(keypair.curve().as_str().to_string()),
        KeypairData::Ed25519(_) => Parsed::Ed25519,
        _ => Parsed::Other(key.algorithm().to_string()),
    })
}

fn mpint(value: &ssh_key::Mpint, field: &str) -> Result<BigUint, SealError> {
    value
        .as_positive_bytes()
        .map(BigUint::from_bytes_be)
        .ok_or_else(|| SealError::InvalidSshRsaKey(format!("{field} is not a positive integer")))
}

fn ssh_rsa_public(key: &ssh_key::public::RsaPublicKey) -> Result<rsa::RsaPublicKey, SealError> {
    let n = mpint(&key.n, "modulus")?;
    let e = mpint(&key.e, "public exponent")?;
    rsa::RsaPublicKey::new(n, e).map_err(|e| SealError::InvalidSshRsaKey(e.to_string()))
}

fn ssh_rsa_private(
    keypair: &ssh_key::private::RsaKeypair,
) -> Result<rsa::RsaPrivateKey, SealError> {
    let n = mpint(&keypair.public.n, "modulus")?;
    let e = mpint(&keypair.public.e, "public exponent")?;
    let d = mpint(&keypair.private.d, "private exponent")?;
    let p = mpint(&keypair.private.p, "prime p")?;
    let q = mpint(&keypair.private.q, "prime q")?;
    rsa::RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|e| SealError::InvalidSshRsaKey(e.to_string()))
}
