use thiserror::Error;

/// Errors raised while locating key material or running the envelope protocol.
///
/// Every variant is terminal for the call that produced it; nothing in this
/// crate retries.
#[derive(Error, Debug)]
pub enum SealError {
    #[error("rsa envelope: pem file decoding failed")]
    PemDecodingFailed,

    #[error("rsa envelope: not public key in PKCS #1, ASN.1 DER form: {0}")]
    InvalidPkcs1PublicKey(#[source] rsa::pkcs1::Error),

    #[error("rsa envelope: error parsing PKIX public key: {0}")]
    InvalidPkixPublicKey(String),

    #[error("rsa envelope: unsupported key type {0:?}")]
    UnsupportedKeyType(String),

    #[error("rsa envelope: requiring RSA {role}, not {found}")]
    NotRsa { role: &'static str, found: String },

    #[error("rsa envelope: invalid SSH2 public key: {0}")]
    InvalidSsh2PublicKey(String),

    #[error("rsa envelope: invalid SSH RSA key: {0}")]
    InvalidSshRsaKey(String),

    #[error("rsa envelope: no private key found")]
    NoPrivateKey,

    #[error("rsa envelope: invalid {encoding} private key: {reason}")]
    InvalidPrivateKey {
        encoding: &'static str,
        reason: String,
    },

    #[error("rsa envelope: unsupported PEM encryption {0:?}; convert the key to PKCS #8 or OpenSSH format")]
    LegacyPemEncryption(String),

    #[error("rsa envelope: decrypt PEM private key failed")]
    PemDecryptFailed,

    #[error("rsa envelope: decrypt OpenSSH private key failed: {0}")]
    OpenSshDecryptFailed(#[source] ssh_key::Error),

    #[error("rsa envelope: decrypt PKCS #8 private key failed")]
    Pkcs8DecryptFailed,

    #[error("rsa envelope: passphrase unavailable: {0}")]
    Passphrase(String),

    #[error("rsa envelope: reading random secret failed: {0}")]
    Random(#[source] rand::Error),

    #[error("rsa envelope: encrypting secret key failed: {0}")]
    EncryptFailed(#[source] rsa::Error),

    #[error("rsa envelope: ciphertext is not valid base64: {0}")]
    CiphertextDecode(#[source] base64::DecodeError),

    #[error("rsa envelope: decrypting secret key failed: {0}")]
    DecryptFailed(#[source] rsa::Error),

    #[error("rsa envelope: digest mismatch. expect {expected:?}, actual {actual:?}")]
    DigestMismatch { expected: String, actual: String },

    #[error("rsa envelope: metadata has no rsa envelope record")]
    MissingRecord,
}
