//! Session: owns one metadata document and one key, and runs either a seal
//! or an unseal over them.
//!
//! The mode is not chosen by the caller. A document without an RSA envelope
//! record is sealed (the key bytes must be a public key); a document with one
//! is unsealed (the key bytes must be the matching private key).

use tracing::info;
use zeroize::Zeroizing;

use crate::crypto::{self, SecretKey};
use crate::error::SealError;
use crate::keys::{self, KeyEncoding};
use crate::passphrase::PassphraseSource;
use crate::record::Metadata;

/// Which half of the protocol [`RsaSession::setup`] will run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Seal,
    Unseal,
}

/// Not reentrant: a session seals or unseals once. Independent sessions share
/// nothing.
pub struct RsaSession {
    meta: Metadata,
    key_bytes: Zeroizing<Vec<u8>>,
    secret: Option<SecretKey>,
    encoding: Option<KeyEncoding>,
}

impl RsaSession {
    pub fn new(meta: Metadata, key_bytes: Vec<u8>) -> Self {
        RsaSession {
            meta,
            key_bytes: Zeroizing::new(key_bytes),
            secret: None,
            encoding: None,
        }
    }

    pub fn mode(&self) -> Mode {
        if self.meta.rsa.is_some() {
            Mode::Unseal
        } else {
            Mode::Seal
        }
    }

    /// Run the protocol for the current mode.
    ///
    /// On success the secret is available through [`RsaSession::secret`]. On
    /// failure the session holds no secret and the document is unchanged.
    /// `passphrase` is consulted only when an unseal meets a protected key.
    pub fn setup(&mut self, passphrase: &dyn PassphraseSource) -> Result<(), SealError> {
        match self.mode() {
            Mode::Seal => {
                let material = keys::locate_public_key(&self.key_bytes)?;
                let (record, secret) = crypto::seal(&material.key)?;
                info!(encoding = %material.encoding, digest = %record.digest, "sealed new envelope");
                self.meta.timestamp = record.timestamp;
                self.meta.rsa = Some(record);
                self.encoding = Some(material.encoding);
                self.secret = Some(secret);
            }
            Mode::Unseal => {
                let record = self.meta.record()?;
                let material = keys::locate_private_key(&self.key_bytes, passphrase)?;
                let secret = crypto::unseal(&material.key, record)?;
                info!(encoding = %material.encoding, digest = %record.digest, "unsealed envelope");
                self.encoding = Some(material.encoding);
                self.secret = Some(secret);
            }
        }
        Ok(())
    }

    /// The live secret, present only after a successful [`RsaSession::setup`].
    pub fn secret(&self) -> Option<&SecretKey> {
        self.secret.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.meta
    }

    pub fn into_metadata(self) -> Metadata {
        self.meta
    }

    /// Encoding the key bytes were read as, once `setup` has parsed them.
    pub fn encoding(&self) -> Option<KeyEncoding> {
        self.encoding
    }
}
