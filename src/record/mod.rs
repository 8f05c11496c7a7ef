//! Record module: the persisted envelope record and the metadata document
//! that carries it.
//!
//! `EnvelopeRecord` holds everything needed to recover a sealed secret given
//! the matching private key: the OAEP ciphertext, an integrity digest of the
//! plaintext secret and the creation time. It is embedded in [`Metadata`],
//! the document written by `rsaseal seal` and read back by `rsaseal unseal`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SealError;

/// One RSA envelope.
///
/// Fields are in alphabetical order so the serialized JSON is deterministic
/// without the `preserve_order` serde_json feature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeRecord {
    /// RSA-OAEP ciphertext of the secret, URL-safe base64 with padding.
    pub ciphertext: String,
    /// Digest of the plaintext secret. Integrity check only, never secret.
    pub digest: String,
    /// When the envelope was sealed (RFC 3339 on the wire).
    pub timestamp: DateTime<Utc>,
}

/// Key kind tag of the metadata document. Only RSA envelopes exist here.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Rsa,
}

/// The document persisted next to the protected data.
///
/// `rsa` is absent until a seal has run; its presence is what switches a
/// session into unseal mode.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub key: KeyKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsa: Option<EnvelopeRecord>,
    pub timestamp: DateTime<Utc>,
}

impl Metadata {
    /// Fresh document with no envelope yet.
    pub fn new() -> Self {
        Metadata {
            key: KeyKind::Rsa,
            rsa: None,
            timestamp: Utc::now(),
        }
    }

    /// Wrap an existing envelope; the document timestamp follows the record.
    pub fn with_record(record: EnvelopeRecord) -> Self {
        Metadata {
            key: KeyKind::Rsa,
            timestamp: record.timestamp,
            rsa: Some(record),
        }
    }

    /// The envelope, or [`SealError::MissingRecord`] when nothing was sealed.
    pub fn record(&self) -> Result<&EnvelopeRecord, SealError> {
        self.rsa.as_ref().ok_or(SealError::MissingRecord)
    }

    /// Pretty JSON for writing to disk or stdout.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}
