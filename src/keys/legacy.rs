//! OpenSSL "traditional" PEM encryption (`Proc-Type: 4,ENCRYPTED`).
//!
//! The key is derived with `EVP_BytesToKey` (MD5, one iteration, salt = first
//! eight IV bytes) and the body is decrypted with AES-CBC and PKCS #7 padding.

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use cbc::Decryptor;
use md5::{Digest, Md5};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::SealError;
use crate::pem::PemBlock;

const IV_LEN: usize = 16;
const SALT_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cipher {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl Cipher {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "AES-128-CBC" => Some(Cipher::Aes128Cbc),
            "AES-192-CBC" => Some(Cipher::Aes192Cbc),
            "AES-256-CBC" => Some(Cipher::Aes256Cbc),
            _ => None,
        }
    }

    fn key_len(self) -> usize {
        match self {
            Cipher::Aes128Cbc => 16,
            Cipher::Aes192Cbc => 24,
            Cipher::Aes256Cbc => 32,
        }
    }
}

/// Whether the block carries `Proc-Type: 4,ENCRYPTED`.
pub(crate) fn is_encrypted(block: &PemBlock) -> bool {
    block
        .header("Proc-Type")
        .is_some_and(|proc_type| proc_type.contains("ENCRYPTED"))
}

/// Cipher and IV from a `DEK-Info: AES-128-CBC,<hex IV>` header.
#[derive(Debug)]
pub(crate) struct DekInfo {
    cipher: Cipher,
    iv: [u8; IV_LEN],
}

impl DekInfo {
    /// Fails with [`SealError::LegacyPemEncryption`] for ciphers other than
    /// AES-CBC, before any passphrase is asked for.
    pub(crate) fn from_block(block: &PemBlock) -> Result<Self, SealError> {
        parse_dek_info(block.header("DEK-Info").unwrap_or_default())
    }

    /// Decrypt `body` with a key derived from `passphrase`. A bad padding
    /// block is reported as [`SealError::PemDecryptFailed`].
    pub(crate) fn decrypt(
        &self,
        body: &[u8],
        passphrase: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, SealError> {
        debug!(cipher = ?self.cipher, "pem key uses legacy encryption");
        let key = evp_bytes_to_key(passphrase, &self.iv[..SALT_LEN], self.cipher.key_len());
        let mut buf = Zeroizing::new(body.to_vec());
        let len = match self.cipher {
            Cipher::Aes128Cbc => decrypt_cbc::<Decryptor<Aes128>>(&key, &self.iv, &mut buf)?,
            Cipher::Aes192Cbc => decrypt_cbc::<Decryptor<Aes192>>(&key, &self.iv, &mut buf)?,
            Cipher::Aes256Cbc => decrypt_cbc::<Decryptor<Aes256>>(&key, &self.iv, &mut buf)?,
        };
        buf.truncate(len);
        Ok(buf)
    }
}

fn decrypt_cbc<D: KeyIvInit + BlockDecryptMut>(
    key: &[u8],
    iv: &[u8],
    buf: &mut [u8],
) -> Result<usize, SealError> {
    let decryptor = D::new_from_slices(key, iv).map_err(|_| SealError::PemDecryptFailed)?;
    decryptor
        .decrypt_padded_mut::<Pkcs7>(buf)
        .map(|plain| plain.len())
        .map_err(|_| SealError::PemDecryptFailed)
}

fn parse_dek_info(value: &str) -> Result<DekInfo, SealError> {
    let unsupported = || SealError::LegacyPemEncryption(value.to_string());
    let (name, iv_hex) = value.split_once(',').ok_or_else(unsupported)?;
    let cipher = Cipher::from_name(name.trim()).ok_or_else(unsupported)?;
    let iv: [u8; IV_LEN] = hex::decode(iv_hex.trim())
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(unsupported)?;
    Ok(DekInfo { cipher, iv })
}

/// OpenSSL `EVP_BytesToKey` with MD5 and an iteration count of one.
fn evp_bytes_to_key(passphrase: &[u8], salt: &[u8], key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut key = Zeroizing::new(Vec::with_capacity(key_len + 16));
    let mut prev: Option<md5::digest::Output<Md5>> = None;
    while key.len() < key_len {
        let mut hasher = Md5::new();
        if let Some(prev) = &prev {
            hasher.update(prev);
        }
        hasher.update(passphrase);
        hasher.update(salt);
        let digest = hasher.finalize();
        key.extend_from_slice(&digest);
        prev = Some(digest);
    }
    key.truncate(key_len);
    key
}
