//! RFC 4716 ("SSH2") public key blocks.
//!
//! ```text
//! ---- BEGIN SSH2 PUBLIC KEY ----
//! Comment: "2048-bit RSA, converted by alice@host from OpenSSH"
//! AAAAB3NzaC1yc2EAAAADAQABAAABAQC...
//! ---- END SSH2 PUBLIC KEY ----
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::SealError;

const SSH2_BEGIN: &str = "---- BEGIN SSH2 PUBLIC KEY ----";
const SSH2_END: &str = "---- END SSH2 PUBLIC KEY ----";

/// Parse an SSH2 public key block into an SSH public key.
///
/// Header lines (`Comment:` and any other `Tag: value` line, including
/// backslash continuations) are skipped; the remaining body lines are joined
/// and base64-decoded into the SSH wire-format key blob.
pub fn parse_ssh2_public_key(text: &str) -> Result<ssh_key::PublicKey, SealError> {
    let mut body = String::new();
    let mut in_key = false;
    let mut found_begin = false;
    let mut continuation = false;

    for raw_line in text.split('\n') {
        let line = raw_line.trim();
        if line == SSH2_BEGIN {
            in_key = true;
            found_begin = true;
            continue;
        }
        if line == SSH2_END {
            break;
        }
        if !in_key {
            continue;
        }
        if continuation {
            continuation = line.ends_with('\\');
            continue;
        }
        if line.starts_with("Comment:") || is_header(line) {
            continuation = line.ends_with('\\');
            continue;
        }
        body.push_str(line);
    }

    if !found_begin {
        return Err(SealError::InvalidSsh2PublicKey(
            "missing BEGIN SSH2 PUBLIC KEY line".to_string(),
        ));
    }

    let blob = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| SealError::InvalidSsh2PublicKey(format!("base64 decoding error: {e}")))?;
    ssh_key::PublicKey::from_bytes(&blob)
        .map_err(|e| SealError::InvalidSsh2PublicKey(e.to_string()))
}

/// RFC 4716 header: a tag of printable non-space characters followed by a colon.
/// Base64 body lines never contain a colon.
fn is_header(line: &str) -> bool {
    match line.split_once(':') {
        Some((tag, _)) => !tag.is_empty() && !tag.contains(char::is_whitespace),
        None => false,
    }
}
