//! PEM block scanner.
//!
//! Decodes concatenated PEM blocks out of an arbitrary byte buffer. Text
//! before, between and after blocks is ignored, as are candidate blocks whose
//! body is not valid base64 or whose END line is missing. RFC 1421 style
//! headers (`Proc-Type: 4,ENCRYPTED`) are kept on the block so callers can
//! detect legacy encryption.

use tracing::debug;

const BEGIN: &[u8] = b"-----BEGIN ";
const END: &[u8] = b"-----END ";
const DASHES: &[u8] = b"-----";

/// A single decoded PEM block.
#[derive(Debug, Clone)]
pub struct PemBlock {
    /// The label between `BEGIN ` and the trailing dashes, e.g. `PUBLIC KEY`.
    pub label: String,
    /// Base64-decoded body.
    pub contents: Vec<u8>,
    headers: pem::HeaderMap,
}

impl PemBlock {
    /// Look up an RFC 1421 header such as `DEK-Info`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }
}

impl From<pem::Pem> for PemBlock {
    fn from(block: pem::Pem) -> Self {
        PemBlock {
            label: block.tag().to_string(),
            headers: block.headers().clone(),
            contents: block.into_contents(),
        }
    }
}

/// Decode every PEM block in `input`, in order.
///
/// Stops at the first position where no further block can be found, or at a
/// block whose label is empty. The result is materialized eagerly so callers
/// can look at the first block's label directly.
pub fn decode_blocks(input: &[u8]) -> Vec<PemBlock> {
    let mut blocks = Vec::new();
    let mut rest = input;
    while let Some((block, next)) = decode(rest) {
        if block.label.is_empty() {
            break;
        }
        blocks.push(block);
        rest = next;
    }
    blocks
}

/// Decode the first PEM block in `input`, returning it together with the
/// unconsumed remainder of the buffer.
///
/// Framing is located here (BEGIN at the start of a line, a matching END
/// line); the block itself is parsed by the `pem` crate. A candidate that
/// fails to parse is skipped and the search resumes after its BEGIN line.
pub fn decode(input: &[u8]) -> Option<(PemBlock, &[u8])> {
    let mut rest = input;
    loop {
        let start = if rest.starts_with(BEGIN) {
            0
        } else {
            find(rest, b"\n-----BEGIN ")? + 1
        };
        let candidate = &rest[start..];
        let after_begin = &candidate[BEGIN.len()..];
        rest = after_begin;

        let type_line = first_line(after_begin);
        let Some(label) = type_line.strip_suffix(DASHES) else {
            continue;
        };
        if label.is_empty() {
            // The pem crate refuses an empty tag; hand it back so
            // `decode_blocks` can stop here.
            let empty = PemBlock {
                label: String::new(),
                contents: Vec::new(),
                headers: pem::HeaderMap::default(),
            };
            return Some((empty, skip_line(after_begin)));
        }

        let mut end_marker = END.to_vec();
        end_marker.extend_from_slice(label);
        end_marker.extend_from_slice(DASHES);
        let Some(end_idx) = find(after_begin, &end_marker) else {
            continue;
        };
        let block_len = BEGIN.len() + end_idx + end_marker.len();
        let (span, tail) = candidate.split_at(block_len);

        match pem::parse(span) {
            Ok(block) => return Some((block.into(), skip_line(tail))),
            Err(e) => debug!(error = %e, "skipping malformed pem block"),
        }
    }
}

/// The first line of `data`, without its line ending.
fn first_line(data: &[u8]) -> &[u8] {
    let line = match data.iter().position(|&b| b == b'\n') {
        Some(i) => &data[..i],
        None => data,
    };
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Drop the remainder of the current line, including its newline.
fn skip_line(data: &[u8]) -> &[u8] {
    match data.iter().position(|&b| b == b'\n') {
        Some(i) => &data[i + 1..],
        None => &data[data.len()..],
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
