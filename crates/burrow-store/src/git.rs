//! Git-style blob envelope codec.
//!
//! On-disk format:
//! ```text
//! "blob " <decimal length> NUL <length bytes of content>
//! ```
//!
//! The decimal length may be at most [`MAX_SIZE_LENGTH`] characters; longer
//! strings are rejected before any numeric parsing is attempted.

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::object::Blob;

/// Header tag, including the separating space.
const HEADER_TAG: &[u8] = b"blob ";

/// Long enough to represent any legitimate content length.
pub const MAX_SIZE_LENGTH: usize = 25;

/// Decode an envelope held in a shared buffer.
///
/// The returned blob is a slice of `data`: the content bytes are not copied.
pub fn decode_git_blob(data: Bytes) -> StoreResult<Blob> {
    let start = content_offset(&data)?;
    Ok(Blob::new(data.slice(start..)))
}

/// Decode an envelope from a borrowed buffer.
///
/// The content is copied because the decoded blob may outlive `data`.
pub fn decode_git_blob_from_slice(data: &[u8]) -> StoreResult<Blob> {
    let start = content_offset(data)?;
    Ok(Blob::new(Bytes::copy_from_slice(&data[start..])))
}

/// Wrap `contents` in an envelope.
pub fn encode_git_blob(contents: &[u8]) -> Vec<u8> {
    let size = contents.len().to_string();
    let mut out = Vec::with_capacity(HEADER_TAG.len() + size.len() + 1 + contents.len());
    out.extend_from_slice(HEADER_TAG);
    out.extend_from_slice(size.as_bytes());
    out.push(0);
    out.extend_from_slice(contents);
    out
}

/// Validate the header and return the offset of the first content byte.
fn content_offset(data: &[u8]) -> StoreResult<usize> {
    if !data.starts_with(HEADER_TAG) {
        return Err(StoreError::MalformedEnvelope(
            "contents did not start with expected header".into(),
        ));
    }
    let rest = &data[HEADER_TAG.len()..];

    let nul = rest
        .iter()
        .take(MAX_SIZE_LENGTH + 1)
        .position(|&b| b == 0)
        .ok_or_else(|| {
            StoreError::MalformedEnvelope(format!(
                "no length terminator within {MAX_SIZE_LENGTH} bytes"
            ))
        })?;
    let size_str = &rest[..nul];
    if size_str.is_empty() || !size_str.iter().all(u8::is_ascii_digit) {
        return Err(StoreError::MalformedEnvelope(format!(
            "invalid length string {:?}",
            String::from_utf8_lossy(size_str)
        )));
    }
    // All ASCII digits, so this is valid UTF-8.
    let declared: u64 = std::str::from_utf8(size_str)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| StoreError::MalformedEnvelope("length does not fit in 64 bits".into()))?;

    let start = HEADER_TAG.len() + nul + 1;
    let remaining = (data.len() - start) as u64;
    if declared != remaining {
        return Err(StoreError::MalformedEnvelope(format!(
            "size in header ({declared}) should match contents ({remaining})"
        )));
    }
    Ok(start)
}
