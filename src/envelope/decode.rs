//! Envelope decoding: the inverse of [`super::encode`]. Grounded in
//! `sc_io_decode_info`/`sc_io_decode` in `sc_io.c`, generalized to a
//! configurable two-byte line break per spec.md §4.2.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use std::io::Read as _;

use crate::envelope::deflate_fallback;
use crate::envelope::types::{DEFAULT_BREAK_BYTES, FORMAT_TAG_ZLIB, PREAMBLE_LEN};
use crate::error::{ErrorCode, ScdaError};

/// Splits `text` on occurrences of `break_bytes`, returning each segment
/// between breaks (final dangling segment, if non-empty, included).
fn split_on_breaks<'a>(text: &'a [u8], break_bytes: [u8; 2]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + 1 < text.len() {
        if text[i] == break_bytes[0] && text[i + 1] == break_bytes[1] {
            segments.push(&text[start..i]);
            i += 2;
            start = i;
            continue;
        }
        i += 1;
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

/// Reads just the 9-byte preamble (original length + format tag) out of a
/// base64-armored buffer, without decompressing the payload. Mirrors
/// `sc_io_decode_info`'s "peek without fully decoding" contract. Never
/// panics on malformed input.
pub fn decode_info(armored: &[u8]) -> Result<(u64, u8), ErrorCode> {
    decode_info_with_breaks(armored, DEFAULT_BREAK_BYTES)
}

pub fn decode_info_with_breaks(armored: &[u8], break_bytes: [u8; 2]) -> Result<(u64, u8), ErrorCode> {
    if armored.is_empty() || *armored.last().unwrap() != 0 {
        return Err(ErrorCode::from_scda(ScdaError::Input));
    }
    let text = &armored[..armored.len() - 1];
    let first_line = split_on_breaks(text, break_bytes)
        .into_iter()
        .next()
        .ok_or_else(|| ErrorCode::from_scda(ScdaError::Decode))?;
    let decoded = BASE64
        .decode(first_line)
        .map_err(|_| ErrorCode::from_scda(ScdaError::Decode))?;
    if decoded.len() < PREAMBLE_LEN {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&decoded[..8]);
    Ok((u64::from_be_bytes(len_bytes), decoded[8]))
}

/// Fully decodes a base64-armored, zlib-or-stored-framed buffer back to
/// its original bytes, using the default break bytes.
pub fn decode(armored: &[u8], expected_len: usize) -> Result<Vec<u8>, ErrorCode> {
    decode_with_breaks(armored, expected_len, DEFAULT_BREAK_BYTES)
}

/// As [`decode`], but with a caller-chosen line-break byte pair.
/// `expected_len` bounds the allocation the caller is willing to make; a
/// preamble claiming more is rejected as [`ScdaError::Decode`] rather than
/// trusted blindly.
pub fn decode_with_breaks(
    armored: &[u8],
    expected_len: usize,
    break_bytes: [u8; 2],
) -> Result<Vec<u8>, ErrorCode> {
    if armored.is_empty() || *armored.last().unwrap() != 0 {
        return Err(ErrorCode::from_scda(ScdaError::Input));
    }
    let text = &armored[..armored.len() - 1];

    let mut framed = Vec::new();
    for segment in split_on_breaks(text, break_bytes) {
        let chunk = BASE64
            .decode(segment)
            .map_err(|_| ErrorCode::from_scda(ScdaError::Decode))?;
        framed.extend_from_slice(&chunk);
    }

    if framed.len() < PREAMBLE_LEN {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&framed[..8]);
    let original_len = u64::from_be_bytes(len_bytes) as usize;
    let format_tag = framed[8];
    if format_tag != FORMAT_TAG_ZLIB {
        return Err(ErrorCode::from_scda(ScdaError::Input));
    }
    if original_len > expected_len {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }

    let compressed = &framed[PREAMBLE_LEN..];
    let mut out = vec![0u8; original_len];

    // A real zlib stream (flate2) and our stored-blocks fallback share the
    // same two-byte header, so try the fast path first and fall back to
    // the hand-rolled reader if it isn't a deflate stream flate2 accepts.
    let mut decoder = ZlibDecoder::new(compressed);
    let mut scratch = Vec::with_capacity(original_len);
    if decoder.read_to_end(&mut scratch).is_ok() && scratch.len() == original_len {
        out.copy_from_slice(&scratch);
        return Ok(out);
    }

    deflate_fallback::nonuncompress(&mut out, compressed)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::encode::{encode, CompressionMode};

    #[test]
    fn decode_info_reports_original_length_and_tag() {
        let data = vec![1u8; 1000];
        let armored = encode(&data, CompressionMode::Stored).unwrap();
        let (len, tag) = decode_info(&armored).unwrap();
        assert_eq!(len, 1000);
        assert_eq!(tag, FORMAT_TAG_ZLIB);
    }

    #[test]
    fn decode_info_never_panics_on_garbage() {
        for garbage in [&b""[..], &b"\0"[..], &b"not base64 at all!!\0"[..], &[0xFFu8; 20][..]] {
            let _ = decode_info(garbage);
        }
    }

    #[test]
    fn decode_rejects_oversized_preamble_claim() {
        let data = vec![1u8; 10];
        let armored = encode(&data, CompressionMode::Stored).unwrap();
        assert!(decode(&armored, 5).is_err());
    }

    #[test]
    fn decode_rejects_missing_nul_terminator() {
        let data = vec![1u8; 10];
        let mut armored = encode(&data, CompressionMode::Stored).unwrap();
        armored.pop();
        assert!(decode(&armored, 10).is_err());
    }

    #[test]
    fn decode_rejects_corrupted_base64() {
        let data = vec![1u8; 10];
        let mut armored = encode(&data, CompressionMode::Stored).unwrap();
        armored[0] = b'!';
        assert!(decode(&armored, 10).is_err());
    }
}
