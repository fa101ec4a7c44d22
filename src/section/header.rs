//! Section header encode/decode (component C7). Every section on disk
//! begins with one of these headers: a one-character kind tag, sizing
//! numerals (one per array dimension the kind needs), and a user string,
//! each field written with the same fixed-length padding convention as
//! the file header (spec.md §3, §4.1).
//!
//! The file-header assembly in `sc_scda_fopen_write` (`sc_scda.c`) is the
//! direct model for field layout; the retrieved source does not carry
//! the section-header writer itself, so the numeral field width below
//! (`NUMERAL_FIELD`) is this crate's own choice, sized generously enough
//! to hold the 26-digit maximum block length spec.md §4.7 allows — see
//! DESIGN.md for the rationale.

use crate::error::{ErrorCode, ScdaError};
use crate::pad;

/// Byte width of a section header text line is 24+4=28 raw digits of
/// headroom, comfortably above the 26-digit ceiling on `N` in spec.md
/// §4.7 ("N ≤ 10^26 - 1").
pub const NUMERAL_FIELD: usize = 32;

/// Same field width the file header uses for the user string (spec.md §3).
pub const USER_STRING_FIELD: usize = 62;

/// Maximum content length of a user string (spec.md §3 invariant 5).
pub const USER_STRING_MAX: usize = USER_STRING_FIELD - 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Inline,
    Block,
    Array,
    VarArray,
}

impl SectionKind {
    pub fn tag(self) -> u8 {
        match self {
            SectionKind::Inline => b'I',
            SectionKind::Block => b'B',
            SectionKind::Array => b'A',
            SectionKind::VarArray => b'V',
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, ErrorCode> {
        match tag {
            b'I' => Ok(SectionKind::Inline),
            b'B' => Ok(SectionKind::Block),
            b'A' => Ok(SectionKind::Array),
            b'V' => Ok(SectionKind::VarArray),
            _ => Err(ErrorCode::from_scda(ScdaError::Format)),
        }
    }
}

/// Parsed numeric payload of a section header; which fields are present
/// depends on `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionDims {
    /// `N` for Block, `C` for Array/VarArray. Unused for Inline.
    pub count: u64,
    /// `S` for Array. Unused otherwise.
    pub elem_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionHeader {
    pub kind: SectionKind,
    pub dims: SectionDims,
    pub user_string: Vec<u8>,
}

impl SectionHeader {
    pub fn new(kind: SectionKind, dims: SectionDims, user_string: &[u8]) -> Result<Self, ErrorCode> {
        validate_user_string(user_string)?;
        Ok(SectionHeader {
            kind,
            dims,
            user_string: user_string.to_vec(),
        })
    }

    /// Serializes the header to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(self.kind.tag());
        out.push(b' ');
        match self.kind {
            SectionKind::Inline => {}
            SectionKind::Block => {
                out.extend_from_slice(&pad::pad_to_fix_len(
                    self.dims.count.to_string().as_bytes(),
                    NUMERAL_FIELD,
                ));
            }
            SectionKind::Array => {
                out.extend_from_slice(&pad::pad_to_fix_len(
                    self.dims.count.to_string().as_bytes(),
                    NUMERAL_FIELD,
                ));
                out.extend_from_slice(&pad::pad_to_fix_len(
                    self.dims.elem_size.to_string().as_bytes(),
                    NUMERAL_FIELD,
                ));
            }
            SectionKind::VarArray => {
                out.extend_from_slice(&pad::pad_to_fix_len(
                    self.dims.count.to_string().as_bytes(),
                    NUMERAL_FIELD,
                ));
            }
        }
        out.extend_from_slice(&pad::pad_to_fix_len(&self.user_string, USER_STRING_FIELD));
        out
    }

    /// Byte length of the encoded header for this kind, without writing it.
    pub fn encoded_len_for(kind: SectionKind) -> usize {
        let numerals = match kind {
            SectionKind::Inline => 0,
            SectionKind::Block | SectionKind::VarArray => NUMERAL_FIELD,
            SectionKind::Array => 2 * NUMERAL_FIELD,
        };
        2 + numerals + USER_STRING_FIELD
    }

    pub fn encoded_len(&self) -> usize {
        Self::encoded_len_for(self.kind)
    }

    /// Parses a header from `buf`, which must be exactly
    /// `encoded_len_for(kind)` bytes for the kind found at `buf[0]`.
    /// Callers that don't yet know the kind should first peek `buf[0]`
    /// and read exactly that many bytes before calling this.
    pub fn decode(buf: &[u8]) -> Result<Self, ErrorCode> {
        if buf.len() < 2 || buf[1] != b' ' {
            return Err(ErrorCode::from_scda(ScdaError::Format));
        }
        let kind = SectionKind::from_tag(buf[0])?;
        let mut pos = 2;

        let dims = match kind {
            SectionKind::Inline => SectionDims::default(),
            SectionKind::Block => {
                let count = read_numeral(buf, &mut pos)?;
                SectionDims { count, elem_size: 0 }
            }
            SectionKind::Array => {
                let count = read_numeral(buf, &mut pos)?;
                let elem_size = read_numeral(buf, &mut pos)?;
                SectionDims { count, elem_size }
            }
            SectionKind::VarArray => {
                let count = read_numeral(buf, &mut pos)?;
                SectionDims { count, elem_size: 0 }
            }
        };

        if buf.len() < pos + USER_STRING_FIELD {
            return Err(ErrorCode::from_scda(ScdaError::Format));
        }
        let user_string =
            pad::get_pad_to_fix_len(&buf[pos..pos + USER_STRING_FIELD])?.to_vec();
        pos += USER_STRING_FIELD;
        if pos != buf.len() {
            return Err(ErrorCode::from_scda(ScdaError::Format));
        }

        Ok(SectionHeader {
            kind,
            dims,
            user_string,
        })
    }
}

fn read_numeral(buf: &[u8], pos: &mut usize) -> Result<u64, ErrorCode> {
    if buf.len() < *pos + NUMERAL_FIELD {
        return Err(ErrorCode::from_scda(ScdaError::Format));
    }
    let raw = pad::get_pad_to_fix_len(&buf[*pos..*pos + NUMERAL_FIELD])?;
    let text = std::str::from_utf8(raw).map_err(|_| ErrorCode::from_scda(ScdaError::Format))?;
    let value = text.parse::<u64>().map_err(|_| ErrorCode::from_scda(ScdaError::Format))?;
    *pos += NUMERAL_FIELD;
    Ok(value)
}

/// Validates a user string per spec.md §3 invariant 5: at most
/// [`USER_STRING_MAX`] bytes of content, nul-free. An overlong or
/// NUL-containing user string is a caller-input error, not a workflow
/// error (spec.md's `INPUT` category).
pub fn validate_user_string(s: &[u8]) -> Result<(), ErrorCode> {
    if s.len() > USER_STRING_MAX || s.contains(&0) {
        Err(ErrorCode::from_scda(ScdaError::Input))
    } else {
        Ok(())
    }
}

/// The user-string convention marker that flags a section as the first
/// half of an encoded (C2-wrapped) pair, per spec.md §4.7 "Encoded
/// variants". A reader checks for exactly this prefix before attempting
/// to chain the decode through [`crate::envelope`].
pub const ENCODED_CONVENTION_PREFIX: &[u8] = b"scda:encoded:zlib";

pub fn is_encoded_convention(user_string: &[u8]) -> bool {
    user_string.starts_with(ENCODED_CONVENTION_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_header_round_trips() {
        let h = SectionHeader::new(SectionKind::Inline, SectionDims::default(), b"hi").unwrap();
        let buf = h.encode();
        assert_eq!(buf.len(), SectionHeader::encoded_len_for(SectionKind::Inline));
        let parsed = SectionHeader::decode(&buf).unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn block_header_round_trips_with_large_count() {
        let dims = SectionDims {
            count: 99_999_999_999_999_999,
            elem_size: 0,
        };
        let h = SectionHeader::new(SectionKind::Block, dims, b"").unwrap();
        let buf = h.encode();
        let parsed = SectionHeader::decode(&buf).unwrap();
        assert_eq!(parsed.dims.count, dims.count);
    }

    #[test]
    fn array_header_round_trips_both_numerals() {
        let dims = SectionDims {
            count: 1234,
            elem_size: 8,
        };
        let h = SectionHeader::new(SectionKind::Array, dims, b"floats").unwrap();
        let buf = h.encode();
        let parsed = SectionHeader::decode(&buf).unwrap();
        assert_eq!(parsed.dims, dims);
        assert_eq!(parsed.user_string, b"floats");
    }

    #[test]
    fn rejects_user_string_with_embedded_nul() {
        assert!(SectionHeader::new(SectionKind::Inline, SectionDims::default(), b"a\0b").is_err());
    }

    #[test]
    fn rejects_oversized_user_string() {
        let too_long = vec![b'x'; USER_STRING_MAX + 1];
        assert!(SectionHeader::new(SectionKind::Inline, SectionDims::default(), &too_long).is_err());
    }

    #[test]
    fn rejects_unknown_kind_tag() {
        let mut buf = vec![b'?', b' '];
        buf.extend_from_slice(&pad::pad_to_fix_len(b"", USER_STRING_FIELD));
        assert!(SectionHeader::decode(&buf).is_err());
    }

    #[test]
    fn encoded_convention_prefix_is_detected() {
        assert!(is_encoded_convention(b"scda:encoded:zlib"));
        assert!(!is_encoded_convention(b"plain"));
    }
}
