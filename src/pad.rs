//! Padding codec (component C1) — two length-preserving ASCII padding schemes.
//!
//! Ported from `sc_scda_pad_to_fix_len` / `sc_scda_get_pad_to_fix_len` and
//! `sc_scda_pad_to_mod` / `sc_scda_get_pad_to_mod` in `sc_scda.c`. Both schemes
//! operate on plain byte slices; neither performs I/O, which keeps them
//! trivially unit-testable independent of a file or a communicator.

use crate::error::ScdaError;

/// Divisor for modular (variable-length) padding.
pub const PADDING_MOD: usize = 32;

/// Pad `raw` to an exact length `pad_len` using the `' ' '-'* '\n'` alphabet.
///
/// `raw.len()` must be at most `pad_len - 4`; the caller (the section/header
/// writers) is responsible for enforcing the field widths that make this
/// true, since a violation here is a programming error, not user input.
pub fn pad_to_fix_len(raw: &[u8], pad_len: usize) -> Vec<u8> {
    assert!(pad_len >= 4 && raw.len() <= pad_len - 4);

    let mut out = vec![0u8; pad_len];
    out[..raw.len()].copy_from_slice(raw);
    out[raw.len()] = b' ';
    for b in out.iter_mut().take(pad_len - 1).skip(raw.len() + 1) {
        *b = b'-';
    }
    out[pad_len - 1] = b'\n';
    out
}

/// Recover the raw content from a fixed-length padded field.
///
/// Returns [`ScdaError::Format`] if `padded` does not end in `'\n'`, or the
/// run of `'-'` immediately before it is not itself preceded by a single
/// `' '` separator.
pub fn get_pad_to_fix_len(padded: &[u8]) -> Result<&[u8], ScdaError> {
    let pad_len = padded.len();
    if pad_len < 4 {
        return Err(ScdaError::Format);
    }
    if padded[pad_len - 1] != b'\n' {
        return Err(ScdaError::Format);
    }

    let mut si = pad_len - 2;
    while si != 0 && padded[si] == b'-' {
        si -= 1;
    }
    if padded[si] != b' ' {
        return Err(ScdaError::Format);
    }

    Ok(&padded[..si])
}

/// Number of padding bytes `pad_to_mod` appends for a raw region of `raw_len`
/// bytes: the smallest value in `[7, 38]` congruent to 0 mod 32 once added to
/// `raw_len` — i.e. `(32 - raw_len % 32) % 32`, bumped by 32 if that would be
/// under the 7-byte minimum.
pub fn pad_to_mod_len(raw_len: usize) -> usize {
    let mut n = (PADDING_MOD - (raw_len % PADDING_MOD)) % PADDING_MOD;
    if n < 7 {
        n += PADDING_MOD;
    }
    n
}

/// Pad `raw` with the modular (`'='`/`'\n'`) scheme.
///
/// The boundary byte right after `raw` is `'='` when `raw` is non-empty and
/// already ends in `'\n'`, and `'\n'` otherwise — this keeps a section whose
/// payload is itself text (e.g. a nested armored envelope already ending in
/// a newline) from producing an ambiguous `'\n' '\n'` run at the seam.
pub fn pad_to_mod(raw: &[u8]) -> Vec<u8> {
    let k = pad_to_mod_len(raw.len());
    debug_assert!((7..=(PADDING_MOD + 6)).contains(&k));

    let mut out = vec![0u8; raw.len() + k];
    out[..raw.len()].copy_from_slice(raw);

    let boundary = if !raw.is_empty() && raw[raw.len() - 1] == b'\n' {
        b'='
    } else {
        b'\n'
    };
    out[raw.len()] = boundary;
    out[raw.len() + 1] = b'=';
    for b in out.iter_mut().take(raw.len() + k - 2).skip(raw.len() + 2) {
        *b = b'=';
    }
    out[raw.len() + k - 2] = b'\n';
    out[raw.len() + k - 1] = b'\n';
    out
}

/// Same tail bytes `pad_to_mod` appends after `raw`, without requiring the
/// raw bytes to be held in one contiguous buffer — the array/varray section
/// writers stream their payload directly from each rank, so only the total
/// length and the value of the last written byte (to pick the boundary
/// byte) are available, not the whole buffer.
pub fn pad_to_mod_tail(raw_len: usize, last_byte_is_newline: bool) -> Vec<u8> {
    let k = pad_to_mod_len(raw_len);
    let mut out = vec![0u8; k];
    let boundary = if raw_len != 0 && last_byte_is_newline {
        b'='
    } else {
        b'\n'
    };
    out[0] = boundary;
    out[1] = b'=';
    for b in out.iter_mut().take(k - 2).skip(2) {
        *b = b'=';
    }
    out[k - 2] = b'\n';
    out[k - 1] = b'\n';
    out
}

/// Recover the raw content from a modular-padded region, given the declared
/// raw length (sizing numerals in the owning section header supply this —
/// modular padding carries no internal length field of its own).
pub fn get_pad_to_mod(padded: &[u8], raw_len: usize) -> Result<&[u8], ScdaError> {
    let num_pad_bytes = pad_to_mod_len(raw_len);
    if num_pad_bytes + raw_len != padded.len() {
        return Err(ScdaError::Format);
    }
    let padded_len = padded.len();
    debug_assert!(padded_len >= 7);

    if padded[padded_len - 1] != b'\n' || padded[padded_len - 2] != b'\n' {
        return Err(ScdaError::Format);
    }

    let mut si = padded_len - 3;
    while si != padded_len - num_pad_bytes {
        if padded[si] != b'=' {
            return Err(ScdaError::Format);
        }
        si -= 1;
    }
    debug_assert_eq!(si, raw_len);

    // The boundary byte at `raw_len` must be '=' exactly when the raw region
    // is non-empty and already ended in '\n'; otherwise it must be '\n'.
    let expect_equals = raw_len != 0 && padded[raw_len - 1] == b'\n';
    let boundary_ok = if expect_equals {
        padded[si] == b'='
    } else {
        padded[si] == b'\n'
    };
    if !boundary_ok {
        return Err(ScdaError::Format);
    }

    Ok(&padded[..raw_len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_len_round_trip() {
        for raw in [&b""[..], b"hi", b"hello world"] {
            let padded = pad_to_fix_len(raw, 24);
            assert_eq!(padded.len(), 24);
            assert_eq!(get_pad_to_fix_len(&padded).unwrap(), raw);
        }
    }

    #[test]
    fn fixed_len_rejects_missing_newline() {
        let mut padded = pad_to_fix_len(b"hi", 24);
        *padded.last_mut().unwrap() = b'x';
        assert!(matches!(get_pad_to_fix_len(&padded), Err(ScdaError::Format)));
    }

    #[test]
    fn modular_round_trip_various_lengths() {
        for n in 0..80 {
            let raw = vec![b'A'; n];
            let padded = pad_to_mod(&raw);
            assert_eq!(padded.len() % PADDING_MOD, 0);
            let extra = padded.len() - raw.len();
            assert!((7..=38).contains(&extra));
            assert_eq!(get_pad_to_mod(&padded, n).unwrap(), &raw[..]);
        }
    }

    #[test]
    fn modular_boundary_when_raw_ends_in_newline() {
        let raw = b"payload\n".to_vec();
        let padded = pad_to_mod(&raw);
        // boundary byte right after raw must be '=' since raw ends in '\n'
        assert_eq!(padded[raw.len()], b'=');
        assert_eq!(get_pad_to_mod(&padded, raw.len()).unwrap(), &raw[..]);
    }

    #[test]
    fn modular_rejects_corrupted_padding_byte() {
        let raw = b"x".to_vec();
        let mut padded = pad_to_mod(&raw);
        let mid = padded.len() - 3;
        padded[mid] = b'?';
        assert!(matches!(get_pad_to_mod(&padded, raw.len()), Err(ScdaError::Format)));
    }

    #[test]
    fn mod_tail_matches_the_tail_of_pad_to_mod() {
        for n in [0usize, 1, 25, 26, 32, 70] {
            let raw = vec![b'A'; n];
            let full = pad_to_mod(&raw);
            let tail = pad_to_mod_tail(n, false);
            assert_eq!(&full[n..], &tail[..]);
        }
        let raw = b"payload\n".to_vec();
        let full = pad_to_mod(&raw);
        let tail = pad_to_mod_tail(raw.len(), true);
        assert_eq!(&full[raw.len()..], &tail[..]);
    }

    #[test]
    fn modular_length_in_expected_range() {
        assert_eq!(pad_to_mod_len(0), 32); // 0 bumped up to 32 (below the 7-byte minimum)
        assert_eq!(pad_to_mod_len(25), 7); // 32-25=7, already at the minimum, no bump
        assert_eq!(pad_to_mod_len(26), 38); // 32-26=6, bumped to 6+32
        assert_eq!(pad_to_mod_len(32), 32); // multiple of 32 still needs a full pad block
    }
}
