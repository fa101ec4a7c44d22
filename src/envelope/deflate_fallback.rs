//! Hand-rolled uncompressed "deflate" fallback: a valid zlib stream
//! (RFC 1950) made entirely of stored blocks, used instead of real deflate
//! when the caller asks for compression level 0 or when a reduced-footprint
//! build has no zlib available. Ported byte-for-byte from
//! `sc_io_noncompress`/`sc_io_nonuncompress` in `sc_io.c`; only the checksum
//! itself is delegated to the `adler` crate, since folding the running sums
//! back into the RFC-1950 modulus every 5000 bytes versus every call makes
//! no difference to the final value (`(a + b) % m == ((a % m) + (b % m)) % m`).

use crate::envelope::types::{ADLER32_MOD, NONCOMPRESSED_BLOCK_MAX};
use crate::error::{ErrorCode, ScdaError};

/// Upper bound on the encoded size of `length` raw bytes: a 2-byte zlib
/// header, a 5-byte stored-block header per block, the data itself, and a
/// 4-byte adler-32 trailer.
pub fn noncompress_bound(length: usize) -> usize {
    let num_blocks = (length + NONCOMPRESSED_BLOCK_MAX - 1) / NONCOMPRESSED_BLOCK_MAX;
    2 + 5 * num_blocks.max(1) + length + 4
}

/// Wraps `src` in a minimal zlib stream of stored blocks, writing the
/// result to `dest`. Returns the number of bytes actually written.
pub fn noncompress(dest: &mut [u8], src: &[u8]) -> usize {
    assert!(dest.len() >= noncompress_bound(src.len()));

    let mut pos = 0usize;

    // zlib header: CMF=0x78 (deflate, 32K window), FLG=0x01 (no dict, fastest).
    dest[0] = (7 << 4) + 8;
    dest[1] = 1;
    pos += 2;

    let adler = adler::adler32_slice(src);
    let mut src_rem = src;

    loop {
        let (bsize, is_final) = if src_rem.len() > NONCOMPRESSED_BLOCK_MAX {
            (NONCOMPRESSED_BLOCK_MAX as u16, false)
        } else {
            (src_rem.len() as u16, true)
        };
        let nsize = !bsize;

        dest[pos] = u8::from(is_final);
        dest[pos + 1] = (bsize & 0xFF) as u8;
        dest[pos + 2] = (bsize >> 8) as u8;
        dest[pos + 3] = (nsize & 0xFF) as u8;
        dest[pos + 4] = (nsize >> 8) as u8;
        pos += 5;

        let chunk = bsize as usize;
        dest[pos..pos + chunk].copy_from_slice(&src_rem[..chunk]);
        pos += chunk;
        src_rem = &src_rem[chunk..];

        if is_final {
            break;
        }
    }

    dest[pos] = (adler >> 24) as u8;
    dest[pos + 1] = ((adler >> 16) & 0xFF) as u8;
    dest[pos + 2] = ((adler >> 8) & 0xFF) as u8;
    dest[pos + 3] = (adler & 0xFF) as u8;
    pos += 4;

    pos
}

/// Inverse of [`noncompress`]: checks the zlib header, walks the stored
/// blocks into `dest`, and verifies the trailing adler-32. `dest` must be
/// exactly the expected decompressed length.
pub fn nonuncompress(dest: &mut [u8], src: &[u8]) -> Result<(), ErrorCode> {
    if src.len() < 2 {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }
    let cmf = src[0];
    let flg = src[1];
    if (cmf & 0x8F) != 8 {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }
    if (((cmf as u16) << 8) + flg as u16) % 31 != 0 {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }
    if flg & 0x20 != 0 {
        // FDICT set: a preset dictionary, which this envelope never uses.
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }

    let mut src_rem = &src[2..];
    let mut dest_rem = &mut dest[..];
    let mut final_block = false;

    loop {
        if src_rem.len() < 5 {
            return Err(ErrorCode::from_scda(ScdaError::Decode));
        }
        let tag = src_rem[0];
        if tag > 1 {
            return Err(ErrorCode::from_scda(ScdaError::Decode));
        }
        final_block = tag == 1;
        let bsize = u16::from_le_bytes([src_rem[1], src_rem[2]]);
        let nsize = u16::from_le_bytes([src_rem[3], src_rem[4]]);
        if (final_block && (bsize as usize) < dest_rem.len()) || bsize.wrapping_add(nsize) != 0xFFFF {
            return Err(ErrorCode::from_scda(ScdaError::Decode));
        }
        src_rem = &src_rem[5..];

        let chunk = bsize as usize;
        if chunk > dest_rem.len() || chunk > src_rem.len() {
            return Err(ErrorCode::from_scda(ScdaError::Decode));
        }
        dest_rem[..chunk].copy_from_slice(&src_rem[..chunk]);
        src_rem = &src_rem[chunk..];
        dest_rem = &mut dest_rem[chunk..];

        if final_block {
            break;
        }
    }
    let _ = final_block;

    if src_rem.len() != 4 || !dest_rem.is_empty() {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }

    let adler = adler::adler32_slice(&dest[..]);
    let expect = [
        (adler >> 24) as u8,
        ((adler >> 16) & 0xFF) as u8,
        ((adler >> 8) & 0xFF) as u8,
        (adler & 0xFF) as u8,
    ];
    if src_rem != expect {
        return Err(ErrorCode::from_scda(ScdaError::Decode));
    }
    Ok(())
}

/// Stand-alone adler-32 over `data`, folding the running sums back into
/// [`ADLER32_MOD`] every 5000 bytes — kept only as a direct reference of
/// the original port's folding cadence; [`noncompress`]/[`nonuncompress`]
/// use the `adler` crate's equivalent, always-correct implementation.
#[allow(dead_code)]
pub(crate) fn adler32_reference(data: &[u8]) -> u32 {
    let mut s1: u32 = 1;
    let mut s2: u32 = 0;
    let mut since_fold = 0;
    for &b in data {
        if since_fold == 5000 {
            s1 %= ADLER32_MOD;
            s2 %= ADLER32_MOD;
            since_fold = 0;
        }
        s1 += b as u32;
        s2 += s1;
        since_fold += 1;
    }
    ((s2 % ADLER32_MOD) << 16) + (s1 % ADLER32_MOD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_adler32_matches_crate_for_small_input() {
        let data = b"hello scda";
        assert_eq!(adler32_reference(data), adler::adler32_slice(data));
    }

    #[test]
    fn reference_adler32_matches_crate_across_fold_boundary() {
        let data = vec![7u8; 12_345];
        assert_eq!(adler32_reference(&data), adler::adler32_slice(&data));
    }

    #[test]
    fn round_trip_small_payload() {
        let src = b"the quick brown fox jumps over the lazy dog";
        let mut buf = vec![0u8; noncompress_bound(src.len())];
        let written = noncompress(&mut buf, src);
        buf.truncate(written);

        let mut dest = vec![0u8; src.len()];
        nonuncompress(&mut dest, &buf).unwrap();
        assert_eq!(&dest[..], src);
    }

    #[test]
    fn round_trip_empty_payload() {
        let src: &[u8] = &[];
        let mut buf = vec![0u8; noncompress_bound(0)];
        let written = noncompress(&mut buf, src);
        buf.truncate(written);

        let mut dest: Vec<u8> = vec![];
        nonuncompress(&mut dest, &buf).unwrap();
        assert!(dest.is_empty());
    }

    #[test]
    fn round_trip_payload_spanning_multiple_blocks() {
        let src: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut buf = vec![0u8; noncompress_bound(src.len())];
        let written = noncompress(&mut buf, &src);
        buf.truncate(written);

        let mut dest = vec![0u8; src.len()];
        nonuncompress(&mut dest, &buf).unwrap();
        assert_eq!(dest, src);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let src = b"corrupt me";
        let mut buf = vec![0u8; noncompress_bound(src.len())];
        let written = noncompress(&mut buf, src);
        let last = written - 1;
        buf[last] ^= 0xFF;

        let mut dest = vec![0u8; src.len()];
        assert!(nonuncompress(&mut dest, &buf[..written]).is_err());
    }

    #[test]
    fn truncated_header_is_rejected() {
        let mut dest = vec![0u8; 4];
        assert!(nonuncompress(&mut dest, &[0x78]).is_err());
    }
}
