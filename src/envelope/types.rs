//! Shared constants and small value types for the encoding envelope
//! (component C2), grounded in `sc_io.c`'s `SC_IO_*` macros.

/// Byte count of one line of raw data fed to the base64 encoder; must be a
/// multiple of 3 so that every line but the last encodes without padding.
pub const DATA_LINE_BYTES: usize = 54;

/// Byte count of one base64-encoded line, not counting the trailing newline.
pub const ENCODED_LINE_BYTES: usize = DATA_LINE_BYTES / 3 * 4;

/// Number of bytes in a line break between encoded lines; spec.md §4.2
/// calls for "two configurable break bytes" rather than a single `'\n'`.
pub const BREAK_LEN: usize = 2;

/// [`ENCODED_LINE_BYTES`] plus the line break.
pub const ENCODED_LINE_BYTES_BRK: usize = ENCODED_LINE_BYTES + BREAK_LEN;

/// Default break-byte pair: both bytes `'\n'`, so a default-configured
/// stream degrades to the conventional single blank-feeling line break
/// when viewed in a text editor that collapses `\n\n` visually close
/// together; callers that want a distinguishable second byte pass their
/// own pair to [`crate::envelope::encode::encode`].
pub const DEFAULT_BREAK_BYTES: [u8; BREAK_LEN] = [b'\n', b'\n'];

/// Length of the preamble placed before the compressed payload: an 8-byte
/// big-endian original length followed by a single format tag byte.
pub const PREAMBLE_LEN: usize = 9;

/// The only format tag this engine writes; `sc_io_encode_zlib` always
/// stamps `'z'` regardless of whether the payload used real zlib deflate or
/// the uncompressed fallback, since from the decoder's perspective both are
/// valid zlib streams.
pub const FORMAT_TAG_ZLIB: u8 = b'z';

/// Uncompressed-deflate block size bound (`SC_IO_NONCOMP_BLOCK`); the zlib
/// "stored block" format caps each block's length field at a 16-bit value,
/// and this leaves headroom within that ceiling.
pub const NONCOMPRESSED_BLOCK_MAX: usize = 65531;

/// Adler-32 modulus, fixed by RFC 1950.
pub const ADLER32_MOD: u32 = 65521;
