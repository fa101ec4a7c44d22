//! Encoding envelope (component C2): the ASCII-armored compression format
//! used for the "encoded" variant of block and array sections (spec.md
//! §4.2). Grounded in `sc_io_encode`/`sc_io_encode_zlib`/`sc_io_decode` in
//! `sc_io.c` — the scda-specific source (`sc_scda.c`) has no compression
//! logic of its own, it only ever calls into this shared machinery.
//!
//! Wire shape: a 9-byte preamble (8-byte big-endian original length + a
//! `'z'` format tag), then a zlib stream (either real deflate via
//! [`flate2`] or the hand-rolled [`deflate_fallback`] of stored blocks),
//! then base64 armor in 72-column lines terminated by a trailing NUL.

pub mod decode;
pub mod deflate_fallback;
pub mod encode;
pub mod types;

pub use decode::{decode, decode_info, decode_info_with_breaks, decode_with_breaks};
pub use encode::{encode, encode_with_breaks, CompressionMode};
