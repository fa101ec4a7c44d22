//! Fixed array section (`A`): `C` elements of `S` bytes each, partitioned
//! across ranks by per-rank element counts (spec.md §4.7). Every rank
//! writes/reads only its own contiguous byte range; the header and final
//! padding are root-only.

use crate::collective::Communicator;
use crate::context::FileContext;
use crate::error::{ErrorCode, ScdaError};
use crate::io::IoBackend;
use crate::pad;
use crate::section::inline::{read_exact, write_exact};
use crate::section::{partition_byte_ranges, SectionDims, SectionHeader, SectionKind};

/// Either one contiguous buffer covering every local element
/// back-to-back, or a vector of one buffer per local element — the
/// `indirect` choice spec.md §4.7 leaves to the caller.
pub enum ArrayPayload<'a> {
    Direct(&'a [u8]),
    Indirect(Vec<&'a [u8]>),
}

impl<'a> ArrayPayload<'a> {
    fn to_contiguous(&self, elem_size: u64) -> Vec<u8> {
        match self {
            ArrayPayload::Direct(buf) => buf.to_vec(),
            ArrayPayload::Indirect(bufs) => {
                let mut out = Vec::with_capacity(bufs.len() * elem_size as usize);
                for b in bufs {
                    out.extend_from_slice(b);
                }
                out
            }
        }
    }
}

impl<C: Communicator, IO: IoBackend> FileContext<C, IO> {
    /// Writes a fixed array section. `counts` gives every rank's element
    /// count (identical on every rank, spec.md §4.7); `local_payload` is
    /// this rank's own `counts[rank] * elem_size` bytes. The header and
    /// trailing padding are written by `root`.
    pub fn fwrite_array(
        &mut self,
        root: i32,
        user_string: &[u8],
        counts: &[u64],
        elem_size: u64,
        local_payload: ArrayPayload<'_>,
    ) -> Result<(), ErrorCode> {
        let rank = self.comm.rank();
        let total: u64 = counts.iter().sum();
        let ranges = partition_byte_ranges(counts, elem_size);
        let rank_idx = rank as usize;
        if rank_idx >= ranges.len() {
            let err = ErrorCode::from_scda(ScdaError::Input);
            self.fail();
            return Err(err);
        }
        let (rel_offset, want_len) = ranges[rank_idx];

        let header_result = if rank == root {
            Some(self.write_array_header_on_root(user_string, total, elem_size))
        } else {
            None
        };
        let header_offset = self.cursor;
        self.broadcast_err(root, header_result)?;

        let header_len = SectionHeader::encoded_len_for(SectionKind::Array);
        let payload_base = header_offset + header_len as u64;

        let bytes = local_payload.to_contiguous(elem_size);
        let local_ok = bytes.len() as u64 == want_len
            && write_exact(&self.io, &mut self.handle, payload_base + rel_offset, &bytes).is_ok();
        self.broadcast_count(root, Some(local_ok))?;

        let payload_total_len = total * elem_size;
        let local_tail_result = if rank == root {
            Some(self.write_array_tail_on_root(payload_base, payload_total_len))
        } else {
            None
        };
        self.broadcast_err(root, local_tail_result)?;

        let pad_len = pad::pad_to_mod_len(payload_total_len as usize) as u64;
        self.cursor = payload_base + payload_total_len + pad_len;
        Ok(())
    }

    /// Writes the modular padding after the full (already rank-partitioned)
    /// array payload, once every rank's own slice has landed. Reads back the
    /// last payload byte on root to pick the boundary byte `pad_to_mod`'s
    /// scheme requires (spec.md §3 "no ambiguous `\n\n` seam" rule).
    fn write_array_tail_on_root(&mut self, payload_base: u64, payload_total_len: u64) -> ErrorCode {
        let last_is_newline = if payload_total_len == 0 {
            false
        } else {
            let mut b = [0u8; 1];
            if let Err(e) = read_exact(&self.io, &mut self.handle, payload_base + payload_total_len - 1, &mut b) {
                return e;
            }
            b[0] == b'\n'
        };
        let tail = pad::pad_to_mod_tail(payload_total_len as usize, last_is_newline);
        if let Err(e) = write_exact(&self.io, &mut self.handle, payload_base + payload_total_len, &tail) {
            return e;
        }
        self.fuzzy_override(ErrorCode::SUCCESS)
    }

    fn write_array_header_on_root(&mut self, user_string: &[u8], count: u64, elem_size: u64) -> ErrorCode {
        let dims = SectionDims { count, elem_size };
        let header = match SectionHeader::new(SectionKind::Array, dims, user_string) {
            Ok(h) => h,
            Err(e) => return e,
        };
        let header_bytes = header.encode();
        let offset = self.cursor;
        if let Err(e) = write_exact(&self.io, &mut self.handle, offset, &header_bytes) {
            return e;
        }
        self.fuzzy_override(ErrorCode::SUCCESS)
    }

    /// Reads a fixed array section header collectively, then this rank's
    /// own `counts[rank] * elem_size` bytes of payload.
    pub fn fread_array(
        &mut self,
        root: i32,
        counts: &[u64],
    ) -> Result<(SectionHeader, Vec<u8>), ErrorCode> {
        let rank = self.comm.rank();
        let offset = self.cursor;

        let local_header = if rank == root {
            Some(self.read_header_on_root(offset, SectionKind::Array))
        } else {
            None
        };
        let header = self.broadcast_header(root, local_header, SectionKind::Array)?;

        let header_len = SectionHeader::encoded_len_for(SectionKind::Array);
        let payload_base = offset + header_len as u64;
        let elem_size = header.dims.elem_size;
        let total = header.dims.count;

        if counts.iter().sum::<u64>() != total {
            let err = ErrorCode::from_scda(ScdaError::Usage);
            self.fail();
            return Err(err);
        }

        let ranges = partition_byte_ranges(counts, elem_size);
        let rank_idx = rank as usize;
        if rank_idx >= ranges.len() {
            let err = ErrorCode::from_scda(ScdaError::Input);
            self.fail();
            return Err(err);
        }
        let (rel_offset, want_len) = ranges[rank_idx];
        let mut local = vec![0u8; want_len as usize];
        let read_result = read_exact(&self.io, &mut self.handle, payload_base + rel_offset, &mut local);
        self.broadcast_count(root, Some(read_result.is_ok()))?;

        let payload_total_len = total * elem_size;
        let pad_len = pad::pad_to_mod_len(payload_total_len as usize) as u64;
        self.cursor = payload_base + payload_total_len + pad_len;

        Ok((header, local))
    }
}
