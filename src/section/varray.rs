//! Variable array section (`V`): `C` elements of caller-chosen, possibly
//! differing, sizes. Physically two logical arrays back to back — the
//! per-element byte sizes (as an 8-byte-element fixed array), then the
//! concatenated element bytes — per spec.md §4.7.

use crate::collective::Communicator;
use crate::context::FileContext;
use crate::error::{ErrorCode, ScdaError};
use crate::io::IoBackend;
use crate::pad;
use crate::section::array::ArrayPayload;
use crate::section::inline::write_exact;
use crate::section::{SectionDims, SectionHeader, SectionKind};

impl<C: Communicator, IO: IoBackend> FileContext<C, IO> {
    /// Writes a variable array section in one call. `elem_counts` and
    /// `proc_sizes` are the global (identical-on-every-rank) partition
    /// description: how many elements, and how many payload bytes, each
    /// rank contributes. `local_elem_sizes` (this rank's own element byte
    /// sizes) must sum to `proc_sizes[rank]` and have length
    /// `elem_counts[rank]`; a caller violating either is a usage error.
    pub fn fwrite_varray(
        &mut self,
        root: i32,
        user_string: &[u8],
        elem_counts: &[u64],
        proc_sizes: &[u64],
        local_elem_sizes: &[u64],
        local_payload: &[u8],
    ) -> Result<(), ErrorCode> {
        let rank = self.comm.rank();
        let rank_idx = rank as usize;
        if rank_idx >= elem_counts.len() || rank_idx >= proc_sizes.len() {
            let err = ErrorCode::from_scda(ScdaError::Input);
            self.fail();
            return Err(err);
        }
        let locally_consistent = local_elem_sizes.len() as u64 == elem_counts[rank_idx]
            && local_elem_sizes.iter().sum::<u64>() == proc_sizes[rank_idx]
            && local_payload.len() as u64 == proc_sizes[rank_idx];
        if !locally_consistent {
            let err = ErrorCode::from_scda(ScdaError::Usage);
            self.fail();
            return Err(err);
        }

        let total_count: u64 = elem_counts.iter().sum();

        let header_result = if rank == root {
            Some(self.write_varray_header_on_root(user_string, total_count))
        } else {
            None
        };
        let header_offset = self.cursor;
        self.broadcast_err(root, header_result)?;
        self.cursor = header_offset + SectionHeader::encoded_len_for(SectionKind::VarArray) as u64;

        let size_bytes: Vec<u8> = local_elem_sizes.iter().flat_map(|s| s.to_le_bytes()).collect();
        self.fwrite_array(
            root,
            b"",
            elem_counts,
            8,
            ArrayPayload::Direct(&size_bytes),
        )?;

        self.fwrite_array(
            root,
            b"",
            proc_sizes,
            1,
            ArrayPayload::Direct(local_payload),
        )?;

        Ok(())
    }

    fn write_varray_header_on_root(&mut self, user_string: &[u8], count: u64) -> ErrorCode {
        let dims = SectionDims { count, elem_size: 0 };
        let header = match SectionHeader::new(SectionKind::VarArray, dims, user_string) {
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

    /// Reads the `V` section header and its element-sizes sub-array.
    /// Must be called before [`Self::fread_varray_data`]; doing so out of
    /// order is a usage error there.
    pub fn fread_varray_sizes(
        &mut self,
        root: i32,
        elem_counts: &[u64],
    ) -> Result<(SectionHeader, Vec<u64>), ErrorCode> {
        let rank = self.comm.rank();
        let offset = self.cursor;

        let local_header = if rank == root {
            Some(self.read_header_on_root(offset, SectionKind::VarArray))
        } else {
            None
        };
        let header = self.broadcast_header(root, local_header, SectionKind::VarArray)?;
        self.cursor = offset + SectionHeader::encoded_len_for(SectionKind::VarArray) as u64;

        if elem_counts.iter().sum::<u64>() != header.dims.count {
            let err = ErrorCode::from_scda(ScdaError::Usage);
            self.fail();
            return Err(err);
        }

        let (_sizes_header, raw) = self.fread_array(root, elem_counts)?;
        let local_sizes: Vec<u64> = raw
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();

        self.state_mark_sizes_read();
        Ok((header, local_sizes))
    }

    /// Reads this rank's slice of the payload array. `proc_sizes` is the
    /// same global byte-count partition the writer used.
    pub fn fread_varray_data(
        &mut self,
        root: i32,
        proc_sizes: &[u64],
    ) -> Result<Vec<u8>, ErrorCode> {
        if !self.sizes_have_been_read() {
            let err = ErrorCode::from_scda(ScdaError::Usage);
            self.fail();
            return Err(err);
        }
        let (_header, raw) = self.fread_array(root, proc_sizes)?;
        Ok(raw)
    }

    fn state_mark_sizes_read(&mut self) {
        if let crate::context::ContextState::Reading { .. } = self.state {
            self.state = crate::context::ContextState::Reading { awaiting_sizes: false };
        }
    }

    fn sizes_have_been_read(&self) -> bool {
        !matches!(self.state, crate::context::ContextState::Reading { awaiting_sizes: true })
    }
}
