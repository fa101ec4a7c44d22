//! Block section (`B`): a single byte run of `N` bytes (`N` up to
//! `10^26 - 1`) written entirely by one rank, followed by modular padding
//! (spec.md §4.7).

use crate::collective::Communicator;
use crate::context::FileContext;
use crate::envelope::{self, CompressionMode};
use crate::error::ErrorCode;
use crate::io::IoBackend;
use crate::pad;
use crate::section::header::{is_encoded_convention, ENCODED_CONVENTION_PREFIX};
use crate::section::inline::{read_exact, write_exact};
use crate::section::{SectionDims, SectionHeader, SectionKind};

impl<C: Communicator, IO: IoBackend> FileContext<C, IO> {
    /// Writes a block section. `payload` is read only on `root`. When
    /// `encode` is set, `payload` is first run through the C2 envelope and
    /// the resulting armored bytes become the on-disk block, with the
    /// encoded-convention marker recorded in the user string.
    pub fn fwrite_block(
        &mut self,
        root: i32,
        user_string: &[u8],
        payload: &[u8],
        encode: bool,
    ) -> Result<(), ErrorCode> {
        let rank = self.comm.rank();
        let local_result = if rank == root {
            Some(self.write_block_on_root(user_string, payload, encode))
        } else {
            None
        };
        let result = self.broadcast_err(root, local_result);
        if result.is_err() {
            self.fail();
        }
        result
    }

    fn write_block_on_root(&mut self, user_string: &[u8], payload: &[u8], encode: bool) -> ErrorCode {
        let (final_user_string, final_payload) = if encode {
            let armored = match envelope::encode(payload, CompressionMode::default()) {
                Ok(v) => v,
                Err(e) => return e,
            };
            let mut us = ENCODED_CONVENTION_PREFIX.to_vec();
            if !user_string.is_empty() {
                us.push(b':');
                us.extend_from_slice(user_string);
            }
            (us, armored)
        } else {
            (user_string.to_vec(), payload.to_vec())
        };

        let dims = SectionDims {
            count: final_payload.len() as u64,
            elem_size: 0,
        };
        let header = match SectionHeader::new(SectionKind::Block, dims, &final_user_string) {
            Ok(h) => h,
            Err(e) => return e,
        };
        let header_bytes = header.encode();
        let offset = self.cursor;

        if let Err(e) = write_exact(&self.io, &mut self.handle, offset, &header_bytes) {
            return e;
        }
        let padded = pad::pad_to_mod(&final_payload);
        let payload_offset = offset + header_bytes.len() as u64;
        if let Err(e) = write_exact(&self.io, &mut self.handle, payload_offset, &padded) {
            return e;
        }
        self.cursor = payload_offset + padded.len() as u64;
        self.fuzzy_override(ErrorCode::SUCCESS)
    }

    /// Reads a block section header collectively, then the `N` payload
    /// bytes (plus padding) on `root` only. When the header's user string
    /// carries the encoded-convention marker and `decode` is set, the raw
    /// bytes are run back through the C2 envelope before being returned;
    /// a malformed envelope under `decode: true` is a decode error.
    pub fn fread_block(
        &mut self,
        root: i32,
        decode: bool,
    ) -> Result<(SectionHeader, Option<Vec<u8>>), ErrorCode> {
        let rank = self.comm.rank();
        let offset = self.cursor;

        let local_header = if rank == root {
            Some(self.read_header_on_root(offset, SectionKind::Block))
        } else {
            None
        };
        let header = self.broadcast_header(root, local_header, SectionKind::Block)?;

        let header_len = SectionHeader::encoded_len_for(SectionKind::Block);
        let raw_len = header.dims.count as usize;
        let pad_len = pad::pad_to_mod_len(raw_len);
        let region_len = raw_len + pad_len;
        let payload_offset = offset + header_len as u64;

        let local_payload: Option<Result<Vec<u8>, ErrorCode>> = if rank == root {
            Some(self.read_block_payload_on_root(payload_offset, raw_len, region_len, decode, &header.user_string))
        } else {
            None
        };
        let local_err = local_payload.as_ref().map(|r| r.as_ref().err().copied().unwrap_or(ErrorCode::SUCCESS));
        let result = self.broadcast_err(root, local_err);
        if result.is_err() {
            self.fail();
            return Err(result.unwrap_err());
        }

        self.cursor = payload_offset + region_len as u64;
        let payload = if rank == root {
            local_payload.unwrap().ok()
        } else {
            None
        };
        Ok((header, payload))
    }

    fn read_block_payload_on_root(
        &mut self,
        payload_offset: u64,
        raw_len: usize,
        region_len: usize,
        decode: bool,
        user_string: &[u8],
    ) -> Result<Vec<u8>, ErrorCode> {
        let mut padded = vec![0u8; region_len];
        read_exact(&self.io, &mut self.handle, payload_offset, &mut padded)?;
        let raw = pad::get_pad_to_mod(&padded, raw_len)
            .map_err(ErrorCode::from_scda)?
            .to_vec();

        if decode && is_encoded_convention(user_string) {
            envelope::decode(&raw, usize::MAX)
        } else {
            Ok(raw)
        }
    }
}
