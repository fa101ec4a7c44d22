//! Inline section (`I`): a fixed 32-byte payload with no padding at all,
//! the only kind not aligned to the modular-padding grid (spec.md §3
//! invariant 6, §4.7).

use crate::collective::Communicator;
use crate::context::FileContext;
use crate::error::ErrorCode;
use crate::io::{check_count, IoBackend};
use crate::section::header::{SectionDims, SectionHeader, SectionKind};

pub const INLINE_PAYLOAD_BYTES: usize = 32;

impl<C: Communicator, IO: IoBackend> FileContext<C, IO> {
    /// Writes an inline section. `payload` is read only on `root`; every
    /// other rank may pass anything (ignored).
    pub fn fwrite_inline(
        &mut self,
        root: i32,
        user_string: &[u8],
        payload: &[u8; INLINE_PAYLOAD_BYTES],
    ) -> Result<(), ErrorCode> {
        let rank = self.comm.rank();
        let local_result = if rank == root {
            Some(self.write_inline_on_root(user_string, payload))
        } else {
            None
        };
        let result = self.broadcast_err(root, local_result);
        if result.is_err() {
            self.fail();
        }
        result
    }

    fn write_inline_on_root(&mut self, user_string: &[u8], payload: &[u8; INLINE_PAYLOAD_BYTES]) -> ErrorCode {
        let header = match SectionHeader::new(SectionKind::Inline, SectionDims::default(), user_string) {
            Ok(h) => h,
            Err(e) => return e,
        };
        let header_bytes = header.encode();
        let offset = self.cursor;

        if let Err(e) = write_exact(&self.io, &mut self.handle, offset, &header_bytes) {
            return e;
        }
        if let Err(e) = write_exact(&self.io, &mut self.handle, offset + header_bytes.len() as u64, payload) {
            return e;
        }
        self.cursor = offset + header_bytes.len() as u64 + INLINE_PAYLOAD_BYTES as u64;
        self.fuzzy_override(ErrorCode::SUCCESS)
    }

    /// Reads an inline section header collectively, then the 32 payload
    /// bytes on `root` only; `out` being `None` on root skips the payload
    /// read (spec.md §4.7).
    pub fn fread_inline(
        &mut self,
        root: i32,
        mut out: Option<&mut [u8; INLINE_PAYLOAD_BYTES]>,
    ) -> Result<SectionHeader, ErrorCode> {
        let rank = self.comm.rank();
        let header_len = SectionHeader::encoded_len_for(SectionKind::Inline);
        let offset = self.cursor;

        let local_header = if rank == root {
            Some(self.read_header_on_root(offset, SectionKind::Inline))
        } else {
            None
        };
        let header = self.broadcast_header(root, local_header, SectionKind::Inline)?;

        let local_result = if rank == root {
            if let Some(buf) = out.as_deref_mut() {
                Some(read_exact(&self.io, &mut self.handle, offset + header_len as u64, buf))
            } else {
                Some(Ok(()))
            }
        } else {
            None
        };
        let result = self.broadcast_err(root, local_result.map(|r| r.err().unwrap_or(ErrorCode::SUCCESS)));
        if result.is_err() {
            self.fail();
            return Err(result.unwrap_err());
        }

        self.cursor = offset + header_len as u64 + INLINE_PAYLOAD_BYTES as u64;
        Ok(header)
    }
}

/// Collectively writes `buf` at `offset` and maps a short write to
/// [`crate::error::ScdaError::Count`].
pub(crate) fn write_exact<IO: IoBackend>(
    io: &IO,
    handle: &mut IO::Handle,
    offset: u64,
    buf: &[u8],
) -> Result<(), ErrorCode> {
    let n = io.write_at(handle, offset, buf)?;
    check_count(n, buf.len())
}

pub(crate) fn read_exact<IO: IoBackend>(
    io: &IO,
    handle: &mut IO::Handle,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), ErrorCode> {
    let n = io.read_at(handle, offset, buf)?;
    check_count(n, buf.len())
}

impl<C: Communicator, IO: IoBackend> FileContext<C, IO> {
    pub(crate) fn read_header_on_root(
        &mut self,
        offset: u64,
        expected: SectionKind,
    ) -> Result<SectionHeader, ErrorCode> {
        // Peek the kind tag first so we know how many numeral fields follow.
        let mut tag_buf = [0u8; 1];
        read_exact(&self.io, &mut self.handle, offset, &mut tag_buf)?;
        let kind = SectionKind::from_tag(tag_buf[0])?;
        if kind != expected {
            return Err(ErrorCode::from_scda(crate::error::ScdaError::Format));
        }
        let len = SectionHeader::encoded_len_for(kind);
        let mut buf = vec![0u8; len];
        read_exact(&self.io, &mut self.handle, offset, &mut buf)?;
        SectionHeader::decode(&buf)
    }

    /// Broadcasts a just-parsed header (or error) from `root` to every
    /// rank as a flat byte buffer, since [`SectionHeader`] itself has no
    /// fixed wire size across kinds.
    pub(crate) fn broadcast_header(
        &mut self,
        root: i32,
        local: Option<Result<SectionHeader, ErrorCode>>,
        kind: SectionKind,
    ) -> Result<SectionHeader, ErrorCode> {
        let rank = self.comm.rank();
        let (local_err, local_bytes) = match local {
            Some(Ok(h)) => (ErrorCode::SUCCESS, h.encode()),
            Some(Err(e)) => (e, Vec::new()),
            None => (ErrorCode::SUCCESS, Vec::new()),
        };
        self.broadcast_err(root, if rank == root { Some(local_err) } else { None })?;

        let len = SectionHeader::encoded_len_for(kind);
        let mut buf = if rank == root { local_bytes } else { vec![0u8; len] };
        buf.resize(len, 0);
        self.comm.broadcast_bytes(root, &mut buf);
        SectionHeader::decode(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collective::SingleProcessCommunicator;
    use crate::error::FuzzyConfig;
    use crate::io::NoMpiIo;

    #[test]
    fn inline_round_trips_through_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inline.scda");

        let mut ctx = FileContext::open_write(
            SingleProcessCommunicator,
            NoMpiIo,
            &path,
            b"",
            FuzzyConfig::default(),
        )
        .unwrap();
        let payload = [7u8; INLINE_PAYLOAD_BYTES];
        ctx.fwrite_inline(0, b"an inline section", &payload).unwrap();
        ctx.fclose().unwrap();

        let (mut ctx, _) =
            FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
                .unwrap();
        let mut out = [0u8; INLINE_PAYLOAD_BYTES];
        let header = ctx.fread_inline(0, Some(&mut out)).unwrap();
        assert_eq!(header.user_string, b"an inline section");
        assert_eq!(out, payload);
        ctx.fclose().unwrap();
    }

    #[test]
    fn inline_read_can_skip_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inline_skip.scda");

        let mut ctx = FileContext::open_write(
            SingleProcessCommunicator,
            NoMpiIo,
            &path,
            b"",
            FuzzyConfig::default(),
        )
        .unwrap();
        ctx.fwrite_inline(0, b"", &[1u8; INLINE_PAYLOAD_BYTES]).unwrap();
        ctx.fclose().unwrap();

        let (mut ctx, _) =
            FileContext::open_read(SingleProcessCommunicator, NoMpiIo, &path, FuzzyConfig::default())
                .unwrap();
        let header = ctx.fread_inline(0, None).unwrap();
        assert_eq!(header.kind, SectionKind::Inline);
        ctx.fclose().unwrap();
    }
}
