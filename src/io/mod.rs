//! MPI-IO shim (component C4).
//!
//! Exposes a uniform [`IoBackend`] over three build variants described in
//! spec.md §4.4:
//!
//! 1. Full MPI-IO ([`mpi_backend::FullMpiIo`], feature `mpi`)
//! 2. MPI without MPI-IO, i.e. the rank-0 token-ring emulation
//!    ([`mpi_backend::RingMpiIo`], feature `mpi`)
//! 3. No MPI at all ([`NoMpiIo`], always available) — a one-process stub
//!    directly over `std::fs::File`, matching spec.md §4.4 point 3.
//!
//! All three are expected to map OS errno values to [`crate::error::MpiErrorClass`]
//! identically; that shared mapping lives in [`errno`].

pub mod errno;

#[cfg(feature = "mpi")]
pub mod mpi_backend;

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{ErrorCode, MpiErrorClass, ScdaError};

/// Mirrors the three access modes `sc_scda_fopen_write`/`sc_scda_fopen_read`
/// pass down to `MPI_File_open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    WriteCreate,
    WriteAppend,
}

/// Uniform MPI-IO-shaped interface over an open file handle.
///
/// `_all` methods are the collective entry points (every rank in the
/// communicator must call them); the non-`_all` methods are the
/// single-rank (typically root-only) counterparts. On the single-process
/// backend these coincide, since there is only ever one rank to begin with.
pub trait IoBackend {
    type Handle;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<Self::Handle, ErrorCode>;

    fn read_at(&self, h: &mut Self::Handle, offset: u64, buf: &mut [u8]) -> Result<usize, ErrorCode>;
    fn write_at(&self, h: &mut Self::Handle, offset: u64, buf: &[u8]) -> Result<usize, ErrorCode>;

    fn read_at_all(&self, h: &mut Self::Handle, offset: u64, buf: &mut [u8]) -> Result<usize, ErrorCode> {
        self.read_at(h, offset, buf)
    }
    fn write_at_all(&self, h: &mut Self::Handle, offset: u64, buf: &[u8]) -> Result<usize, ErrorCode> {
        self.write_at(h, offset, buf)
    }

    fn close(&self, h: Self::Handle) -> Result<(), ErrorCode>;
}

pub(crate) fn io_err_from(e: std::io::Error) -> ErrorCode {
    ErrorCode::from_mpi(errno::classify_io_error(&e))
}

/// Variant 3 of spec.md §4.4: a one-process stub that just uses
/// `fopen`/`fread`/`fwrite` — here, `std::fs::File` with explicit seeking,
/// since Rust's `File` has no implicit cursor shared across positioned
/// reads the way C `FILE*` does.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMpiIo;

impl IoBackend for NoMpiIo {
    type Handle = File;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<File, ErrorCode> {
        let mut opts = OpenOptions::new();
        match mode {
            OpenMode::Read => {
                opts.read(true);
            }
            OpenMode::WriteCreate => {
                opts.write(true).create(true).truncate(true);
            }
            OpenMode::WriteAppend => {
                opts.write(true).create(true).append(false);
            }
        }
        opts.open(path).map_err(io_err_from)
    }

    fn read_at(&self, h: &mut File, offset: u64, buf: &mut [u8]) -> Result<usize, ErrorCode> {
        h.seek(SeekFrom::Start(offset)).map_err(io_err_from)?;
        let mut total = 0;
        while total < buf.len() {
            let n = h.read(&mut buf[total..]).map_err(io_err_from)?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn write_at(&self, h: &mut File, offset: u64, buf: &[u8]) -> Result<usize, ErrorCode> {
        h.seek(SeekFrom::Start(offset)).map_err(io_err_from)?;
        h.write_all(buf).map_err(io_err_from)?;
        Ok(buf.len())
    }

    fn close(&self, h: File) -> Result<(), ErrorCode> {
        drop(h);
        Ok(())
    }
}

/// Returns [`ScdaError::Count`] when `got != want`, matching the count
/// protocol of spec.md §4.8 — a zero-byte `read_at` on an empty partition
/// must not raise `Count` (spec.md §4.7's tie-break), so callers compare
/// against the *requested* length, which is legitimately zero in that case.
pub fn check_count(got: usize, want: usize) -> Result<(), ErrorCode> {
    if got == want {
        Ok(())
    } else {
        Err(ErrorCode::from_scda(ScdaError::Count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn write_then_read_at_offset_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scda_io_test.bin");
        let io = NoMpiIo;

        let mut handle = io.open(&path, OpenMode::WriteCreate).unwrap();
        io.write_at(&mut handle, 0, b"hello").unwrap();
        io.write_at(&mut handle, 10, b"world").unwrap();
        io.close(handle).unwrap();

        let mut handle = io.open(&path, OpenMode::Read).unwrap();
        let mut buf = [0u8; 5];
        io.read_at(&mut handle, 0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        io.read_at(&mut handle, 10, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
        io.close(handle).unwrap();
    }

    #[test]
    fn zero_byte_read_is_not_a_count_error() {
        assert!(check_count(0, 0).is_ok());
    }

    #[test]
    fn open_nonexistent_read_maps_to_mpi_no_such_file() {
        let io = NoMpiIo;
        let err = io.open(Path::new("/nonexistent/scda/path.bin"), OpenMode::Read).unwrap_err();
        assert_eq!(err.scda, Some(ScdaError::Mpi));
        assert_eq!(err.mpi, MpiErrorClass::NoSuchFile);
    }

    #[test]
    fn short_read_reports_fewer_bytes_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"ab").unwrap();
        drop(f);

        let io = NoMpiIo;
        let mut handle = io.open(&path, OpenMode::Read).unwrap();
        let mut buf = [0u8; 10];
        let n = io.read_at(&mut handle, 0, &mut buf).unwrap();
        assert_eq!(n, 2);
    }
}
