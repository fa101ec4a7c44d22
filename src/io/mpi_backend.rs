//! Real MPI-backed implementations of [`super::IoBackend`] plus the
//! [`Communicator`](crate::collective::Communicator) adapter over the `mpi`
//! crate (rsmpi). Only compiled with `--features mpi`; without it the crate
//! is limited to [`super::NoMpiIo`] over [`crate::collective::SingleProcessCommunicator`].
//!
//! [`FullMpiIo`] treats `MPI_File_open` being collective as a cue that every
//! rank opens its own OS handle onto the same shared-filesystem path, then
//! performs ordinary positioned reads/writes (`pread`/`pwrite` via
//! [`std::os::unix::fs::FileExt`]) for the "_all" collective entry points,
//! bracketed by a communicator barrier so all ranks observe the same
//! completion point — this is what `MPI_File_read_at_all`/`write_at_all`
//! reduce to on a POSIX shared file system in the common case.
//!
//! [`RingMpiIo`] instead emulates the fully-serialized rank-0-only access
//! pattern of spec.md §4.4 point 2 via a token ring over point-to-point
//! sends tagged `1`.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use mpi::topology::{Communicator as MpiCommunicatorTrait, SimpleCommunicator};
use mpi::traits::*;

use crate::collective::Communicator;
use crate::error::ErrorCode;
use crate::io::{check_count, io_err_from, IoBackend, OpenMode};

/// Adapts an rsmpi [`SimpleCommunicator`] (typically `universe.world()`) to
/// [`crate::collective::Communicator`].
pub struct MpiWorldCommunicator(pub SimpleCommunicator);

impl Communicator for MpiWorldCommunicator {
    fn rank(&self) -> i32 {
        self.0.rank()
    }

    fn size(&self) -> i32 {
        self.0.size()
    }

    fn barrier(&self) {
        self.0.barrier();
    }

    fn broadcast_error(&self, root: i32, value: ErrorCode) -> ErrorCode {
        let (mut s, mut m) = crate::collective::encode_error_code(value);
        let root_process = self.0.process_at_rank(root);
        root_process.broadcast_into(&mut s);
        root_process.broadcast_into(&mut m);
        crate::collective::decode_error_code(s, m)
    }

    fn broadcast_bool(&self, root: i32, value: bool) -> bool {
        let mut v: i32 = i32::from(value);
        self.0.process_at_rank(root).broadcast_into(&mut v);
        v != 0
    }

    fn broadcast_bytes(&self, root: i32, buf: &mut [u8]) {
        self.0.process_at_rank(root).broadcast_into(buf);
    }

    fn send(&self, dest: i32, tag: i32, buf: &[u8]) {
        self.0.process_at_rank(dest).send_with_tag(buf, tag);
    }

    fn recv(&self, src: i32, tag: i32, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        let (_msg, _status) = self.0.process_at_rank(src).receive_into_with_tag(&mut buf, tag);
        buf
    }
}

fn open_std(path: &Path, mode: OpenMode) -> std::io::Result<File> {
    let mut opts = OpenOptions::new();
    match mode {
        OpenMode::Read => {
            opts.read(true);
        }
        OpenMode::WriteCreate => {
            opts.write(true).create(true).truncate(true);
        }
        OpenMode::WriteAppend => {
            opts.write(true).create(true);
        }
    }
    opts.open(path)
}

/// Variant 1 of spec.md §4.4: full MPI-IO, modeled as every rank holding
/// its own OS file handle onto the shared path.
pub struct FullMpiIo<'c> {
    pub comm: &'c MpiWorldCommunicator,
}

impl<'c> IoBackend for FullMpiIo<'c> {
    type Handle = File;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<File, ErrorCode> {
        let f = open_std(path, mode).map_err(io_err_from)?;
        self.comm.barrier();
        Ok(f)
    }

    fn read_at(&self, h: &mut File, offset: u64, buf: &mut [u8]) -> Result<usize, ErrorCode> {
        h.read_at(buf, offset).map_err(io_err_from)
    }

    fn write_at(&self, h: &mut File, offset: u64, buf: &[u8]) -> Result<usize, ErrorCode> {
        h.write_at(buf, offset).map_err(io_err_from)?;
        Ok(buf.len())
    }

    fn read_at_all(&self, h: &mut File, offset: u64, buf: &mut [u8]) -> Result<usize, ErrorCode> {
        let n = self.read_at(h, offset, buf)?;
        self.comm.barrier();
        Ok(n)
    }

    fn write_at_all(&self, h: &mut File, offset: u64, buf: &[u8]) -> Result<usize, ErrorCode> {
        let n = self.write_at(h, offset, buf)?;
        self.comm.barrier();
        Ok(n)
    }

    fn close(&self, h: File) -> Result<(), ErrorCode> {
        drop(h);
        self.comm.barrier();
        Ok(())
    }
}

/// Variant 2 of spec.md §4.4: only rank 0 ever opens the real file; the
/// collective entry points are emulated by a token ring of tag-1 integer
/// messages. Offset is ignored in append mode, so rank order determines
/// final byte order, exactly as spec.md describes.
pub struct RingMpiIo<'c> {
    pub comm: &'c MpiWorldCommunicator,
    pub path: PathBuf,
    pub append: bool,
}

const RING_TAG: i32 = 1;

impl<'c> RingMpiIo<'c> {
    fn wait_for_token(&self) {
        let rank = self.comm.rank();
        if rank > 0 {
            let _ = self.comm.recv(rank - 1, RING_TAG, 0);
        }
    }

    fn pass_token(&self) {
        let rank = self.comm.rank();
        let size = self.comm.size();
        if rank + 1 < size {
            self.comm.send(rank + 1, RING_TAG, &[]);
        }
    }
}

impl<'c> IoBackend for RingMpiIo<'c> {
    /// Rank 0 keeps a real handle open across the whole context lifetime in
    /// non-append mode; every call re-derives its own access in ring order.
    type Handle = Option<File>;

    fn open(&self, path: &Path, mode: OpenMode) -> Result<Option<File>, ErrorCode> {
        if self.comm.rank() == 0 {
            let f = open_std(path, mode).map_err(io_err_from)?;
            Ok(Some(f))
        } else {
            Ok(None)
        }
    }

    fn read_at(&self, h: &mut Option<File>, offset: u64, buf: &mut [u8]) -> Result<usize, ErrorCode> {
        match h {
            Some(f) => f.read_at(buf, offset).map_err(io_err_from),
            None => Ok(0),
        }
    }

    fn write_at(&self, h: &mut Option<File>, offset: u64, buf: &[u8]) -> Result<usize, ErrorCode> {
        match h {
            Some(f) => {
                f.write_at(buf, offset).map_err(io_err_from)?;
                Ok(buf.len())
            }
            None => Ok(0),
        }
    }

    fn read_at_all(&self, _h: &mut Option<File>, offset: u64, buf: &mut [u8]) -> Result<usize, ErrorCode> {
        self.wait_for_token();
        let result = {
            let mut f = open_std(&self.path, OpenMode::Read).map_err(io_err_from)?;
            f.read_at(buf, offset).map_err(io_err_from)
        };
        self.pass_token();
        self.comm.barrier();
        result
    }

    fn write_at_all(&self, _h: &mut Option<File>, offset: u64, buf: &[u8]) -> Result<usize, ErrorCode> {
        self.wait_for_token();
        let mode = if self.append {
            OpenMode::WriteAppend
        } else {
            OpenMode::WriteCreate
        };
        let result = {
            let mut f = open_std(&self.path, mode).map_err(io_err_from)?;
            let off = if self.append {
                f.metadata().map(|m| m.len()).unwrap_or(offset)
            } else {
                offset
            };
            f.write_at(buf, off).map_err(io_err_from).map(|_| buf.len())
        };
        self.pass_token();
        self.comm.barrier();
        result
    }

    fn close(&self, h: Option<File>) -> Result<(), ErrorCode> {
        drop(h);
        self.comm.barrier();
        Ok(())
    }
}

/// Sanity helper matching spec.md §4.7's "a zero-byte write ... must not
/// raise COUNT" tie-break, reused by the ring/full backends' callers.
pub fn check_no_count_error_on_empty(got: usize) -> Result<(), ErrorCode> {
    check_count(got, got)
}
