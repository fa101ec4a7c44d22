//! File-context state machine (component C6): owns the communicator, the
//! open file handle, the fuzzy-error configuration, and the implicit
//! write/read cursor. Grounded in `sc_scda_fcontext_t` and
//! `sc_scda_fopen_write`/`sc_scda_fopen_read`/`sc_scda_fclose` in
//! `sc_scda.c`.

use crate::collective::{broadcast_count_ok, broadcast_error_code, Communicator};
use crate::error::{handle_non_collective, ErrorCode, FuzzyConfig, FuzzyRng, ScdaError};
use crate::io::{check_count, IoBackend, OpenMode};
use crate::pad;
use crate::section::header::{validate_user_string, USER_STRING_FIELD, USER_STRING_MAX};

const MAGIC: &[u8] = b"scdata0";
const VENDOR_STRING: &[u8] = b"scda-rs";
const VENDOR_STRING_FIELD: usize = 24;
pub const HEADER_BYTES: usize = 128;

/// What the state machine expects next; any call outside the listed
/// transition is a [`ScdaError::Usage`] error per spec.md §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Writing,
    /// `expect_sizes = true` after a `V` header until `fread_varray_sizes`
    /// has run; reading varray data before that is a usage error.
    Reading { awaiting_sizes: bool },
    Closed,
    Failed,
}

pub struct FileContext<C: Communicator, IO: IoBackend> {
    pub comm: C,
    pub io: IO,
    pub handle: IO::Handle,
    pub root: i32,
    pub cursor: u64,
    pub fuzzy: FuzzyConfig,
    pub rng: FuzzyRng,
    pub state: ContextState,
}

impl<C: Communicator, IO: IoBackend> FileContext<C, IO> {
    /// Draws a fuzzy-injected error on the success path, if enabled.
    /// Every non-collective step that would otherwise report unconditional
    /// success routes through this so fuzzy injection applies uniformly
    /// (spec.md §4.5).
    pub(crate) fn fuzzy_override(&mut self, success: ErrorCode) -> ErrorCode {
        if !self.fuzzy.enabled {
            return success;
        }
        let freq = self.fuzzy.resolved_freq();
        if let Some(scda) = crate::error::fuzzy_scda_error(&mut self.rng, freq) {
            if scda == ScdaError::Mpi {
                let mpi = crate::error::fuzzy_mpi_error(&mut self.rng, freq);
                return ErrorCode::from_mpi(mpi);
            }
            return ErrorCode::from_scda(scda);
        }
        success
    }

    pub(crate) fn broadcast_err(&self, root: i32, local: Option<ErrorCode>) -> Result<(), ErrorCode> {
        handle_non_collective(
            &|r, v| broadcast_error_code(&self.comm, r, v),
            root,
            local,
        )
    }

    #[allow(dead_code)]
    pub(crate) fn broadcast_count(&self, root: i32, local_ok: Option<bool>) -> Result<(), ErrorCode> {
        crate::error::handle_count_error(
            &|r, v| broadcast_count_ok(&self.comm, r, v),
            root,
            local_ok,
        )
    }

    /// `open_write(comm, filename, user_string, options)`: creates/truncates
    /// the file, writes the 128-byte header on rank 0, and transitions to
    /// `Writing`.
    pub fn open_write(
        comm: C,
        io: IO,
        path: &std::path::Path,
        user_string: &[u8],
        fuzzy: FuzzyConfig,
    ) -> Result<Self, ErrorCode> {
        let root = 0;
        let handle = io.open(path, OpenMode::WriteCreate)?;

        let rank = comm.rank();
        let seed = resolve_fuzzy_seed(&comm, &fuzzy, root);
        let mut ctx = FileContext {
            comm,
            io,
            handle,
            root,
            cursor: 0,
            fuzzy,
            rng: FuzzyRng::new(seed),
            state: ContextState::Writing,
        };

        let local_result = if rank == root {
            Some(ctx.write_file_header(user_string))
        } else {
            None
        };
        ctx.broadcast_err(root, local_result)?;
        Ok(ctx)
    }

    fn write_file_header(&mut self, user_string: &[u8]) -> ErrorCode {
        if let Err(e) = validate_user_string(user_string) {
            return e;
        }
        let mut buf = Vec::with_capacity(HEADER_BYTES);
        buf.extend_from_slice(MAGIC);
        buf.push(b' ');
        buf.extend_from_slice(&pad::pad_to_fix_len(VENDOR_STRING, VENDOR_STRING_FIELD));
        buf.push(b'F');
        buf.push(b' ');
        buf.extend_from_slice(&pad::pad_to_fix_len(user_string, USER_STRING_FIELD));
        buf.extend_from_slice(&pad::pad_to_mod(&[]));
        debug_assert_eq!(buf.len(), HEADER_BYTES);

        let written = match self.io.write_at(&mut self.handle, 0, &buf) {
            Ok(n) => n,
            Err(e) => return e,
        };
        if let Err(e) = check_count(written, HEADER_BYTES) {
            return e;
        }
        self.cursor = HEADER_BYTES as u64;
        self.fuzzy_override(ErrorCode::SUCCESS)
    }

    /// `open_read(comm, filename, options)`: reads and validates the
    /// 128-byte header on rank 0, broadcasts the extracted user string,
    /// and transitions to `Reading`.
    pub fn open_read(
        comm: C,
        io: IO,
        path: &std::path::Path,
        fuzzy: FuzzyConfig,
    ) -> Result<(Self, Vec<u8>), ErrorCode> {
        let root = 0;
        let handle = io.open(path, OpenMode::Read)?;

        let rank = comm.rank();
        let seed = resolve_fuzzy_seed(&comm, &fuzzy, root);
        let mut ctx = FileContext {
            comm,
            io,
            handle,
            root,
            cursor: 0,
            fuzzy,
            rng: FuzzyRng::new(seed),
            // Starts `true` so a `fread_varray_data` call with no preceding
            // `fread_varray_sizes` at all is rejected, not just one that
            // follows another V section's sizes read out of order.
            state: ContextState::Reading { awaiting_sizes: true },
        };

        let mut user_string = vec![0u8; USER_STRING_MAX];
        let mut user_string_len = 0usize;
        let local_result = if rank == root {
            match ctx.read_file_header() {
                Ok(s) => {
                    user_string_len = s.len();
                    user_string[..s.len()].copy_from_slice(&s);
                    ctx.fuzzy_override(ErrorCode::SUCCESS)
                }
                Err(e) => e,
            }
        } else {
            ErrorCode::SUCCESS
        };
        let local = if rank == root { Some(local_result) } else { None };
        ctx.broadcast_err(root, local)?;

        ctx.comm.broadcast_bytes(root, &mut user_string);
        let mut len_buf = [user_string_len as u8, (user_string_len >> 8) as u8];
        ctx.comm.broadcast_bytes(root, &mut len_buf);
        let len = len_buf[0] as usize | ((len_buf[1] as usize) << 8);
        user_string.truncate(len);

        ctx.cursor = HEADER_BYTES as u64;
        Ok((ctx, user_string))
    }

    fn read_file_header(&mut self) -> Result<Vec<u8>, ErrorCode> {
        let mut buf = vec![0u8; HEADER_BYTES];
        let n = self.io.read_at(&mut self.handle, 0, &mut buf)?;
        check_count(n, HEADER_BYTES)?;

        if &buf[..MAGIC.len()] != MAGIC || buf[MAGIC.len()] != b' ' {
            return Err(ErrorCode::from_scda(ScdaError::Format));
        }
        let mut pos = MAGIC.len() + 1;
        let _vendor = pad::get_pad_to_fix_len(&buf[pos..pos + VENDOR_STRING_FIELD])?;
        pos += VENDOR_STRING_FIELD;

        if buf[pos] != b'F' || buf[pos + 1] != b' ' {
            return Err(ErrorCode::from_scda(ScdaError::Format));
        }
        pos += 2;

        let user_string = pad::get_pad_to_fix_len(&buf[pos..pos + USER_STRING_FIELD])?.to_vec();
        pos += USER_STRING_FIELD;

        let _ = pad::get_pad_to_mod(&buf[pos..], 0)?;
        Ok(user_string)
    }

    /// `fclose`: the only legal terminal transition from `Writing` or
    /// `Reading`. Closing an already-closed or failed context is a usage
    /// error.
    pub fn fclose(self) -> Result<(), ErrorCode> {
        match self.state {
            ContextState::Closed | ContextState::Failed => {
                return Err(ErrorCode::from_scda(ScdaError::Usage));
            }
            _ => {}
        }
        self.comm.barrier();
        let FileContext { io, handle, .. } = self;
        io.close(handle)
    }

    pub(crate) fn fail(&mut self) {
        self.state = ContextState::Failed;
    }
}

/// A negative `fuzzy.seed` asks for time-based seeding; rank `root` draws a
/// concrete seed and broadcasts it so every rank's [`FuzzyRng`] agrees,
/// matching spec.md §4.5's "seeding is collective" rule. This port has no
/// wall-clock dependency, so it substitutes a fixed constant rather than
/// reading the time.
fn resolve_fuzzy_seed<C: Communicator>(comm: &C, fuzzy: &FuzzyConfig, root: i32) -> u64 {
    let seed = if fuzzy.seed < 0 {
        0x1234_5678_9abc_def0
    } else {
        fuzzy.seed as u64
    };
    let mut buf = if comm.rank() == root { seed.to_le_bytes() } else { [0u8; 8] };
    comm.broadcast_bytes(root, &mut buf);
    u64::from_le_bytes(buf)
}
