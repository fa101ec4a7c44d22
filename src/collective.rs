//! Collective protocol helpers (component C8) and the [`Communicator`]
//! abstraction that C4 (the MPI-IO shim) and C6 (the file-context state
//! machine) both sit on top of.
//!
//! `scan_counts` mirrors the local prefix-sum arithmetic described in
//! spec.md §4.8; it is plain arithmetic, not a reduction, since every rank
//! already holds the full partition array. The error/count broadcast
//! helpers wrap whatever communicator backend the context was opened with.

use crate::error::{ErrorCode, MpiErrorClass, ScdaError};

/// The minimal set of MPI collectives the scda engine needs: rank/size
/// inspection, a barrier, a 2-integer error-code broadcast, a boolean
/// broadcast, and the tag-1 token-ring primitives the no-MPI-IO fallback
/// uses (send/receive).
///
/// Implemented by [`SingleProcessCommunicator`] unconditionally, and by
/// `crate::io::mpi_backend::MpiWorldCommunicator` when the `mpi` feature is
/// enabled.
pub trait Communicator {
    fn rank(&self) -> i32;
    fn size(&self) -> i32;

    /// Blocks until every rank in the communicator has called `barrier`.
    fn barrier(&self);

    /// Broadcasts `value` from `root` to every rank; every rank (including
    /// `root`) returns the same value.
    fn broadcast_error(&self, root: i32, value: ErrorCode) -> ErrorCode;

    /// Broadcasts a single boolean (used by the count-error protocol).
    fn broadcast_bool(&self, root: i32, value: bool) -> bool;

    /// Broadcasts an arbitrary byte buffer from `root`; every non-root rank
    /// passes a same-length buffer to receive into.
    fn broadcast_bytes(&self, root: i32, buf: &mut [u8]);

    /// Send to `dest` with the given tag (blocking). Used only by the
    /// no-MPI-IO token ring.
    fn send(&self, dest: i32, tag: i32, buf: &[u8]);

    /// Receive from `src` with the given tag (blocking).
    fn recv(&self, src: i32, tag: i32, len: usize) -> Vec<u8>;
}

/// The default, always-available communicator: exactly one rank. `barrier`
/// and the broadcasts are no-ops (there is nothing to synchronize with);
/// `send`/`recv` are unreachable in a one-rank communicator and panic if
/// ever called, which would indicate an engine bug rather than a user error.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcessCommunicator;

impl Communicator for SingleProcessCommunicator {
    fn rank(&self) -> i32 {
        0
    }

    fn size(&self) -> i32 {
        1
    }

    fn barrier(&self) {}

    fn broadcast_error(&self, _root: i32, value: ErrorCode) -> ErrorCode {
        value
    }

    fn broadcast_bool(&self, _root: i32, value: bool) -> bool {
        value
    }

    fn broadcast_bytes(&self, _root: i32, _buf: &mut [u8]) {
        // single rank: buf already holds root's own data
    }

    fn send(&self, _dest: i32, _tag: i32, _buf: &[u8]) {
        unreachable!("SingleProcessCommunicator has no peer rank to send to")
    }

    fn recv(&self, _src: i32, _tag: i32, _len: usize) -> Vec<u8> {
        unreachable!("SingleProcessCommunicator has no peer rank to receive from")
    }
}

/// Local prefix sum over a partition: `offsets[p] = sum(counts[0..p])`,
/// `offsets[P] = sum(counts[0..P])` (the global total). This is ordinary
/// arithmetic available identically on every rank, not a reduction —
/// spec.md §4.8 calls this out explicitly.
pub fn scan_counts(counts: &[u64]) -> Vec<u64> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut acc = 0u64;
    offsets.push(0);
    for &c in counts {
        acc += c;
        offsets.push(acc);
    }
    offsets
}

/// Broadcasts an [`ErrorCode`]'s two axes from `root` as a pair of small
/// integers, the collective counterpart of spec.md §4.5's
/// `MPI_Bcast` on a 2-integer buffer.
pub fn broadcast_error_code(comm: &dyn Communicator, root: i32, value: ErrorCode) -> ErrorCode {
    comm.broadcast_error(root, value)
}

/// Every rank OR-combines a local "count matched" boolean through a
/// broadcast from the designated rank, per spec.md §4.8's count protocol.
pub fn broadcast_count_ok(comm: &dyn Communicator, root: i32, local_ok: bool) -> bool {
    comm.broadcast_bool(root, local_ok)
}

/// Encode an [`ErrorCode`] as `(scda_tag, mpi_tag)` for transport over a
/// plain 2-integer broadcast channel.
pub fn encode_error_code(code: ErrorCode) -> (i32, i32) {
    let scda_tag = match code.scda {
        None => 0,
        Some(ScdaError::Format) => 1,
        Some(ScdaError::Usage) => 2,
        Some(ScdaError::Decode) => 3,
        Some(ScdaError::Input) => 4,
        Some(ScdaError::Count) => 5,
        Some(ScdaError::Mpi) => 6,
        Some(ScdaError::Unknown) => 7,
    };
    let mpi_tag = mpi_class_to_tag(code.mpi);
    (scda_tag, mpi_tag)
}

/// Inverse of [`encode_error_code`].
pub fn decode_error_code(scda_tag: i32, mpi_tag: i32) -> ErrorCode {
    let mpi = mpi_tag_to_class(mpi_tag);
    match scda_tag {
        0 => ErrorCode::SUCCESS,
        1 => ErrorCode::from_scda(ScdaError::Format),
        2 => ErrorCode::from_scda(ScdaError::Usage),
        3 => ErrorCode::from_scda(ScdaError::Decode),
        4 => ErrorCode::from_scda(ScdaError::Input),
        5 => ErrorCode::from_scda(ScdaError::Count),
        6 => ErrorCode::from_mpi(mpi),
        _ => ErrorCode::from_scda(ScdaError::Unknown),
    }
}

fn mpi_class_to_tag(c: MpiErrorClass) -> i32 {
    match c {
        MpiErrorClass::Success => 0,
        MpiErrorClass::File => 1,
        MpiErrorClass::NotSame => 2,
        MpiErrorClass::Amode => 3,
        MpiErrorClass::UnsupportedDatarep => 4,
        MpiErrorClass::UnsupportedOperation => 5,
        MpiErrorClass::NoSuchFile => 6,
        MpiErrorClass::FileExists => 7,
        MpiErrorClass::BadFile => 8,
        MpiErrorClass::Access => 9,
        MpiErrorClass::NoSpace => 10,
        MpiErrorClass::Quota => 11,
        MpiErrorClass::ReadOnly => 12,
        MpiErrorClass::FileInUse => 13,
        MpiErrorClass::DupDatarep => 14,
        MpiErrorClass::Conversion => 15,
        MpiErrorClass::Io => 16,
    }
}

fn mpi_tag_to_class(tag: i32) -> MpiErrorClass {
    match tag {
        1 => MpiErrorClass::File,
        2 => MpiErrorClass::NotSame,
        3 => MpiErrorClass::Amode,
        4 => MpiErrorClass::UnsupportedDatarep,
        5 => MpiErrorClass::UnsupportedOperation,
        6 => MpiErrorClass::NoSuchFile,
        7 => MpiErrorClass::FileExists,
        8 => MpiErrorClass::BadFile,
        9 => MpiErrorClass::Access,
        10 => MpiErrorClass::NoSpace,
        11 => MpiErrorClass::Quota,
        12 => MpiErrorClass::ReadOnly,
        13 => MpiErrorClass::FileInUse,
        14 => MpiErrorClass::DupDatarep,
        15 => MpiErrorClass::Conversion,
        16 => MpiErrorClass::Io,
        _ => MpiErrorClass::Success,
    }
}
