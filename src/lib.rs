//! scda — a parallel, self-describing, human-inspectable scientific-data
//! file format with a collective I/O reference engine, ported from libsc's
//! `sc_scda`/`sc_io` modules.

pub mod collective;
pub mod context;
pub mod envelope;
pub mod error;
pub mod io;
pub mod pad;
pub mod section;
pub mod stream;

// ─────────────────────────────────────────────────────────────────────────
// File context (C6) — open/close and the read/write state machine.
// ─────────────────────────────────────────────────────────────────────────

/// The 128-byte on-disk file header length. Equivalent to `SC_SCDA_HEADER_BYTES`.
pub use context::HEADER_BYTES;
pub use context::{ContextState, FileContext};

// ─────────────────────────────────────────────────────────────────────────
// Error model (C5).
// ─────────────────────────────────────────────────────────────────────────

pub use error::{error_to_string, ErrorCode, FuzzyConfig, MpiErrorClass, ScdaError};

// ─────────────────────────────────────────────────────────────────────────
// Collective protocol (C8) and the communicator abstraction.
// ─────────────────────────────────────────────────────────────────────────

pub use collective::{scan_counts, Communicator, SingleProcessCommunicator};

// ─────────────────────────────────────────────────────────────────────────
// MPI-IO shim (C4).
// ─────────────────────────────────────────────────────────────────────────

pub use io::{IoBackend, NoMpiIo, OpenMode};

#[cfg(feature = "mpi")]
pub use io::mpi_backend::{MpiWorldCommunicator, RingMpiIo};
#[cfg(feature = "mpi")]
pub use io::mpi_backend::FullMpiIo;

// ─────────────────────────────────────────────────────────────────────────
// Section engine (C7) — the four on-disk section kinds.
// ─────────────────────────────────────────────────────────────────────────

pub use section::array::ArrayPayload;
pub use section::inline::INLINE_PAYLOAD_BYTES;
pub use section::{SectionDims, SectionHeader, SectionKind};

// ─────────────────────────────────────────────────────────────────────────
// Encoding envelope (C2) — exposed directly for callers who want the
// compression format without going through a section.
// ─────────────────────────────────────────────────────────────────────────

pub use envelope::{decode, decode_info, encode, CompressionMode};

// ─────────────────────────────────────────────────────────────────────────
// Byte-stream I/O abstraction (C3).
// ─────────────────────────────────────────────────────────────────────────

pub use stream::{ByteSink, ByteSource, SinkMode, StreamError};
