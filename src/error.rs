//! Error model (component C5) — the two-axis `(scdaret, mpiret)` error code,
//! its string formatter, and the fuzzy error injector.
//!
//! Ported from the `sc_scda_ferror_t` enum, `sc_scda_ferror_string`, and the
//! `sc_scda_get_fuzzy_scdaret` / `sc_scda_get_fuzzy_mpiret` pair in
//! `sc_scda.c`. The five "macro scheme" helpers described in spec.md §4.5
//! (`check-collective-error`, `check-non-collective-error`,
//! `handle-non-collective-error`, `check/handle-count-error`) have no
//! preprocessor equivalent in Rust; they become the plain functions at the
//! bottom of this module, used by every public `Context` method.

use std::fmt;

/// The closed scda error taxonomy (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScdaError {
    /// Structural violation of the header, a padding field, or sizing numerals.
    Format,
    /// A read workflow violation: wrong section-data call for the last header,
    /// or `fread_varray_data` without first calling `fread_varray_sizes`.
    Usage,
    /// A `decode = true` read saw a malformed encoding envelope.
    Decode,
    /// A caller argument is invalid (NULL-equivalent, overlong user string,
    /// incoherent partition, ...).
    Input,
    /// The byte count returned by the underlying I/O does not match the
    /// requested count and no other category applies.
    Count,
    /// Any underlying MPI or MPI-IO error; see [`MpiErrorClass`] for the axis.
    Mpi,
    /// Catch-all, reserved for forward compatibility.
    Unknown,
}

impl fmt::Display for ScdaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScdaError::Format => "file does not conform to the scda format",
            ScdaError::Usage => "incorrect read workflow",
            ScdaError::Decode => "malformed encoding envelope",
            ScdaError::Input => "invalid argument",
            ScdaError::Count => "byte count mismatch",
            ScdaError::Mpi => "MPI or MPI-IO error",
            ScdaError::Unknown => "unknown I/O error",
        };
        f.write_str(s)
    }
}

/// A closed set of 16 MPI-IO error classes, mirroring the MPI 2.0 I/O error
/// codes the fuzzy injector samples from and that the errno mapper in
/// [`crate::io::errno`] produces. `scda: Mpi` errors always carry one of
/// these (or [`MpiErrorClass::Success`] is never stored as the MPI axis of
/// a non-success [`ErrorCode`] — see the two-axis invariant below).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpiErrorClass {
    Success,
    File,
    NotSame,
    Amode,
    UnsupportedDatarep,
    UnsupportedOperation,
    NoSuchFile,
    FileExists,
    BadFile,
    Access,
    NoSpace,
    Quota,
    ReadOnly,
    FileInUse,
    DupDatarep,
    Conversion,
    Io,
}

impl MpiErrorClass {
    /// The 16 non-success classes the fuzzy injector draws uniformly from,
    /// in the order `sc_scda_get_fuzzy_mpiret` enumerates them.
    const FUZZY_CLASSES: [MpiErrorClass; 16] = [
        MpiErrorClass::File,
        MpiErrorClass::NotSame,
        MpiErrorClass::Amode,
        MpiErrorClass::UnsupportedDatarep,
        MpiErrorClass::UnsupportedOperation,
        MpiErrorClass::NoSuchFile,
        MpiErrorClass::FileExists,
        MpiErrorClass::BadFile,
        MpiErrorClass::Access,
        MpiErrorClass::NoSpace,
        MpiErrorClass::Quota,
        MpiErrorClass::ReadOnly,
        MpiErrorClass::FileInUse,
        MpiErrorClass::DupDatarep,
        MpiErrorClass::Conversion,
        MpiErrorClass::Io,
    ];

    pub fn is_success(&self) -> bool {
        matches!(self, MpiErrorClass::Success)
    }
}

impl fmt::Display for MpiErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MpiErrorClass::Success => "success",
            MpiErrorClass::File => "invalid file handle",
            MpiErrorClass::NotSame => "collective argument not identical across ranks",
            MpiErrorClass::Amode => "invalid access mode",
            MpiErrorClass::UnsupportedDatarep => "unsupported data representation",
            MpiErrorClass::UnsupportedOperation => "unsupported operation",
            MpiErrorClass::NoSuchFile => "no such file",
            MpiErrorClass::FileExists => "file already exists",
            MpiErrorClass::BadFile => "invalid file name",
            MpiErrorClass::Access => "permission denied",
            MpiErrorClass::NoSpace => "no space left",
            MpiErrorClass::Quota => "quota exceeded",
            MpiErrorClass::ReadOnly => "read-only file system",
            MpiErrorClass::FileInUse => "file currently in use",
            MpiErrorClass::DupDatarep => "duplicate data representation",
            MpiErrorClass::Conversion => "data conversion error",
            MpiErrorClass::Io => "other I/O error",
        };
        f.write_str(s)
    }
}

/// The two-axis error code every public scda operation returns.
///
/// Exactly one of the three shapes in spec.md §3 holds: both axes are the
/// default (success); `mpi` is non-success and `scda == Mpi`; or `scda` is
/// non-success (anything but `Mpi`) and `mpi == Success`. The constructors
/// below are the only way to build a non-trivial value, which keeps that
/// invariant mechanically true and gives the fuzzy injector one seam to hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub scda: Option<ScdaError>,
    pub mpi: MpiErrorClass,
}

impl ErrorCode {
    pub const SUCCESS: ErrorCode = ErrorCode {
        scda: None,
        mpi: MpiErrorClass::Success,
    };

    /// Build a non-MPI error. Panics if asked to build `ScdaError::Mpi` this
    /// way — use [`ErrorCode::from_mpi`] instead, which carries the class.
    pub fn from_scda(e: ScdaError) -> ErrorCode {
        assert!(!matches!(e, ScdaError::Mpi), "use ErrorCode::from_mpi for MPI errors");
        ErrorCode {
            scda: Some(e),
            mpi: MpiErrorClass::Success,
        }
    }

    /// Build an MPI-class error. `class == Success` is treated as no error.
    pub fn from_mpi(class: MpiErrorClass) -> ErrorCode {
        if class.is_success() {
            return ErrorCode::SUCCESS;
        }
        ErrorCode {
            scda: Some(ScdaError::Mpi),
            mpi: class,
        }
    }

    pub fn is_success(&self) -> bool {
        self.scda.is_none()
    }
}

impl fmt::Display for ErrorCode {
    /// Prefers the MPI message when `scda == Mpi`, per spec.md §4.5's
    /// error-to-string routine.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scda {
            None => f.write_str("success"),
            Some(ScdaError::Mpi) => write!(f, "MPI error: {}", self.mpi),
            Some(e) => write!(f, "{e}"),
        }
    }
}

/// Renders an [`ErrorCode`] to text. A thin wrapper over `Display` kept
/// around for parity with `sc_scda_ferror_string`'s caller-buffer signature;
/// Rust callers can just use `to_string()` / `{}` directly.
pub fn error_to_string(code: ErrorCode) -> String {
    code.to_string()
}

// ─────────────────────────────────────────────────────────────────────────
// Fuzzy error injection (sc_scda_get_fuzzy_scdaret / sc_scda_get_fuzzy_mpiret)
// ─────────────────────────────────────────────────────────────────────────

/// Collective fuzzy-error configuration bound into a [`crate::context::Context`]
/// at open time (spec.md §6 "Configuration options").
#[derive(Debug, Clone, Copy)]
pub struct FuzzyConfig {
    pub enabled: bool,
    /// `< 0` means "derive from wall clock on rank 0 and broadcast" at open
    /// time; by the time a `FuzzyConfig` is bound into a live context the
    /// seed has always already been resolved to a concrete, non-negative
    /// value (see `Context::resolve_fuzzy_seed`).
    pub seed: i64,
    /// Empirical injection period; `< 0` means "use the default of 3".
    pub freq: i32,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        FuzzyConfig {
            enabled: false,
            seed: -1,
            freq: -1,
        }
    }
}

impl FuzzyConfig {
    pub fn resolved_freq(&self) -> u32 {
        if self.freq < 0 {
            3
        } else {
            self.freq as u32
        }
    }
}

/// A tiny deterministic PRNG (xorshift64*) seeded per-context so that fuzzy
/// injection is reproducible given a seed, without pulling in a `rand`
/// dependency for what is a debug-only knob.
pub struct FuzzyRng(u64);

impl FuzzyRng {
    pub fn new(seed: u64) -> Self {
        FuzzyRng(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform integer in `[0, bound)`.
    fn below(&mut self, bound: u32) -> u32 {
        (self.next_u64() % bound as u64) as u32
    }

    /// Draws `true` with empirical probability `1/freq`.
    fn hits(&mut self, freq: u32) -> bool {
        freq > 0 && self.below(freq) == 0
    }
}

/// Draws a synthetic scda-axis error with probability `1/freq`, uniformly
/// over the whole `sc_scda_ferror_t` taxonomy, `Mpi` included — when the
/// draw lands on `Mpi`, the caller (see `Context::fuzzy_override`) goes on
/// to draw a concrete [`MpiErrorClass`] via [`fuzzy_mpi_error`].
pub fn fuzzy_scda_error(rng: &mut FuzzyRng, freq: u32) -> Option<ScdaError> {
    const CHOICES: [ScdaError; 7] = [
        ScdaError::Format,
        ScdaError::Usage,
        ScdaError::Decode,
        ScdaError::Input,
        ScdaError::Count,
        ScdaError::Mpi,
        ScdaError::Unknown,
    ];
    if rng.hits(freq) {
        let idx = rng.below(CHOICES.len() as u32) as usize;
        Some(CHOICES[idx])
    } else {
        None
    }
}

/// Draws a synthetic MPI error class with probability `1/freq`, uniformly
/// over the 16-member MPI 2.0 I/O error set.
pub fn fuzzy_mpi_error(rng: &mut FuzzyRng, freq: u32) -> MpiErrorClass {
    if rng.hits(freq) {
        let idx = rng.below(MpiErrorClass::FUZZY_CLASSES.len() as u32) as usize;
        MpiErrorClass::FUZZY_CLASSES[idx]
    } else {
        MpiErrorClass::Success
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Collective error-propagation helpers (the five conceptual macros)
// ─────────────────────────────────────────────────────────────────────────

/// *check-collective-error*: evaluate the result of a call every rank has
/// already made collectively (e.g. a barrier or a `read_at_all`). No
/// broadcast is needed since every rank already observed the same thing;
/// this just turns it into a `Result` for `?`-propagation.
pub fn check_collective(code: ErrorCode) -> Result<(), ErrorCode> {
    if code.is_success() {
        Ok(())
    } else {
        Err(code)
    }
}

/// *check-non-collective-error* / *handle-non-collective-error* combined:
/// after a rank-0-only (or other designated-rank-only) step, broadcast both
/// axes of the resulting error code from that rank to every rank, then
/// fail uniformly everywhere if it was non-success.
///
/// `local` is `Some(code)` only on the designated rank; every other rank
/// passes `None` and receives the broadcast value.
pub fn handle_non_collective<B>(
    broadcast: &B,
    root: i32,
    local: Option<ErrorCode>,
) -> Result<(), ErrorCode>
where
    B: Fn(i32, ErrorCode) -> ErrorCode,
{
    let code = broadcast(root, local.unwrap_or(ErrorCode::SUCCESS));
    check_collective(code)
}

/// *check/handle-count-error*: identical shape to
/// [`handle_non_collective`] but for the boolean "byte count matched"
/// signal, which every rank OR-combines into `Count` on failure.
pub fn handle_count_error<B>(broadcast_ok: &B, root: i32, local_ok: Option<bool>) -> Result<(), ErrorCode>
where
    B: Fn(i32, bool) -> bool,
{
    let ok = broadcast_ok(root, local_ok.unwrap_or(true));
    if ok {
        Ok(())
    } else {
        Err(ErrorCode::from_scda(ScdaError::Count))
    }
}
