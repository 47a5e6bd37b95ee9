//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout sh2ex.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Only [`Error::Truncated`] is meant to be recovered from: the caller
/// reports it and moves on to the next asset. Everything else aborts a run.
#[derive(Debug)]
pub enum Error {
    /// Sector 16 holds neither a raw nor a cooked Primary Volume Descriptor.
    UnrecognizedFormat,
    /// The image ended before all expected bytes could be read.
    UnexpectedEof,
    /// A null-terminated string had no null terminator within the buffer.
    UnterminatedName,
    /// An offset or translated address falls outside the buffer it indexes.
    InvalidRange,
    /// A VFS fragment chain starting at `address` never reached a terminal
    /// node.
    ChainLoop { address: u32 },
    /// No known executable build was found on the disc.
    UnknownExecutable,
    /// An extraction stopped after `written` of `expected` bytes.
    Truncated { expected: u64, written: u64 },
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnrecognizedFormat => write!(f, "unrecognized disk image format"),
            Error::UnexpectedEof => write!(f, "unexpected end of file"),
            Error::UnterminatedName => write!(f, "unterminated string"),
            Error::InvalidRange => write!(f, "invalid offset or size"),
            Error::ChainLoop { address } => {
                write!(f, "VFS chain at {address:#010X} does not terminate")
            }
            Error::UnknownExecutable => write!(f, "unsupported version"),
            Error::Truncated { expected, written } => {
                write!(f, "truncated: wrote {written} of {expected} bytes")
            }
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }
}
