use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error as ThisError;

/// Status codes reported at the engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReturnCode {
    Success,
    NotSupported,
    Failure,
    MemoryFailure,
    FileOpenError,
    WritingFileError,
    BadParameter,
    /// Reported by the trip engine when the device is in a warning state.
    InProgress,
    Unknown,
}

impl ReturnCode {
    pub fn label(&self) -> &'static str {
        match self {
            ReturnCode::Success          => "SUCCESS",
            ReturnCode::NotSupported     => "NOT_SUPPORTED",
            ReturnCode::Failure          => "FAILURE",
            ReturnCode::MemoryFailure    => "MEMORY_FAILURE",
            ReturnCode::FileOpenError    => "FILE_OPEN_ERROR",
            ReturnCode::WritingFileError => "ERROR_WRITING_FILE",
            ReturnCode::BadParameter     => "BAD_PARAMETER",
            ReturnCode::InProgress       => "IN_PROGRESS",
            ReturnCode::Unknown          => "UNKNOWN",
        }
    }
}

/// Failure of a single request issued through a transport collaborator.
#[derive(ThisError, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("command not supported by the device or transport")]
    Unsupported,
    #[error("check condition: sense key {key:#x}, asc {asc:#04x}, ascq {ascq:#04x}")]
    Sense { key: u8, asc: u8, ascq: u8 },
    #[error("ATA command aborted: status {status:#04x}, error {error:#04x}")]
    Ata { status: u8, error: u8 },
    #[error("short transfer: expected {expected} bytes, got {actual}")]
    ShortTransfer { expected: usize, actual: usize },
    #[error("{0}")]
    Other(String),
}

#[derive(ThisError, Debug)]
pub enum Error {
    #[error("operation not supported: {0}")]
    NotSupported(String),
    #[error("operation failed: {0}")]
    Failure(String),
    #[error("unable to allocate {0} bytes")]
    MemoryFailure(usize),
    #[error("failed to open {}: {source}", path.display())]
    FileOpen { path: PathBuf, source: io::Error },
    #[error("failed to write output: {0}")]
    Write(io::Error),
    #[error("bad parameter: {0}")]
    BadParameter(String),
    #[error("transport request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("malformed data: {0}")]
    Parse(String),
}

impl Error {
    pub fn code(&self) -> ReturnCode {
        match self {
            Error::NotSupported(_)  => ReturnCode::NotSupported,
            Error::Failure(_)       => ReturnCode::Failure,
            Error::MemoryFailure(_) => ReturnCode::MemoryFailure,
            Error::FileOpen { .. }  => ReturnCode::FileOpenError,
            Error::Write(_)         => ReturnCode::WritingFileError,
            Error::BadParameter(_)  => ReturnCode::BadParameter,
            Error::Transport(_)     => ReturnCode::Failure,
            Error::Parse(_)         => ReturnCode::Failure,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocate a zeroed buffer, reporting allocation failure instead of aborting.
pub fn alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::MemoryFailure(len))?;
    buf.resize(len, 0);
    Ok(buf)
}
