use std::fmt;
use std::path::PathBuf;

use bstr::BString;
use thiserror::Error;

/// Errors returned by repository operations.
/// Every filesystem fault is classified where it happens; there is no
/// catch-all variant.
#[derive(Debug, Error)]
pub enum Error {
    /// The script (or its source file) does not exist.
    #[error("script not found: {0}")]
    NotFound(BString),

    /// The script source was rejected by the parser.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// The script parsed, but bytecode generation or emission failed.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("unable to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn outcome(&self) -> Outcome {
        match self {
            Error::NotFound(_) => Outcome::NotFound,
            Error::InvalidScript(_) => Outcome::Invalid,
            Error::ProcessingFailed(_) => Outcome::Fail,
            Error::Io { .. } | Error::Rename { .. } => Outcome::IoError,
        }
    }
}

/// The result codes reported to callers of the repository.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Ok,
    NotFound,
    Invalid,
    Fail,
    IoError,
}

impl Outcome {
    pub fn of<T>(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => Outcome::Ok,
            Err(e) => e.outcome(),
        }
    }
}

impl From<&Error> for Outcome {
    fn from(value: &Error) -> Self {
        value.outcome()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Ok => "OK",
            Outcome::NotFound => "NOTFOUND",
            Outcome::Invalid => "INVALID",
            Outcome::Fail => "FAIL",
            Outcome::IoError => "IOERROR",
        })
    }
}
