use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `permsweep` crate.
#[derive(Debug, Error)]
pub enum SweepError {
    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io { source: std::io::Error, path: PathBuf },

    /// The directory walk hit an entry it could not read and stopped.
    #[error("walk of '{}' aborted: {source}", root.display())]
    Walk { root: PathBuf, source: walkdir::Error },

    /// An entry could not be added to the backup archive.
    #[error("failed to archive '{}': {source}", path.display())]
    Archive { path: PathBuf, source: std::io::Error },

    /// The permission fixer could not stat a path.
    #[error("failed to stat '{}': {source}", path.display())]
    Stat { path: PathBuf, source: std::io::Error },

    /// The permission fixer could not change the mode of a path.
    #[error("failed to set mode {mode:o} on '{}': {source}", path.display())]
    Permission { path: PathBuf, mode: u32, source: std::io::Error },

    /// Neither `-f` nor a positional path was supplied.
    #[error("no root path given; pass -f <PATH> or a positional path")]
    MissingRoot,

    /// The worker pool was asked to run with zero workers.
    #[error("concurrency must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    /// Raised under the keep-going policy once every path has been attempted.
    #[error("{0} permission change(s) failed")]
    FixFailures(usize),

    #[error("channel closed unexpectedly")]
    ChannelClosed,

    #[error("a worker thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, SweepError>;

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for SweepError {
    fn from(err: std::io::Error) -> Self {
        SweepError::Io { source: err, path: PathBuf::new() }
    }
}

impl SweepError {
    /// Attach the offending path to a bare I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SweepError::Io { source, path: path.into() }
    }
}
