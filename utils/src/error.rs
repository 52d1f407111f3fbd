use thiserror::Error;

/// Result type for the utility internals.
pub type UtilResult<T> = Result<T, UtilError>;

/// Failures a utility can hit. Syscall-level causes ride along so the
/// diagnostic the user sees carries the errno text.
#[derive(Debug, Error)]
pub enum UtilError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sys(#[from] nix::errno::Errno),
    /// An I/O error with the path it happened on.
    #[error("{path}: {source}")]
    At {
        path: String,
        source: std::io::Error,
    },
    #[error("missing operand")]
    MissingOperand,
    #[error("unknown option `{0}`")]
    UnknownOption(String),
    #[error("invalid mode `{0}`")]
    InvalidMode(String),
    #[error("invalid buffer size `{0}`")]
    InvalidBufferSize(String),
    #[error("unknown user `{0}`")]
    UnknownUser(String),
    #[error("unknown group `{0}`")]
    UnknownGroup(String),
    #[error("cannot remove `{0}`: is a directory (use -r)")]
    IsDirectory(String),
}

impl UtilError {
    /// Attach a path to a plain I/O error.
    pub fn at(path: impl Into<String>, source: std::io::Error) -> Self {
        UtilError::At {
            path: path.into(),
            source,
        }
    }
}
