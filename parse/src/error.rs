use thiserror::Error;

/// Errors from lexing, parsing or expanding a command line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A `'` or `"` was opened and never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,
    /// A `$(` or backtick substitution was never closed.
    #[error("unterminated command substitution")]
    UnterminatedSubstitution,
    /// A `${` with no closing `}` or an empty `${}`.
    #[error("bad substitution")]
    BadSubstitution,
    /// An operator showed up where a command was required.
    #[error("syntax error near `{0}`")]
    Unexpected(String),
    /// Input ended where a command was required (e.g. trailing `&&`).
    #[error("missing command")]
    MissingCommand,
    /// A redirection operator with no target word after it.
    #[error("missing redirection target")]
    MissingRedirectTarget,
    /// Command substitution ran, but the command inside it failed to run.
    #[error("command substitution failed: {0}")]
    Substitution(String),
}
