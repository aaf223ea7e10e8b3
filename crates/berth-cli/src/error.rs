//! CLI error types.

use thiserror::Error;

/// Errors reported by a berth invocation.
///
/// Every variant is terminal for the invocation: nothing here is retried.
#[derive(Debug, Error)]
pub enum CliError {
    /// Session could not be opened or authenticated.
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend refused the command in its submission ack.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// Session failed after the command was accepted.
    #[error("transport error: {0}; the command may or may not have been applied (outcome unknown)")]
    Transport(String),

    /// Backend reported `status: Failure`.
    #[error("operation failed: {0}")]
    OperationFailure(String),

    /// Deadline expired after the command may have reached the backend.
    #[error("timed out {0}; the command may or may not have been applied (outcome unknown)")]
    Timeout(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource document could not be loaded.
    #[error("payload error: {0}")]
    Payload(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::OperationFailure(_) => 1,
            Self::Config(_) | Self::InvalidArgument(_) | Self::Payload(_) => 2,
            Self::Connection(_) => 3,
            Self::SubmissionRejected(_) => 4,
            Self::Transport(_) => 5,
            Self::Timeout(_) => 6,
            Self::Format(_) | Self::Io(_) => 1,
        }
    }

    /// Whether the backend may have applied the command without the client
    /// learning the outcome.
    #[must_use]
    pub const fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}
