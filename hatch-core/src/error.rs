use thiserror::Error;

/// The server declined to establish a server-side prepare context for a statement.
///
/// Drivers return it (wrapped in the crate [`crate::Error`]) from the
/// execute-family operations of a [`crate::ServerPrepared`] statement. It is
/// never used for data, constraint or syntax failures.
#[derive(Debug, Error)]
#[error("The server rejected the prepare of the statement: {reason}")]
pub struct PrepareRejected {
    pub reason: String,
}

impl PrepareRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StatementError {
    #[error("Cannot do {0} on a prepared statement")]
    Unsupported(&'static str),
    #[error("Query execution was interrupted")]
    Interrupted,
    #[error("The statement is closed")]
    Closed,
    #[error("Parameter at position {0} is not set")]
    MissingParameter(u64),
}

/// True when `error`, or any error it wraps as context, is a [`PrepareRejected`].
pub fn is_prepare_rejected(error: &crate::Error) -> bool {
    error.is::<PrepareRejected>()
}
