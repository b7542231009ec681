use std::fmt;

use crate::code::DomainCode;

/// Message used when an operation error carries neither a code nor a message.
pub const DEFAULT_ERROR_MESSAGE: &str = "Internal Error Occurred";

/// Result type returned by every operation variant.
pub type OperationResult<T, C> = Result<T, OperationError<C>>;

/// Domain-level failure returned (never raised) by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError<C> {
    pub code: Option<C>,
    pub message: Option<String>,
}

impl<C: DomainCode> OperationError<C> {
    /// An error with a code and no explicit message.
    #[must_use]
    pub fn from_code(code: C) -> Self {
        Self {
            code: Some(code),
            message: None,
        }
    }

    /// An error with both a code and a message.
    #[must_use]
    pub fn new(code: C, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: Some(message.into()),
        }
    }

    /// An uncoded error; translated to the transport's default status.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
        }
    }

    /// The human-readable description sent to the caller.
    ///
    /// Explicit message first, then the code's name, then
    /// [`DEFAULT_ERROR_MESSAGE`]. Never empty.
    #[must_use]
    pub fn description(&self) -> &str {
        match (&self.message, self.code) {
            (Some(message), _) => message.as_str(),
            (None, Some(code)) => code.name(),
            (None, None) => DEFAULT_ERROR_MESSAGE,
        }
    }
}

impl<C: DomainCode> fmt::Display for OperationError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{}: {}", code.name(), self.description()),
            None => f.write_str(self.description()),
        }
    }
}

impl<C: DomainCode> std::error::Error for OperationError<C> {}

/// Failure of a single execution: either the operation's own domain error or
/// the request being cancelled while the operation was suspended.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError<C: DomainCode> {
    #[error(transparent)]
    Operation(#[from] OperationError<C>),
    #[error("operation cancelled")]
    Cancelled,
}
