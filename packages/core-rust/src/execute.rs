//! Cancellation-aware execution of suspendable operations.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::code::DomainCode;
use crate::error::{ExecutionError, OperationResult};

/// Drives `operation` to completion unless `cancel` fires first.
///
/// Cancellation is checked before the operation is polled, so a request that
/// was cancelled while queued never starts its operation.
///
/// # Errors
///
/// [`ExecutionError::Operation`] for the operation's own error,
/// [`ExecutionError::Cancelled`] when the token fired before it finished.
pub async fn run_cancellable<T, C, F>(
    cancel: &CancellationToken,
    operation: F,
) -> Result<T, ExecutionError<C>>
where
    C: DomainCode,
    F: Future<Output = OperationResult<T, C>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::trace!("cancelled before the operation completed");
            Err(ExecutionError::Cancelled)
        }
        result = operation => result.map_err(ExecutionError::Operation),
    }
}
