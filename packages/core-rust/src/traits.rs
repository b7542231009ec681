use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::code::DomainCode;
use crate::error::OperationResult;

// ---------------------------------------------------------------------------
// Immediate operations
// ---------------------------------------------------------------------------

/// Operation without input or output.
pub trait Operation {
    type Code: DomainCode;

    fn execute(&self) -> OperationResult<(), Self::Code>;
}

/// Operation consuming an input and producing no output.
pub trait InputOperation<I> {
    type Code: DomainCode;

    fn execute(&self, input: I) -> OperationResult<(), Self::Code>;
}

/// Operation producing an output without input.
pub trait ResultOperation<O> {
    type Code: DomainCode;

    fn execute(&self) -> OperationResult<O, Self::Code>;
}

/// Operation mapping an input to an output.
pub trait InputResultOperation<I, O> {
    type Code: DomainCode;

    fn execute(&self, input: I) -> OperationResult<O, Self::Code>;
}

// ---------------------------------------------------------------------------
// Suspendable operations
// ---------------------------------------------------------------------------

/// Suspendable operation without input or output.
///
/// Implementations should pass `cancel` to every downstream call that may
/// suspend; the executor also races the whole call against it.
#[async_trait]
pub trait AsyncOperation: Send + Sync {
    type Code: DomainCode;

    async fn execute(&self, cancel: &CancellationToken) -> OperationResult<(), Self::Code>;
}

/// Suspendable operation consuming an input.
#[async_trait]
pub trait AsyncInputOperation<I: Send + 'static>: Send + Sync {
    type Code: DomainCode;

    async fn execute(&self, input: I, cancel: &CancellationToken)
        -> OperationResult<(), Self::Code>;
}

/// Suspendable operation producing an output.
#[async_trait]
pub trait AsyncResultOperation<O: Send + 'static>: Send + Sync {
    type Code: DomainCode;

    async fn execute(&self, cancel: &CancellationToken) -> OperationResult<O, Self::Code>;
}

/// Suspendable operation mapping an input to an output.
#[async_trait]
pub trait AsyncInputResultOperation<I: Send + 'static, O: Send + 'static>: Send + Sync {
    type Code: DomainCode;

    async fn execute(&self, input: I, cancel: &CancellationToken)
        -> OperationResult<O, Self::Code>;
}

// ---------------------------------------------------------------------------
// Streaming operations
// ---------------------------------------------------------------------------

/// Producer side of a streamed response.
///
/// Dropping the sink (by returning from the operation) ends the stream.
#[derive(Debug)]
pub struct OperationSink<T> {
    tx: mpsc::Sender<T>,
}

/// Returned by [`OperationSink::send`] once the consumer went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("stream consumer disconnected")]
pub struct SinkClosed;

impl<T: Send> OperationSink<T> {
    /// Creates a sink and its consumer with room for `buffer` pending items.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// Sends one item, waiting for buffer space.
    ///
    /// # Errors
    ///
    /// Returns [`SinkClosed`] when the consumer was dropped; the operation
    /// should stop producing.
    pub async fn send(&self, item: T) -> Result<(), SinkClosed> {
        self.tx.send(item).await.map_err(|_| SinkClosed)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Suspendable operation streaming several outputs for one input.
#[async_trait]
pub trait StreamingOperation<I: Send + 'static, O: Send + 'static>: Send + Sync {
    type Code: DomainCode;

    async fn execute(
        &self,
        input: I,
        sink: OperationSink<O>,
        cancel: &CancellationToken,
    ) -> OperationResult<(), Self::Code>;
}
