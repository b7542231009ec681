//! Operation executor for the RPC surface.
//!
//! Unary shapes return `Result<T, tonic::Status>`. Server-streaming
//! operations run on their own task and feed a response stream; a failure
//! after some items were sent becomes the final item of the stream.

use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use gatekeeper_core::{
    run_cancellable, AsyncInputOperation, AsyncInputResultOperation, AsyncOperation,
    AsyncResultOperation, DeclaredStatus, DomainCode, ExecutionError, InputOperation,
    InputResultOperation, Operation, OperationError, OperationSink, ResultOperation,
    StatusMapping, StatusTranslator, StreamingOperation,
};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::{CancellationToken, DropGuard};
use tonic::{Code, Status};
use tracing::{debug, error};

use crate::error::GatewayError;
use crate::middleware::panic::internal_failure;

/// Code used for errors without a code or without a declared mapping.
pub const DEFAULT_RPC_CODE: Code = Code::InvalidArgument;

/// Response stream handed to tonic for server-streaming methods.
pub type ResponseStream<O> = Pin<Box<dyn Stream<Item = Result<O, Status>> + Send>>;

/// Cancellation token of a tonic call, as attached by the RPC layer stack.
#[must_use]
pub fn call_token<T>(request: &tonic::Request<T>) -> CancellationToken {
    request
        .extensions()
        .get::<CancellationToken>()
        .cloned()
        .unwrap_or_default()
}

/// Executes operations of domain `C` and shapes RPC results.
#[derive(Debug)]
pub struct RpcOperationExecutor<C> {
    translator: Arc<StatusTranslator<C, Code>>,
    stream_buffer: usize,
    verbose_errors: bool,
}

impl<C> Clone for RpcOperationExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            translator: Arc::clone(&self.translator),
            stream_buffer: self.stream_buffer,
            verbose_errors: self.verbose_errors,
        }
    }
}

impl<C: DomainCode> RpcOperationExecutor<C> {
    #[must_use]
    pub fn new(translator: StatusTranslator<C, Code>, stream_buffer: usize) -> Self {
        Self {
            translator: Arc::new(translator),
            stream_buffer,
            verbose_errors: false,
        }
    }

    /// Exposes the panic message of a failed streaming task to callers.
    #[must_use]
    pub fn with_verbose_errors(mut self, verbose: bool) -> Self {
        self.verbose_errors = verbose;
        self
    }

    /// Executor over the declared codes of `C`, with `overrides` applied.
    #[must_use]
    pub fn declared(overrides: impl IntoIterator<Item = (C, Code)>, stream_buffer: usize) -> Self
    where
        C: DeclaredStatus<Code>,
    {
        let mapping = StatusMapping::declared().with_overrides(overrides);
        Self::new(StatusTranslator::new(mapping, DEFAULT_RPC_CODE), stream_buffer)
    }

    #[must_use]
    pub fn translator(&self) -> &StatusTranslator<C, Code> {
        &self.translator
    }

    #[must_use]
    pub fn verbose_errors(&self) -> bool {
        self.verbose_errors
    }

    /// Status for a failed operation.
    #[must_use]
    pub fn status(&self, err: &OperationError<C>) -> Status {
        translate(&self.translator, err)
    }

    // -- immediate ----------------------------------------------------------

    /// # Errors
    ///
    /// The translated status of the operation's error.
    pub fn execute<Op>(&self, operation: &Op) -> Result<(), Status>
    where
        Op: Operation<Code = C> + ?Sized,
    {
        operation.execute().map_err(|err| self.status(&err))
    }

    /// # Errors
    ///
    /// The translated status of the operation's error.
    pub fn execute_input<I, Op>(&self, operation: &Op, input: I) -> Result<(), Status>
    where
        Op: InputOperation<I, Code = C> + ?Sized,
    {
        operation.execute(input).map_err(|err| self.status(&err))
    }

    /// # Errors
    ///
    /// The translated status of the operation's error.
    pub fn execute_result<O, Op>(&self, operation: &Op) -> Result<O, Status>
    where
        Op: ResultOperation<O, Code = C> + ?Sized,
    {
        operation.execute().map_err(|err| self.status(&err))
    }

    /// # Errors
    ///
    /// The translated status of the operation's error.
    pub fn execute_input_result<I, O, Op>(&self, operation: &Op, input: I) -> Result<O, Status>
    where
        Op: InputResultOperation<I, O, Code = C> + ?Sized,
    {
        operation.execute(input).map_err(|err| self.status(&err))
    }

    // -- suspendable --------------------------------------------------------

    /// # Errors
    ///
    /// The translated status, or `Cancelled` when `cancel` fired first.
    pub async fn execute_async<Op>(&self, operation: &Op, cancel: &CancellationToken) -> Result<(), Status>
    where
        Op: AsyncOperation<Code = C> + ?Sized,
    {
        run_cancellable(cancel, operation.execute(cancel))
            .await
            .map_err(|err| self.execution_status(err))
    }

    /// # Errors
    ///
    /// The translated status, or `Cancelled` when `cancel` fired first.
    pub async fn execute_input_async<I, Op>(
        &self,
        operation: &Op,
        input: I,
        cancel: &CancellationToken,
    ) -> Result<(), Status>
    where
        I: Send + 'static,
        Op: AsyncInputOperation<I, Code = C> + ?Sized,
    {
        run_cancellable(cancel, operation.execute(input, cancel))
            .await
            .map_err(|err| self.execution_status(err))
    }

    /// # Errors
    ///
    /// The translated status, or `Cancelled` when `cancel` fired first.
    pub async fn execute_result_async<O, Op>(
        &self,
        operation: &Op,
        cancel: &CancellationToken,
    ) -> Result<O, Status>
    where
        O: Send + 'static,
        Op: AsyncResultOperation<O, Code = C> + ?Sized,
    {
        run_cancellable(cancel, operation.execute(cancel))
            .await
            .map_err(|err| self.execution_status(err))
    }

    /// # Errors
    ///
    /// The translated status, or `Cancelled` when `cancel` fired first.
    pub async fn execute_input_result_async<I, O, Op>(
        &self,
        operation: &Op,
        input: I,
        cancel: &CancellationToken,
    ) -> Result<O, Status>
    where
        I: Send + 'static,
        O: Send + 'static,
        Op: AsyncInputResultOperation<I, O, Code = C> + ?Sized,
    {
        run_cancellable(cancel, operation.execute(input, cancel))
            .await
            .map_err(|err| self.execution_status(err))
    }

    // -- streaming ----------------------------------------------------------

    /// Runs a server-streaming operation on its own task.
    ///
    /// Items are yielded in the order the operation sends them. When the
    /// operation fails, or `cancel` fires, the stream ends with the
    /// corresponding status. Dropping the stream cancels the operation.
    pub fn execute_streaming<I, O, Op>(
        &self,
        operation: Arc<Op>,
        input: I,
        cancel: &CancellationToken,
    ) -> ResponseStream<O>
    where
        I: Send + 'static,
        O: Send + 'static,
        Op: StreamingOperation<I, O, Code = C> + ?Sized + 'static,
    {
        let (sink, items) = OperationSink::channel(self.stream_buffer);
        let token = cancel.child_token();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            run_cancellable(&task_token, operation.execute(input, sink, &task_token)).await
        });

        let state = StreamState::Items {
            items,
            task,
            translator: Arc::clone(&self.translator),
            verbose_errors: self.verbose_errors,
            _cancel_on_drop: token.drop_guard(),
        };
        Box::pin(stream::unfold(state, next_item))
    }

    fn execution_status(&self, err: ExecutionError<C>) -> Status {
        match err {
            ExecutionError::Operation(err) => self.status(&err),
            ExecutionError::Cancelled => cancelled_status(),
        }
    }
}

fn translate<C: DomainCode>(translator: &StatusTranslator<C, Code>, err: &OperationError<C>) -> Status {
    let translated = translator.translate(err);
    debug!(code = ?err.code, status = ?translated.status, "operation returned an error");
    Status::new(translated.status, translated.message)
}

fn cancelled_status() -> Status {
    GatewayError::Cancelled.to_rpc_status()
}

// ---------------------------------------------------------------------------
// Streaming consumer
// ---------------------------------------------------------------------------

enum StreamState<O, C: DomainCode> {
    Items {
        items: mpsc::Receiver<O>,
        task: JoinHandle<Result<(), ExecutionError<C>>>,
        translator: Arc<StatusTranslator<C, Code>>,
        verbose_errors: bool,
        _cancel_on_drop: DropGuard,
    },
    Done,
}

async fn next_item<O, C: DomainCode>(
    state: StreamState<O, C>,
) -> Option<(Result<O, Status>, StreamState<O, C>)> {
    let StreamState::Items {
        mut items,
        task,
        translator,
        verbose_errors,
        _cancel_on_drop,
    } = state
    else {
        return None;
    };

    if let Some(item) = items.recv().await {
        let state = StreamState::Items {
            items,
            task,
            translator,
            verbose_errors,
            _cancel_on_drop,
        };
        return Some((Ok(item), state));
    }

    // The sink is gone, so the operation has returned.
    let status = match task.await {
        Ok(Ok(())) => return None,
        Ok(Err(ExecutionError::Operation(err))) => translate(&translator, &err),
        Ok(Err(ExecutionError::Cancelled)) => cancelled_status(),
        Err(join) => task_failure(join, verbose_errors),
    };
    Some((Err(status), StreamState::Done))
}

fn task_failure(join: JoinError, verbose: bool) -> Status {
    match join.try_into_panic() {
        Ok(payload) => internal_failure(&*payload, verbose).to_rpc_status(),
        Err(join) => {
            error!(error = %join, "streaming operation task failed");
            GatewayError::InternalFailure {
                detail: verbose.then(|| join.to_string()),
            }
            .to_rpc_status()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
