//! Operation executor for the HTTP surface.
//!
//! Runs one of the eight operation shapes and turns the result into an
//! [`HttpOutcome`]: empty 200, `{"data": …}` 200, or the translated status.

use std::sync::Arc;

use axum::http::StatusCode;
use gatekeeper_core::{
    run_cancellable, AsyncInputOperation, AsyncInputResultOperation, AsyncOperation,
    AsyncResultOperation, DeclaredStatus, DomainCode, ExecutionError, InputOperation,
    InputResultOperation, Operation, OperationError, OperationResult, ResultOperation,
    StatusMapping, StatusTranslator,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::response::{client_closed_request, HttpOutcome};
use crate::error::GatewayError;

/// Status used for errors without a code or without a declared mapping.
pub const DEFAULT_HTTP_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// Executes operations of domain `C` and shapes HTTP outcomes.
///
/// Cheap to clone; the status table is shared.
#[derive(Debug)]
pub struct HttpOperationExecutor<C> {
    translator: Arc<StatusTranslator<C, StatusCode>>,
}

impl<C> Clone for HttpOperationExecutor<C> {
    fn clone(&self) -> Self {
        Self {
            translator: Arc::clone(&self.translator),
        }
    }
}

impl<C: DomainCode> HttpOperationExecutor<C> {
    #[must_use]
    pub fn new(translator: StatusTranslator<C, StatusCode>) -> Self {
        Self {
            translator: Arc::new(translator),
        }
    }

    /// Executor over the declared statuses of `C`, with `overrides` applied.
    #[must_use]
    pub fn declared(overrides: impl IntoIterator<Item = (C, StatusCode)>) -> Self
    where
        C: DeclaredStatus<StatusCode>,
    {
        let mapping = StatusMapping::declared().with_overrides(overrides);
        Self::new(StatusTranslator::new(mapping, DEFAULT_HTTP_STATUS))
    }

    #[must_use]
    pub fn translator(&self) -> &StatusTranslator<C, StatusCode> {
        &self.translator
    }

    // -- immediate ----------------------------------------------------------

    pub fn execute<Op>(&self, operation: &Op) -> HttpOutcome<()>
    where
        Op: Operation<Code = C> + ?Sized,
    {
        self.empty(operation.execute())
    }

    pub fn execute_input<I, Op>(&self, operation: &Op, input: I) -> HttpOutcome<()>
    where
        Op: InputOperation<I, Code = C> + ?Sized,
    {
        self.empty(operation.execute(input))
    }

    pub fn execute_result<O, Op>(&self, operation: &Op) -> HttpOutcome<O>
    where
        Op: ResultOperation<O, Code = C> + ?Sized,
    {
        self.payload(operation.execute())
    }

    pub fn execute_input_result<I, O, Op>(&self, operation: &Op, input: I) -> HttpOutcome<O>
    where
        Op: InputResultOperation<I, O, Code = C> + ?Sized,
    {
        self.payload(operation.execute(input))
    }

    // -- suspendable --------------------------------------------------------

    pub async fn execute_async<Op>(&self, operation: &Op, cancel: &CancellationToken) -> HttpOutcome<()>
    where
        Op: AsyncOperation<Code = C> + ?Sized,
    {
        let result = run_cancellable(cancel, operation.execute(cancel)).await;
        self.finish(result, |()| HttpOutcome::Empty)
    }

    pub async fn execute_input_async<I, Op>(
        &self,
        operation: &Op,
        input: I,
        cancel: &CancellationToken,
    ) -> HttpOutcome<()>
    where
        I: Send + 'static,
        Op: AsyncInputOperation<I, Code = C> + ?Sized,
    {
        let result = run_cancellable(cancel, operation.execute(input, cancel)).await;
        self.finish(result, |()| HttpOutcome::Empty)
    }

    pub async fn execute_result_async<O, Op>(
        &self,
        operation: &Op,
        cancel: &CancellationToken,
    ) -> HttpOutcome<O>
    where
        O: Send + 'static,
        Op: AsyncResultOperation<O, Code = C> + ?Sized,
    {
        let result = run_cancellable(cancel, operation.execute(cancel)).await;
        self.finish(result, HttpOutcome::Payload)
    }

    pub async fn execute_input_result_async<I, O, Op>(
        &self,
        operation: &Op,
        input: I,
        cancel: &CancellationToken,
    ) -> HttpOutcome<O>
    where
        I: Send + 'static,
        O: Send + 'static,
        Op: AsyncInputResultOperation<I, O, Code = C> + ?Sized,
    {
        let result = run_cancellable(cancel, operation.execute(input, cancel)).await;
        self.finish(result, HttpOutcome::Payload)
    }

    // -- shaping ------------------------------------------------------------

    fn empty(&self, result: OperationResult<(), C>) -> HttpOutcome<()> {
        match result {
            Ok(()) => HttpOutcome::Empty,
            Err(err) => self.failure(&err),
        }
    }

    fn payload<O>(&self, result: OperationResult<O, C>) -> HttpOutcome<O> {
        match result {
            Ok(data) => HttpOutcome::Payload(data),
            Err(err) => self.failure(&err),
        }
    }

    fn finish<T, O>(
        &self,
        result: Result<T, ExecutionError<C>>,
        success: impl FnOnce(T) -> HttpOutcome<O>,
    ) -> HttpOutcome<O> {
        match result {
            Ok(value) => success(value),
            Err(ExecutionError::Operation(err)) => self.failure(&err),
            Err(ExecutionError::Cancelled) => {
                debug!("operation cancelled before completion");
                HttpOutcome::Status {
                    status: client_closed_request(),
                    message: GatewayError::Cancelled.to_string(),
                }
            }
        }
    }

    fn failure<O>(&self, err: &OperationError<C>) -> HttpOutcome<O> {
        let translated = self.translator.translate(err);
        debug!(
            code = ?err.code,
            status = translated.status.as_u16(),
            "operation returned an error"
        );
        HttpOutcome::Status {
            status: translated.status,
            message: translated.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::test_support::TestCode;

    fn executor() -> HttpOperationExecutor<TestCode> {
        HttpOperationExecutor::declared([])
    }

    struct Ping;

    impl Operation for Ping {
        type Code = TestCode;

        fn execute(&self) -> OperationResult<(), TestCode> {
            Ok(())
        }
    }

    struct Rename;

    impl InputOperation<String> for Rename {
        type Code = TestCode;

        fn execute(&self, input: String) -> OperationResult<(), TestCode> {
            if input == "taken" {
                Err(OperationError::new(TestCode::NameTaken, "Name 'taken' is already in use"))
            } else {
                Ok(())
            }
        }
    }

    struct CountUsers;

    impl ResultOperation<u32> for CountUsers {
        type Code = TestCode;

        fn execute(&self) -> OperationResult<u32, TestCode> {
            Ok(3)
        }
    }

    struct FindUser;

    impl InputResultOperation<u64, String> for FindUser {
        type Code = TestCode;

        fn execute(&self, input: u64) -> OperationResult<String, TestCode> {
            match input {
                1 => Ok("alice".to_owned()),
                2 => Err(OperationError::from_code(TestCode::Undeclared)),
                3 => Err(OperationError {
                    code: None,
                    message: None,
                }),
                _ => Err(OperationError::from_code(TestCode::UserNotFound)),
            }
        }
    }

    struct SlowLookup;

    #[async_trait]
    impl AsyncInputResultOperation<u64, String> for SlowLookup {
        type Code = TestCode;

        async fn execute(
            &self,
            input: u64,
            _cancel: &CancellationToken,
        ) -> OperationResult<String, TestCode> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(input.to_string())
        }
    }

    struct Touch;

    #[async_trait]
    impl AsyncOperation for Touch {
        type Code = TestCode;

        async fn execute(&self, _cancel: &CancellationToken) -> OperationResult<(), TestCode> {
            Err(OperationError::message("touch failed"))
        }
    }

    #[test]
    fn no_output_success_is_empty() {
        assert_eq!(executor().execute(&Ping), HttpOutcome::Empty);
        assert_eq!(executor().execute_input(&Rename, "free".to_owned()), HttpOutcome::Empty);
    }

    #[test]
    fn output_success_is_payload() {
        assert_eq!(executor().execute_result(&CountUsers), HttpOutcome::Payload(3));
        assert_eq!(
            executor().execute_input_result(&FindUser, 1),
            HttpOutcome::Payload("alice".to_owned())
        );
    }

    #[test]
    fn declared_code_maps_with_message() {
        assert_eq!(
            executor().execute_input(&Rename, "taken".to_owned()),
            HttpOutcome::Status {
                status: StatusCode::CONFLICT,
                message: "Name 'taken' is already in use".to_owned(),
            }
        );
    }

    #[test]
    fn code_without_message_uses_code_name() {
        assert_eq!(
            executor().execute_input_result(&FindUser, 99),
            HttpOutcome::Status {
                status: StatusCode::NOT_FOUND,
                message: "UserNotFound".to_owned(),
            }
        );
    }

    #[test]
    fn undeclared_code_falls_back_to_400() {
        let outcome = executor().execute_input_result(&FindUser, 2);
        assert_eq!(outcome.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn empty_error_uses_placeholder() {
        assert_eq!(
            executor().execute_input_result(&FindUser, 3),
            HttpOutcome::Status {
                status: StatusCode::BAD_REQUEST,
                message: "Internal Error Occurred".to_owned(),
            }
        );
    }

    #[test]
    fn overrides_replace_declared_status() {
        let executor =
            HttpOperationExecutor::declared([(TestCode::UserNotFound, StatusCode::GONE)]);
        assert_eq!(
            executor.execute_input_result(&FindUser, 99).status_code(),
            StatusCode::GONE
        );
    }

    #[tokio::test]
    async fn async_error_is_translated() {
        let cancel = CancellationToken::new();
        assert_eq!(
            executor().execute_async(&Touch, &cancel).await,
            HttpOutcome::Status {
                status: StatusCode::BAD_REQUEST,
                message: "touch failed".to_owned(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_async_operation_is_499() {
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });

        let outcome = executor()
            .execute_input_result_async(&SlowLookup, 7, &cancel)
            .await;

        assert_eq!(outcome.status_code().as_u16(), 499);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_async_operation_is_payload() {
        let cancel = CancellationToken::new();
        let outcome = executor()
            .execute_input_result_async(&SlowLookup, 7, &cancel)
            .await;
        assert_eq!(outcome, HttpOutcome::Payload("7".to_owned()));
    }
}
