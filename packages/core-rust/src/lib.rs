//! Gatekeeper core: operation contract, domain error codes, and status translation.

pub mod code;
pub mod context;
pub mod error;
pub mod execute;
pub mod status;
pub mod traits;

pub use code::{DeclaredStatus, DomainCode};
pub use context::ApiClient;
pub use error::{ExecutionError, OperationError, OperationResult, DEFAULT_ERROR_MESSAGE};
pub use execute::run_cancellable;
pub use status::{StatusMapping, StatusTranslator, TranslatedStatus};
pub use traits::{
    AsyncInputOperation, AsyncInputResultOperation, AsyncOperation, AsyncResultOperation,
    InputOperation, InputResultOperation, Operation, OperationSink, ResultOperation, SinkClosed,
    StreamingOperation,
};
