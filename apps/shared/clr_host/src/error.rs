use thiserror::Error;

use crate::entry_points::EntryPoint;
use crate::resource::ResourceState;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Entry point '{0}' is not resolved")]
    Unresolved(EntryPoint),

    #[error("Cannot {operation} a resource in state {state:?}")]
    InvalidTransition {
        state: ResourceState,
        operation: &'static str,
    },

    #[error("Invoker rejected: resource is not started")]
    InvokerRejected,

    #[error("Entry point '{entry_point}' failed: {message}")]
    Callback {
        entry_point: EntryPoint,
        message: String,
    },

    #[error("Marshalling error: {0}")]
    Marshal(String),

    #[error("Resource '{0}' lock is poisoned")]
    Poisoned(String),

    #[error("Resource '{0}' already exists")]
    DuplicateResource(String),

    #[error("Resource name '{0}' must be a relative path inside the resources directory")]
    InvalidResourceName(String),

    #[error("Resource '{0}' not found")]
    UnknownResource(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type returned by callables resolved from an execution context
///
/// The error is the message reported by the embedded side.
pub type CallResult = std::result::Result<(), String>;
