//! Error types for watch registration and dispatch.

use std::path::PathBuf;

use thiserror::Error;

use crate::backend::ChannelError;
use crate::types::WatchHandle;

use super::engine::LifecycleState;

/// Errors returned to callers of the registry and lifecycle APIs. Nothing
/// in here ever escapes from inside the dispatch loop itself.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("cannot watch {0}: path not found")]
    PathNotFound(PathBuf),

    #[error("cannot watch {0}: permission denied")]
    PermissionDenied(PathBuf),

    #[error("watch limit reached")]
    ResourceLimit,

    #[error("no watch registered for handle {0}")]
    UnknownHandle(WatchHandle),

    #[error("handler is not registered on handle {0}")]
    HandlerNotRegistered(WatchHandle),

    #[error("operation not allowed while notifier is {state:?}")]
    Lifecycle { state: LifecycleState },

    #[error("event channel failure")]
    Channel(#[from] ChannelError),
}

/// Failure raised by a single handler invocation.
///
/// Caught by the engine, logged, and never propagated: one failing handler
/// must not starve its siblings or later events.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}
