//! Event acquisition and dispatch.
//!
//! # Architecture
//!
//! ```text
//! Notifier
//!   - single EventChannel (one inotify descriptor)
//!   - WatchRegistry: handle -> Registration (path, mask, handlers)
//!   - dedicated dispatch thread: read -> decode -> route
//!         |
//!    +---------+---------+
//!    |         |         |
//! handlers  fallback  overflow
//! ```
//!
//! The loop reads a batch, decodes it with [`crate::event::decode_batch`],
//! looks each record up in the registry, and invokes the matching handlers.
//! Kernel-driven watch removal (IGNORED, UNMOUNT) is consumed inside the
//! dispatch path: the final event is delivered, then the entry is dropped
//! without any caller involvement.

mod engine;
mod error;
mod handler;
mod registry;

pub use engine::{LifecycleState, Notifier, NotifierBuilder, StopReason};
pub use error::{HandlerError, WatchError};
pub use handler::{EventHandler, FnHandler};
pub use registry::{Registration, WatchRegistry};
