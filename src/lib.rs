//! Linux inotify event acquisition and callback dispatch.
//!
//! One [`Notifier`] owns a single kernel notification channel. Callers
//! register watches on paths with an [`EventMask`] and any number of
//! [`EventHandler`]s; a dedicated dispatch thread decodes the kernel's
//! raw event records and routes each [`Event`] to the handlers registered
//! for its watch handle. Kernel-driven watch removal (IGNORED, UNMOUNT)
//! is consumed by the same loop and reflected in the registry without any
//! caller action.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vigil::{EventMask, FnHandler, Notifier};
//!
//! # fn main() -> Result<(), vigil::WatchError> {
//! let notifier = Notifier::new()?;
//! notifier.add_watch(
//!     "/tmp/x".as_ref(),
//!     EventMask::CREATE | EventMask::MODIFY,
//!     vec![Arc::new(FnHandler::new("print", |event| {
//!         println!("{event}");
//!         Ok(())
//!     }))],
//! )?;
//! notifier.start()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod event;
pub mod logging;
pub mod notifier;
pub mod types;

#[cfg(target_os = "linux")]
pub use backend::InotifyBackend;
pub use backend::{ChannelError, EventChannel, WatchSource};
pub use config::Settings;
pub use event::{DecodeError, Event, EventMask, RawRecord, decode_batch};
pub use notifier::{
    EventHandler, FnHandler, HandlerError, LifecycleState, Notifier, NotifierBuilder, Registration,
    StopReason, WatchError, WatchRegistry,
};
pub use types::{OVERFLOW_SENTINEL, WatchHandle};
