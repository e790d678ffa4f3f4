//! Collaborator interfaces for the kernel watch mechanism.
//!
//! The dispatch engine consumes two capabilities: a [`WatchSource`] that can
//! establish and drop watches, and an [`EventChannel`] that yields batches
//! of raw event records. On Linux both are implemented over a single
//! inotify descriptor by [`InotifyBackend`]; tests substitute an in-memory
//! pair.

#[cfg(target_os = "linux")]
pub mod inotify;

#[cfg(target_os = "linux")]
pub use inotify::InotifyBackend;

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::event::EventMask;
use crate::notifier::WatchError;
use crate::types::WatchHandle;

/// Failures of the event channel itself.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The channel could not be opened. Fatal to construction, not retried.
    #[error("failed to open event channel")]
    Init {
        #[source]
        source: io::Error,
    },

    /// The channel is closed. Expected during shutdown; terminal otherwise.
    #[error("event channel closed")]
    Closed,

    /// A read failed for a reason other than closure.
    #[error("event channel read failed")]
    Io {
        #[source]
        source: io::Error,
    },
}

/// Establishes and drops kernel watches.
pub trait WatchSource: Send + Sync {
    /// Start watching `path` for the events in `mask`.
    ///
    /// Re-registering a path the source already watches follows the
    /// underlying primitive's contract (inotify returns the existing
    /// descriptor and replaces or, with MASK_ADD, merges the mask).
    fn add_watch(&self, path: &Path, mask: EventMask) -> Result<WatchHandle, WatchError>;

    /// Stop watching. Fails with [`WatchError::UnknownHandle`] if the
    /// kernel no longer knows the descriptor.
    fn remove_watch(&self, handle: WatchHandle) -> Result<(), WatchError>;
}

/// Blocking source of raw event batches.
///
/// The kernel guarantees reads end on record boundaries: a batch holds
/// zero or more whole records, never a partial one.
pub trait EventChannel: Send + Sync {
    /// Block until a batch is available and copy it into `buf`, returning
    /// the number of bytes written. Returns [`ChannelError::Closed`] once
    /// the channel has been interrupted or closed.
    fn read_batch(&self, buf: &mut [u8]) -> Result<usize, ChannelError>;

    /// Wake a reader blocked in [`read_batch`](Self::read_batch). After an
    /// interrupt, pending and future reads fail with `Closed`.
    fn interrupt(&self);

    /// Release the channel. Idempotent.
    fn close(&self);
}
