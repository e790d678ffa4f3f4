//! Decoded filesystem events and the raw record codec.

pub mod codec;
pub mod mask;

pub use codec::{DecodeError, HEADER_LEN, RawRecord, decode_batch};
pub use mask::EventMask;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::WatchHandle;

/// One filesystem occurrence, resolved against the registry and delivered
/// to handlers.
#[derive(Debug, Clone)]
pub struct Event {
    /// Watch the event originated from. For queue-overflow events this is
    /// the kernel's sentinel, not a registered handle.
    pub handle: WatchHandle,
    /// What happened, plus any status bits the kernel attached.
    pub mask: EventMask,
    /// Correlation cookie. Non-zero only for a MOVED_FROM/MOVED_TO pair
    /// produced by the same rename.
    pub cookie: u32,
    /// Name of the entry inside the watched directory. `None` when the
    /// event concerns the watched target itself.
    pub name: Option<OsString>,
    /// Watched path joined with `name` when one is present.
    pub path: PathBuf,
}

impl Event {
    /// Resolve a raw record against the path it was watching.
    pub(crate) fn resolve(
        handle: WatchHandle,
        mask: EventMask,
        cookie: u32,
        name: Option<OsString>,
        watched: &Path,
    ) -> Self {
        let path = match &name {
            Some(n) => watched.join(n),
            None => watched.to_path_buf(),
        };
        Self {
            handle,
            mask,
            cookie,
            name,
            path,
        }
    }

    /// Event for a kernel queue overflow. There is no watch and no path to
    /// resolve against.
    pub(crate) fn overflow(record: &RawRecord) -> Self {
        Self {
            handle: WatchHandle::from_raw(record.wd),
            mask: EventMask::from_raw(record.mask),
            cookie: record.cookie,
            name: None,
            path: PathBuf::new(),
        }
    }

    /// True if the subject of the event is a directory.
    pub fn is_dir(&self) -> bool {
        self.mask.contains(EventMask::ISDIR)
    }

    /// True if the filesystem holding the watched target was unmounted.
    pub fn unmounted(&self) -> bool {
        self.mask.contains(EventMask::UNMOUNT)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} wd={} cookie={} {}",
            self.mask,
            self.handle,
            self.cookie,
            self.path.display()
        )
    }
}
