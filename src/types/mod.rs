//! Core identifier types shared across the crate.

use std::fmt;

/// Watch descriptor the kernel reports for queue-overflow records.
///
/// Overflow is not tied to any real watch, so the descriptor field of an
/// overflow record carries this sentinel instead of a registered handle.
pub const OVERFLOW_SENTINEL: i32 = -1;

/// Handle for an active watch.
///
/// Wraps the kernel's watch descriptor. The numeric value is opaque to
/// callers and only valid while the watch is registered; the kernel may
/// reuse it after the watch is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchHandle(i32);

impl WatchHandle {
    /// Wrap a raw kernel watch descriptor.
    pub fn from_raw(wd: i32) -> Self {
        Self(wd)
    }

    /// The underlying kernel watch descriptor.
    pub fn as_raw(self) -> i32 {
        self.0
    }

    /// True if this is the kernel's overflow sentinel, not a real watch.
    pub fn is_overflow_sentinel(self) -> bool {
        self.0 == OVERFLOW_SENTINEL
    }
}

impl fmt::Display for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
