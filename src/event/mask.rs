//! Bitmask vocabulary for filesystem events and watch options.
//!
//! Bit positions match the kernel's inotify constants exactly, so masks
//! pass through to `inotify_add_watch` and back from event records without
//! translation. Request-time options (ONLYDIR, ONESHOT, ...) and
//! kernel-reported status bits (IGNORED, Q_OVERFLOW, UNMOUNT) live in the
//! same vocabulary.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Set of event flags, combined with `|` when requesting a watch and
    /// tested with `contains`/`intersects` against reported events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        /// File was read.
        const ACCESS = 0x0000_0001;
        /// File content was modified.
        const MODIFY = 0x0000_0002;
        /// Metadata (permissions, timestamps, ownership) changed.
        const ATTRIB = 0x0000_0004;
        /// File opened for writing was closed.
        const CLOSE_WRITE = 0x0000_0008;
        /// File opened read-only was closed.
        const CLOSE_NOWRITE = 0x0000_0010;
        /// File was opened.
        const OPEN = 0x0000_0020;
        /// Entry was moved out of a watched directory.
        const MOVED_FROM = 0x0000_0040;
        /// Entry was moved into a watched directory.
        const MOVED_TO = 0x0000_0080;
        /// Entry was created in a watched directory.
        const CREATE = 0x0000_0100;
        /// Entry was deleted from a watched directory.
        const DELETE = 0x0000_0200;
        /// The watched target itself was deleted.
        const DELETE_SELF = 0x0000_0400;
        /// The watched target itself was moved.
        const MOVE_SELF = 0x0000_0800;

        /// Filesystem containing the watched target was unmounted.
        const UNMOUNT = 0x0000_2000;
        /// The kernel event queue overflowed and events were dropped.
        const QUEUE_OVERFLOW = 0x0000_4000;
        /// The kernel removed the watch (explicitly or on its own).
        const IGNORED = 0x0000_8000;

        /// Only establish the watch if the path is a directory.
        const ONLYDIR = 0x0100_0000;
        /// Do not dereference the path if it is a symlink.
        const DONT_FOLLOW = 0x0200_0000;
        /// Stop generating events for children after they are unlinked.
        const EXCL_UNLINK = 0x0400_0000;
        /// Only establish the watch if one does not already exist.
        const MASK_CREATE = 0x1000_0000;
        /// Merge with the mask of an existing watch instead of replacing it.
        const MASK_ADD = 0x2000_0000;
        /// The subject of the event is a directory.
        const ISDIR = 0x4000_0000;
        /// Remove the watch after the first event.
        const ONESHOT = 0x8000_0000;

        /// File was closed, either variant.
        const CLOSE = Self::CLOSE_WRITE.bits() | Self::CLOSE_NOWRITE.bits();
        /// Entry was moved, either direction.
        const MOVE = Self::MOVED_FROM.bits() | Self::MOVED_TO.bits();
        /// Every requestable filesystem event.
        const ALL_EVENTS = 0x0000_0fff;
    }
}

impl EventMask {
    /// Build a mask from a raw kernel value, keeping bits outside the
    /// named vocabulary. The kernel is free to report flags we did not
    /// request and they must survive the trip to handlers.
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.bits())
    }
}
