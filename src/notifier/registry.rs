//! Registry mapping watch handles to registrations.
//!
//! Entries are immutable snapshots behind `Arc`: mutation builds a new
//! [`Registration`] and swaps the pointer, so the dispatch loop and caller
//! threads never observe an entry mid-update, and a reader holding a
//! snapshot is unaffected by concurrent changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::backend::WatchSource;
use crate::event::EventMask;
use crate::types::WatchHandle;

use super::error::WatchError;
use super::handler::EventHandler;

/// Immutable record of one active watch.
pub struct Registration {
    handle: WatchHandle,
    path: PathBuf,
    mask: EventMask,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl Registration {
    pub fn handle(&self) -> WatchHandle {
        self.handle
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mask(&self) -> EventMask {
        self.mask
    }

    /// Handlers in registration order.
    pub fn handlers(&self) -> &[Arc<dyn EventHandler>] {
        &self.handlers
    }
}

/// Thread-safe watch-handle registry.
///
/// Watch creation and removal are delegated to the [`WatchSource`]
/// collaborator; the registry never deduplicates by path, mirroring
/// whatever re-registration semantics the source provides.
pub struct WatchRegistry {
    source: Arc<dyn WatchSource>,
    entries: DashMap<WatchHandle, Arc<Registration>>,
}

impl WatchRegistry {
    pub fn new(source: Arc<dyn WatchSource>) -> Self {
        Self {
            source,
            entries: DashMap::new(),
        }
    }

    /// Establish a watch on `path` and record it with `handlers`.
    ///
    /// If the source hands back a handle that is already registered (the
    /// inotify contract for re-registering a watched path), the entry is
    /// refreshed in place: path and mask take the new values and the new
    /// handlers are appended after the existing ones. A mask carrying
    /// [`EventMask::MASK_ADD`] is unioned with the stored mask instead,
    /// matching what the kernel keeps for the watch.
    pub fn register(
        &self,
        path: &Path,
        mask: EventMask,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> Result<WatchHandle, WatchError> {
        let handle = self.source.add_watch(path, mask)?;

        match self.entries.entry(handle) {
            Entry::Occupied(mut occupied) => {
                let current = occupied.get();
                let mask = if mask.contains(EventMask::MASK_ADD) {
                    current.mask | mask
                } else {
                    mask
                };
                let mut merged: Vec<Arc<dyn EventHandler>> =
                    current.handlers.iter().map(Arc::clone).collect();
                merged.extend(handlers);
                occupied.insert(Arc::new(Registration {
                    handle,
                    path: path.to_path_buf(),
                    mask,
                    handlers: merged,
                }));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Registration {
                    handle,
                    path: path.to_path_buf(),
                    mask,
                    handlers,
                }));
            }
        }

        Ok(handle)
    }

    /// Drop the registration and tell the source to stop the watch.
    pub fn unregister(&self, handle: WatchHandle) -> Result<(), WatchError> {
        self.entries
            .remove(&handle)
            .ok_or(WatchError::UnknownHandle(handle))?;

        // The kernel may have dropped the watch on its own (oneshot,
        // unmount) between the event and this call; the entry is gone
        // either way, so that race is not an error.
        if let Err(err) = self.source.remove_watch(handle) {
            tracing::debug!("[registry] source already dropped {handle}: {err}");
        }
        Ok(())
    }

    /// Remove the map entry without touching the source. Used when the
    /// kernel reports it already removed the watch (IGNORED, UNMOUNT).
    pub fn forget(&self, handle: WatchHandle) -> bool {
        self.entries.remove(&handle).is_some()
    }

    /// Append a handler to an existing registration.
    pub fn add_handler(
        &self,
        handle: WatchHandle,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), WatchError> {
        let mut entry = self
            .entries
            .get_mut(&handle)
            .ok_or(WatchError::UnknownHandle(handle))?;

        let current = entry.value();
        let mut handlers: Vec<Arc<dyn EventHandler>> =
            current.handlers.iter().map(Arc::clone).collect();
        handlers.push(handler);

        let next = Arc::new(Registration {
            handle,
            path: current.path.clone(),
            mask: current.mask,
            handlers,
        });
        *entry.value_mut() = next;
        Ok(())
    }

    /// Remove a handler (matched by `Arc` identity) from a registration.
    pub fn remove_handler(
        &self,
        handle: WatchHandle,
        handler: &Arc<dyn EventHandler>,
    ) -> Result<(), WatchError> {
        let mut entry = self
            .entries
            .get_mut(&handle)
            .ok_or(WatchError::UnknownHandle(handle))?;

        let current = entry.value();
        let before = current.handlers.len();
        let handlers: Vec<Arc<dyn EventHandler>> = current
            .handlers
            .iter()
            .filter(|h| !Arc::ptr_eq(h, handler))
            .map(Arc::clone)
            .collect();

        if handlers.len() == before {
            return Err(WatchError::HandlerNotRegistered(handle));
        }

        let next = Arc::new(Registration {
            handle,
            path: current.path.clone(),
            mask: current.mask,
            handlers,
        });
        *entry.value_mut() = next;
        Ok(())
    }

    /// Snapshot of the registration for `handle`, if present.
    pub fn lookup(&self, handle: WatchHandle) -> Option<Arc<Registration>> {
        self.entries.get(&handle).map(|e| Arc::clone(e.value()))
    }

    /// Snapshot of all registered handles, safe to iterate while the
    /// registry mutates concurrently.
    pub fn handles(&self) -> Vec<WatchHandle> {
        self.entries.iter().map(|e| *e.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Kernel watches die with the channel, so no
    /// per-watch source calls are made here.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
