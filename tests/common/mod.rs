//! Shared test support: an in-memory backend and a raw-record encoder.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::Mutex;

use vigil::{
    ChannelError, Event, EventChannel, EventHandler, EventMask, HandlerError, WatchError,
    WatchHandle, WatchSource,
};

/// Encode one kernel-layout record: 16-byte header then NUL-padded name.
pub fn encode_record(wd: i32, mask: u32, cookie: u32, name: Option<&str>) -> Vec<u8> {
    let mut buf = Vec::new();
    let name_bytes = name.map(str::as_bytes).unwrap_or(&[]);
    // Kernel pads names with NULs to the next 16-byte boundary
    let padded = if name_bytes.is_empty() {
        0
    } else {
        (name_bytes.len() + 1).div_ceil(16) * 16
    };

    buf.extend_from_slice(&wd.to_ne_bytes());
    buf.extend_from_slice(&mask.to_ne_bytes());
    buf.extend_from_slice(&cookie.to_ne_bytes());
    buf.extend_from_slice(&(padded as u32).to_ne_bytes());
    buf.extend_from_slice(name_bytes);
    buf.resize(16 + padded, 0);
    buf
}

/// Feeds byte batches to a notifier under test and records source calls.
pub struct MockBackend {
    batches: Receiver<Vec<u8>>,
    wake_rx: Receiver<()>,
    wake_tx: Sender<()>,
    next_wd: AtomicI32,
    by_path: Mutex<HashMap<PathBuf, i32>>,
    removed: Arc<Mutex<Vec<i32>>>,
}

impl MockBackend {
    /// Backend plus the sender used to push raw batches into it.
    pub fn new() -> (Self, Sender<Vec<u8>>) {
        let (batch_tx, batch_rx) = unbounded();
        let (wake_tx, wake_rx) = bounded(1);
        (
            Self {
                batches: batch_rx,
                wake_rx,
                wake_tx,
                next_wd: AtomicI32::new(1),
                by_path: Mutex::new(HashMap::new()),
                removed: Arc::new(Mutex::new(Vec::new())),
            },
            batch_tx,
        )
    }

    /// Shared view of the descriptors removed via the source; clone it
    /// before handing the backend to a builder.
    pub fn removed_probe(&self) -> Arc<Mutex<Vec<i32>>> {
        Arc::clone(&self.removed)
    }
}

impl WatchSource for MockBackend {
    fn add_watch(&self, path: &Path, _mask: EventMask) -> Result<WatchHandle, WatchError> {
        // Same path yields the same descriptor, like inotify
        let mut by_path = self.by_path.lock();
        let wd = *by_path
            .entry(path.to_path_buf())
            .or_insert_with(|| self.next_wd.fetch_add(1, Ordering::SeqCst));
        Ok(WatchHandle::from_raw(wd))
    }

    fn remove_watch(&self, handle: WatchHandle) -> Result<(), WatchError> {
        self.removed.lock().push(handle.as_raw());
        Ok(())
    }
}

impl EventChannel for MockBackend {
    fn read_batch(&self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        crossbeam_channel::select! {
            recv(self.batches) -> msg => match msg {
                Ok(batch) => {
                    let n = batch.len().min(buf.len());
                    buf[..n].copy_from_slice(&batch[..n]);
                    Ok(n)
                }
                Err(_) => Err(ChannelError::Closed),
            },
            recv(self.wake_rx) -> _ => Err(ChannelError::Closed),
        }
    }

    fn interrupt(&self) {
        let _ = self.wake_tx.try_send(());
    }

    fn close(&self) {
        let _ = self.wake_tx.try_send(());
    }
}

/// Handler that records every event it sees.
#[derive(Default)]
pub struct Recorder {
    name: String,
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn named(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

impl EventHandler for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Spin until `predicate` holds or the timeout elapses.
pub fn wait_for(predicate: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while std::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    false
}
