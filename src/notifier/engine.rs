//! The dispatch engine: owns the channel, the registry, and the loop.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::backend::{ChannelError, EventChannel, WatchSource};
use crate::event::{Event, EventMask, RawRecord, decode_batch};
use crate::types::WatchHandle;
use crate::{debug_event, log_event};

use super::error::WatchError;
use super::handler::EventHandler;
use super::registry::{Registration, WatchRegistry};

/// Lifecycle of the engine. States only advance, never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, dispatch thread not yet started.
    Idle,
    /// Dispatch loop active.
    Running,
    /// Stop requested, loop draining the batch in hand.
    Stopping,
    /// Loop exited, channel closed, registry cleared.
    Stopped,
}

/// Why the engine reached [`LifecycleState::Stopped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// A caller asked for the stop.
    Requested,
    /// The channel closed outside of a requested stop.
    ChannelClosed,
    /// The channel failed with the recorded error.
    ChannelFailure(String),
}

const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Dispatch engine over a single kernel notification channel.
///
/// One dedicated thread runs the read/decode/dispatch loop; every other
/// operation is safe to call concurrently from any thread. Construct via
/// [`Notifier::builder`], or [`Notifier::new`] for the inotify backend.
pub struct Notifier {
    inner: Arc<Inner>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    channel: Arc<dyn EventChannel>,
    registry: WatchRegistry,
    state: Mutex<LifecycleState>,
    stop_requested: AtomicBool,
    stop_reason: Mutex<Option<StopReason>>,
    overflow_handler: Option<Arc<dyn EventHandler>>,
    fallback_handler: Option<Arc<dyn EventHandler>>,
    buffer_size: usize,
}

impl Notifier {
    /// Builder for configuring the engine.
    pub fn builder() -> NotifierBuilder {
        NotifierBuilder::new()
    }

    /// Engine over a fresh inotify channel.
    #[cfg(target_os = "linux")]
    pub fn new() -> Result<Self, WatchError> {
        let backend = crate::backend::InotifyBackend::new().map_err(WatchError::Channel)?;
        Self::builder().backend(backend).build()
    }

    /// Start the dispatch thread. Legal exactly once, from Idle.
    pub fn start(&self) -> Result<(), WatchError> {
        {
            let mut state = self.inner.state.lock();
            if *state != LifecycleState::Idle {
                return Err(WatchError::Lifecycle { state: *state });
            }
            *state = LifecycleState::Running;
        }

        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("vigil-dispatch".to_string())
            .spawn(move || inner.run_loop())
            .map_err(|err| {
                *self.inner.state.lock() = LifecycleState::Stopped;
                WatchError::Channel(ChannelError::Init { source: err })
            })?;

        *self.thread.lock() = Some(handle);
        log_event!("notifier", "started");
        Ok(())
    }

    /// Ask the loop to stop. Idempotent, callable from any thread,
    /// including from inside a handler. The loop finishes the batch it is
    /// dispatching before it shuts down.
    pub fn request_stop(&self) {
        if self.inner.stop_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            if *state == LifecycleState::Running {
                *state = LifecycleState::Stopping;
            }
        }
        // A read blocked on an idle channel will not notice a flag; wake it.
        self.inner.channel.interrupt();
        debug_event!("notifier", "stop requested");
    }

    /// Wait for the dispatch thread to finish. Returns immediately if it
    /// was never started or is already joined.
    pub fn join(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Why the engine stopped, once it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.inner.stop_reason.lock().clone()
    }

    /// Establish a watch with an initial handler set. Legal in Idle and
    /// Running.
    pub fn add_watch(
        &self,
        path: &Path,
        mask: EventMask,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> Result<WatchHandle, WatchError> {
        // The state lock is held across the insert; shutdown clears the
        // registry under the same lock, so a registration can never land
        // after the clear and survive into Stopped.
        let state = self.inner.state.lock();
        if !matches!(*state, LifecycleState::Idle | LifecycleState::Running) {
            return Err(WatchError::Lifecycle { state: *state });
        }
        let handle = self.inner.registry.register(path, mask, handlers)?;
        drop(state);
        log_event!("notifier", "watching", "{} ({handle})", path.display());
        Ok(handle)
    }

    /// Explicitly remove a watch and its registration.
    pub fn remove_watch(&self, handle: WatchHandle) -> Result<(), WatchError> {
        self.ensure_mutable()?;
        self.inner.registry.unregister(handle)?;
        log_event!("notifier", "unwatched", "{handle}");
        Ok(())
    }

    /// Append a handler to an existing watch.
    pub fn add_handler(
        &self,
        handle: WatchHandle,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), WatchError> {
        self.ensure_mutable()?;
        self.inner.registry.add_handler(handle, handler)
    }

    /// Remove a previously added handler (matched by `Arc` identity).
    pub fn remove_handler(
        &self,
        handle: WatchHandle,
        handler: &Arc<dyn EventHandler>,
    ) -> Result<(), WatchError> {
        self.ensure_mutable()?;
        self.inner.registry.remove_handler(handle, handler)
    }

    /// Read access to the registry (lookups and snapshots).
    pub fn registry(&self) -> &WatchRegistry {
        &self.inner.registry
    }

    fn ensure_mutable(&self) -> Result<(), WatchError> {
        let state = *self.inner.state.lock();
        match state {
            LifecycleState::Idle | LifecycleState::Running => Ok(()),
            _ => Err(WatchError::Lifecycle { state }),
        }
    }
}

impl Inner {
    fn run_loop(self: Arc<Self>) {
        let mut buf = vec![0u8; self.buffer_size];

        let reason = loop {
            if self.stop_requested.load(Ordering::SeqCst) {
                break StopReason::Requested;
            }

            let n = match self.channel.read_batch(&mut buf) {
                Ok(n) => n,
                Err(ChannelError::Closed) => {
                    if self.stop_requested.load(Ordering::SeqCst) {
                        break StopReason::Requested;
                    }
                    break StopReason::ChannelClosed;
                }
                Err(err) => {
                    if self.stop_requested.load(Ordering::SeqCst) {
                        break StopReason::Requested;
                    }
                    tracing::error!("[notifier] channel failure: {err}");
                    break StopReason::ChannelFailure(err.to_string());
                }
            };

            if n == 0 {
                continue;
            }

            // One corrupt batch must not take the engine down
            let records = match decode_batch(&buf[..n]) {
                Ok(records) => records,
                Err(err) => {
                    tracing::error!("[notifier] dropping undecodable batch of {n} bytes: {err}");
                    continue;
                }
            };

            // The whole decoded batch is dispatched even if a stop arrives
            // mid-way; the stop is observed at the top of the loop.
            for record in records {
                self.dispatch(record);
            }
        };

        self.shutdown(reason);
    }

    fn shutdown(&self, reason: StopReason) {
        self.channel.close();
        {
            let mut state = self.state.lock();
            self.registry.clear();
            *self.stop_reason.lock() = Some(reason.clone());
            *state = LifecycleState::Stopped;
        }
        log_event!("notifier", "stopped", "{reason:?}");
    }

    fn dispatch(&self, record: RawRecord) {
        let mask = EventMask::from_raw(record.mask);

        // Overflow is reported against the kernel's sentinel descriptor,
        // never a registered handle, so there is nothing to look up.
        if mask.contains(EventMask::QUEUE_OVERFLOW) {
            match &self.overflow_handler {
                Some(handler) => {
                    let event = Event::overflow(&record);
                    if let Err(err) = handler.on_event(&event) {
                        tracing::error!("[{}] overflow handler failed: {err}", handler.name());
                    }
                }
                None => {
                    tracing::warn!("[notifier] kernel queue overflowed, events were dropped");
                }
            }
            return;
        }

        let handle = WatchHandle::from_raw(record.wd);
        let Some(registration) = self.registry.lookup(handle) else {
            // Watch removed while this event was in flight; drop it.
            debug_event!("notifier", "dropping event for removed watch", "{handle}");
            return;
        };

        let event = Event::resolve(handle, mask, record.cookie, record.name, registration.path());

        // The kernel stopped watching on its own; reflect that after the
        // handlers have seen the final event.
        let implicit_removal = mask.intersects(EventMask::IGNORED | EventMask::UNMOUNT);

        self.invoke_handlers(&registration, &event);

        if implicit_removal && self.registry.forget(handle) {
            log_event!(
                "notifier",
                "watch dropped by kernel",
                "{} ({handle})",
                registration.path().display()
            );
        }
    }

    fn invoke_handlers(&self, registration: &Registration, event: &Event) {
        let mut handled = false;

        for handler in registration.handlers() {
            if !handler.wants(event.mask) {
                continue;
            }
            if let Err(err) = handler.on_event(event) {
                tracing::error!("[{}] handler failed for {event}: {err}", handler.name());
            }
            handled = true;
        }

        if !handled {
            match &self.fallback_handler {
                Some(fallback) => {
                    if let Err(err) = fallback.on_event(event) {
                        tracing::error!("[{}] fallback failed for {event}: {err}", fallback.name());
                    }
                }
                None => {
                    debug_event!("notifier", "unhandled event", "{event}");
                }
            }
        }
    }
}

/// Builder for constructing a [`Notifier`].
pub struct NotifierBuilder {
    source: Option<Arc<dyn WatchSource>>,
    channel: Option<Arc<dyn EventChannel>>,
    overflow_handler: Option<Arc<dyn EventHandler>>,
    fallback_handler: Option<Arc<dyn EventHandler>>,
    buffer_size: usize,
}

impl NotifierBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            channel: None,
            overflow_handler: None,
            fallback_handler: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Use one backend as both watch source and event channel.
    pub fn backend<B>(mut self, backend: B) -> Self
    where
        B: WatchSource + EventChannel + 'static,
    {
        let backend = Arc::new(backend);
        self.source = Some(Arc::clone(&backend) as Arc<dyn WatchSource>);
        self.channel = Some(backend as Arc<dyn EventChannel>);
        self
    }

    /// Process-wide handler for kernel queue-overflow events.
    pub fn overflow_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.overflow_handler = Some(Arc::new(handler));
        self
    }

    /// Handler invoked when no registered handler accepts an event.
    pub fn fallback_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.fallback_handler = Some(Arc::new(handler));
        self
    }

    /// Size of the read buffer. Must hold at least one maximal record
    /// (16-byte header plus a NAME_MAX name).
    pub fn buffer_size(mut self, bytes: usize) -> Self {
        self.buffer_size = bytes;
        self
    }

    pub fn build(self) -> Result<Notifier, WatchError> {
        let (Some(source), Some(channel)) = (self.source, self.channel) else {
            return Err(WatchError::Channel(ChannelError::Init {
                source: std::io::Error::other("no backend configured"),
            }));
        };

        Ok(Notifier {
            inner: Arc::new(Inner {
                channel,
                registry: WatchRegistry::new(source),
                state: Mutex::new(LifecycleState::Idle),
                stop_requested: AtomicBool::new(false),
                stop_reason: Mutex::new(None),
                overflow_handler: self.overflow_handler,
                fallback_handler: self.fallback_handler,
                buffer_size: self.buffer_size.max(crate::event::HEADER_LEN),
            }),
            thread: Mutex::new(None),
        })
    }
}

impl Default for NotifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
