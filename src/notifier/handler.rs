//! Handler capability invoked with dispatched events.

use crate::event::{Event, EventMask};

use super::error::HandlerError;

/// A unit of event-handling behavior.
///
/// Any number of handlers may be registered per watch; the engine invokes
/// them in registration order and isolates each invocation's failure.
/// Handlers run on the dispatch thread, so long work should be offloaded
/// to another thread; the engine applies no timeout, and a slow handler
/// delays the next channel read.
///
/// Handlers may mutate the registry from inside [`on_event`](Self::on_event)
/// (remove themselves, add new watches); such changes apply to subsequent
/// dispatch cycles, never the event in flight.
pub trait EventHandler: Send + Sync {
    /// Name used for logging context.
    fn name(&self) -> &str {
        "handler"
    }

    /// Filter on the event's mask. An event whose mask fails this test is
    /// not delivered to the handler.
    fn wants(&self, mask: EventMask) -> bool {
        let _ = mask;
        true
    }

    /// Process one event.
    fn on_event(&self, event: &Event) -> Result<(), HandlerError>;
}

/// Adapter turning a closure into an [`EventHandler`].
pub struct FnHandler<F> {
    name: String,
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&Event) -> Result<(), HandlerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &Event) -> Result<(), HandlerError> {
        (self.func)(event)
    }
}
