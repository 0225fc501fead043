//! DOM Events
//!
//! Event objects, listener storage and the capture/target/bubble dispatcher.

mod dispatch;
mod listeners;

pub use listeners::{EventListeners, Listener, ListenerId};

use std::sync::Arc;

use crate::{Document, NodeId};

/// Error raised by an event handler or timer callback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Callback invoked for a dispatched event. It receives the whole document so
/// it can mutate the tree while the dispatch is in progress.
pub type EventCallback = Arc<dyn Fn(&mut Document, &mut Event) -> HandlerResult + Send + Sync>;

/// Wrap a closure as an [`EventCallback`]
pub fn callback<F>(f: F) -> EventCallback
where
    F: Fn(&mut Document, &mut Event) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Receiver of handler failures that were isolated during dispatch
pub type ErrorSink = Arc<dyn Fn(&HandlerError) + Send + Sync>;

/// Turns `on<type>` attribute source into a callable handler
pub trait InlineHandlerCompiler: Send + Sync {
    fn compile(&self, event_type: &str, source: &str) -> Result<EventCallback, HandlerError>;
}

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum EventPhase {
    #[default]
    None = 0,
    Capturing = 1,
    AtTarget = 2,
    Bubbling = 3,
}

impl EventPhase {
    /// DOM `eventPhase` code
    pub fn code(self) -> u16 {
        self as u16
    }
}

/// Interfaces accepted by `Document::create_event`
pub(crate) const EVENT_INTERFACES: &[&str] = &[
    "event",
    "events",
    "htmlevents",
    "uievent",
    "uievents",
    "mouseevent",
    "mouseevents",
    "keyboardevent",
    "focusevent",
    "customevent",
];

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    target: Option<NodeId>,
    current_target: Option<NodeId>,
    phase: EventPhase,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    default_prevented: bool,
    initialized: bool,
    dispatched: bool,
}

impl Event {
    /// Create an initialized event, ready to dispatch
    pub fn new(event_type: &str, bubbles: bool, cancelable: bool) -> Self {
        let mut event = Self::uninitialized();
        event.init_event(event_type, bubbles, cancelable);
        event
    }

    pub(crate) fn uninitialized() -> Self {
        Self {
            event_type: String::new(),
            bubbles: false,
            cancelable: false,
            target: None,
            current_target: None,
            phase: EventPhase::None,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
            initialized: false,
            dispatched: false,
        }
    }

    /// (Re)initialize type and flags. Ignored while the event is being
    /// dispatched.
    pub fn init_event(&mut self, event_type: &str, bubbles: bool, cancelable: bool) {
        if self.phase != EventPhase::None {
            return;
        }
        self.event_type = event_type.to_string();
        self.bubbles = bubbles;
        self.cancelable = cancelable;
        self.target = None;
        self.current_target = None;
        self.propagation_stopped = false;
        self.immediate_propagation_stopped = false;
        self.default_prevented = false;
        self.initialized = true;
        self.dispatched = false;
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Node the event was dispatched to
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Node whose handlers are currently running
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    pub fn phase(&self) -> EventPhase {
        self.phase
    }

    /// DOM `eventPhase`
    pub fn event_phase(&self) -> u16 {
        self.phase.code()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Don't visit further nodes; the current node's handlers still run
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Don't run any further handler, not even on the current node
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    /// Only effective on cancelable events
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub(crate) fn enter(&mut self, node: NodeId, phase: EventPhase) {
        self.current_target = Some(node);
        self.phase = phase;
    }
}
