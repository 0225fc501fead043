//! Event dispatch
//!
//! Capture -> target -> bubble over the ancestor chain captured when the
//! dispatch starts. Handlers may mutate the tree; the chain is not recomputed.

use std::panic::{self, AssertUnwindSafe};

use super::{Event, EventCallback, EventPhase, HandlerError, ListenerId, EVENT_INTERFACES};
use crate::{Document, DomError, DomResult, NodeId};

impl Document {
    /// Create an uninitialized event. Call [`Event::init_event`] before
    /// dispatching it.
    pub fn create_event(&self, interface: &str) -> DomResult<Event> {
        let name = interface.to_ascii_lowercase();
        if EVENT_INTERFACES.contains(&name.as_str()) {
            Ok(Event::uninitialized())
        } else {
            Err(DomError::NotSupported(interface.to_string()))
        }
    }

    /// Register a listener on any node, the document included
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: EventCallback,
        capture: bool,
    ) -> DomResult<ListenerId> {
        let node = self.tree.get_mut(node).ok_or(DomError::NotFound)?;
        Ok(node.listeners.add(event_type, callback, capture))
    }

    /// Remove a listener registered with the same type, callback and capture
    /// flag. Returns whether one was found.
    pub fn remove_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: &EventCallback,
        capture: bool,
    ) -> bool {
        self.tree
            .get_mut(node)
            .is_some_and(|n| n.listeners.remove(event_type, callback, capture))
    }

    pub fn remove_listener_by_id(&mut self, node: NodeId, id: ListenerId) -> bool {
        self.tree
            .get_mut(node)
            .is_some_and(|n| n.listeners.remove_by_id(id))
    }

    /// Set or clear the `on<type>` handler property of an element. The
    /// property takes precedence over a handler attribute of the same type.
    pub fn set_event_handler(
        &mut self,
        node: NodeId,
        event_type: &str,
        handler: Option<EventCallback>,
    ) -> DomResult<()> {
        let elem = self.element_mut(node).ok_or(DomError::NotFound)?;
        elem.set_handler(event_type, handler);
        Ok(())
    }

    /// Dispatch `event` to `target`. Returns `false` if a handler cancelled it.
    pub fn dispatch_event(&mut self, target: NodeId, event: &mut Event) -> DomResult<bool> {
        if self.tree.get(target).is_none() {
            return Err(DomError::NotFound);
        }
        if !event.initialized {
            return Err(DomError::InvalidState);
        }
        if event.phase != EventPhase::None {
            return Err(DomError::InvalidState);
        }
        if event.dispatched {
            // Dispatched before and never re-initialized: nothing runs.
            event.current_target = None;
            event.phase = EventPhase::None;
            return Ok(!event.default_prevented);
        }

        tracing::trace!("Dispatching {} to {:?}", event.event_type, target);
        event.target = Some(target);
        let chain: Vec<NodeId> = self.tree.ancestors(target).collect();

        for &node in chain.iter().rev() {
            if event.propagation_stopped {
                break;
            }
            self.invoke(node, event, EventPhase::Capturing);
        }

        if !event.propagation_stopped {
            self.invoke(target, event, EventPhase::AtTarget);
        }

        if event.bubbles {
            for &node in &chain {
                if event.propagation_stopped {
                    break;
                }
                self.invoke(node, event, EventPhase::Bubbling);
            }
        }

        event.current_target = None;
        event.phase = EventPhase::None;
        event.dispatched = true;
        Ok(!event.default_prevented)
    }

    /// Programmatic activation: dispatch a bubbling, cancelable `click`
    pub fn click(&mut self, node: NodeId) -> DomResult<bool> {
        let mut event = Event::new("click", true, true);
        self.dispatch_event(node, &mut event)
    }

    fn invoke(&mut self, node: NodeId, event: &mut Event, phase: EventPhase) {
        let capture = phase == EventPhase::Capturing;
        let listeners = match self.tree.get(node) {
            Some(n) => n.listeners.matching(&event.event_type, capture),
            None => return,
        };

        for listener in listeners {
            if event.immediate_propagation_stopped {
                return;
            }
            // Skip listeners removed by an earlier handler of this dispatch
            let still_registered = self
                .tree
                .get(node)
                .is_some_and(|n| n.listeners.contains(listener.id));
            if !still_registered {
                continue;
            }
            event.enter(node, phase);
            self.call(&listener.callback, event);
        }

        // Intrinsic handlers run once per node, in its non-capturing visit
        if capture || event.immediate_propagation_stopped {
            return;
        }
        if let Some(handler) = self.intrinsic_handler(node, &event.event_type) {
            event.enter(node, phase);
            self.call(&handler, event);
        }
    }

    /// Run one handler. Errors and panics are reported and go no further.
    fn call(&mut self, handler: &EventCallback, event: &mut Event) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(self, event)));
        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => HandlerError::new(format!(
                "{} handler panicked: {}",
                event.event_type,
                panic_message(payload.as_ref())
            )),
        };
        self.report_error(&err);
    }

    fn intrinsic_handler(&mut self, node: NodeId, event_type: &str) -> Option<EventCallback> {
        let elem = self.tree.get(node)?.as_element()?;
        if let Some(handler) = elem.handler(event_type) {
            return Some(handler.clone());
        }
        let source = elem.get_attribute(&format!("on{}", event_type))?.to_string();
        let compiler = self.inline_handlers.clone()?;
        match compiler.compile(event_type, &source) {
            Ok(handler) => Some(handler),
            Err(err) => {
                self.report_error(&err);
                None
            }
        }
    }

    /// Route an isolated handler failure to the error sink
    pub fn report_error(&self, err: &HandlerError) {
        tracing::warn!("Event handler failed: {}", err);
        if let Some(sink) = &self.error_sink {
            sink(err);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
