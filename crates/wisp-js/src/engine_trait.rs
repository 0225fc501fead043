//! Script Engine Trait
//!
//! The DOM never interprets script itself. A page hands source text to a
//! [`ScriptEngine`] and gets back values, errors, or compiled handlers.

use std::sync::{Arc, Mutex};

use wisp_dom::{callback, Document, EventCallback, HandlerError, InlineHandlerCompiler};

use crate::gate::lock;
use crate::{JsError, JsValue};

/// Pluggable script engine.
///
/// Both calls happen inside the page's execution gate, so the engine gets
/// exclusive access to the document for their duration.
pub trait ScriptEngine: Send + Sync {
    /// Run `source` against `document`
    fn execute(&self, document: &mut Document, source: &str) -> Result<JsValue, JsError>;

    /// Compile the body of an `on<type>` attribute into a handler
    fn compile_handler(&self, event_type: &str, source: &str) -> Result<EventCallback, JsError>;
}

/// Engine that evaluates nothing. It records what it was asked to run, which
/// is enough to drive pages without a real interpreter.
#[derive(Debug, Default, Clone)]
pub struct StubEngine {
    executed: Arc<Mutex<Vec<String>>>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources executed so far, handler invocations included
    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }
}

impl ScriptEngine for StubEngine {
    fn execute(&self, _document: &mut Document, source: &str) -> Result<JsValue, JsError> {
        tracing::debug!("StubEngine: execute ({} bytes)", source.len());
        lock(&self.executed).push(source.to_string());
        Ok(JsValue::Undefined)
    }

    fn compile_handler(&self, event_type: &str, source: &str) -> Result<EventCallback, JsError> {
        if source.trim().is_empty() {
            return Err(JsError::Syntax(format!("empty on{} handler", event_type)));
        }
        let executed = Arc::clone(&self.executed);
        let source = source.to_string();
        Ok(callback(move |_, _| {
            lock(&executed).push(source.clone());
            Ok(())
        }))
    }
}

/// Lets a [`ScriptEngine`] compile handler attributes during dispatch
pub struct EngineHandlerCompiler {
    engine: Arc<dyn ScriptEngine>,
}

impl EngineHandlerCompiler {
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Self {
        Self { engine }
    }
}

impl InlineHandlerCompiler for EngineHandlerCompiler {
    fn compile(&self, event_type: &str, source: &str) -> Result<EventCallback, HandlerError> {
        Ok(self.engine.compile_handler(event_type, source)?)
    }
}
