//! Wisp JavaScript Host
//!
//! Everything a page needs to run scripts without owning an interpreter:
//!
//! - [`ScriptEngine`]: the contract a real engine implements
//! - [`ExecutionGate`]: one-at-a-time access to the document
//! - [`WindowTimers`]: `setTimeout`/`setInterval` firing through the gate

mod engine_trait;
mod gate;
mod timers;

pub use engine_trait::{EngineHandlerCompiler, ScriptEngine, StubEngine};
pub use gate::{ExecutionGate, GateError};
pub use timers::{
    timer_handler, Notification, TimerControl, TimerError, TimerErrorSink, TimerHandle,
    TimerHandler, TimerHooks, TimerKind, WindowTimers, DEFAULT_CANCEL_TIMEOUT,
};

use wisp_dom::HandlerError;

/// JavaScript value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl JsValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            JsValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
        }
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Bool(b)
    }
}

/// JavaScript error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JsError {
    #[error("JavaScript error: {0}")]
    Runtime(String),

    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Handler panicked: {0}")]
    Panic(String),
}

impl From<JsError> for HandlerError {
    fn from(err: JsError) -> Self {
        HandlerError::new(err.to_string())
    }
}
