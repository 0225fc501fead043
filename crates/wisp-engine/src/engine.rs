//! Engine - Main entry point

use std::sync::Arc;

use url::Url;
use wisp_dom::DomError;
use wisp_js::{GateError, JsError, ScriptEngine, StubEngine, TimerError};

use crate::{Config, Page};

/// The Wisp engine
pub struct Engine {
    config: Config,
    script_engine: Arc<dyn ScriptEngine>,
}

impl Engine {
    /// Create a new engine backed by the recording [`StubEngine`]
    pub fn new(config: Config) -> Self {
        Self::with_script_engine(config, Arc::new(StubEngine::new()))
    }

    /// Create an engine that runs page scripts on `script_engine`
    pub fn with_script_engine(config: Config, script_engine: Arc<dyn ScriptEngine>) -> Self {
        tracing::info!("Wisp Engine {} initialized", crate::VERSION);
        Self {
            config,
            script_engine,
        }
    }

    /// Build a page from markup already in hand
    pub fn load_html(&self, url: &str, html: &str) -> Result<Page, EngineError> {
        let page = self.blank_page(url)?;
        page.load(html)?;
        Ok(page)
    }

    /// Page with an empty document skeleton, nothing loaded yet
    pub fn blank_page(&self, url: &str) -> Result<Page, EngineError> {
        let url = Url::parse(url)?;
        Page::new(url, self.config.clone(), Arc::clone(&self.script_engine))
    }

    /// Get engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("JavaScript error: {0}")]
    JavaScript(#[from] JsError),

    #[error("JavaScript is disabled")]
    JavaScriptDisabled,
}
