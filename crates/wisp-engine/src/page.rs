//! Page - A document and the window machinery around it
//!
//! A page pairs one [`Document`] with one execution gate, one timer registry
//! and a script engine. Every entry point that touches the document goes
//! through the gate.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use url::Url;
use wisp_dom::{Document, Event, HandlerError, NodeId, Provenance};
use wisp_html::{build_document, tokenize, HtmlParser};
use wisp_js::{
    EngineHandlerCompiler, ExecutionGate, JsError, JsValue, ScriptEngine, TimerControl,
    TimerHandle, TimerHandler, WindowTimers,
};

use crate::{Config, EngineError};

/// Errors swallowed by handlers, timers and completions, oldest first
#[derive(Debug, Clone, Default)]
struct ErrorLog(Arc<Mutex<Vec<String>>>);

impl ErrorLog {
    fn push(&self, message: String) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Record the outcome of a callback run at the gate boundary
    fn settle(&self, outcome: std::thread::Result<Result<(), JsError>>) {
        let message = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(_) => "completion callback panicked".to_string(),
        };
        tracing::warn!("Swallowed page error: {}", message);
        self.push(message);
    }
}

/// A loaded web page
pub struct Page {
    url: Url,
    config: Config,
    gate: ExecutionGate<Document>,
    timers: WindowTimers<Document>,
    script_engine: Arc<dyn ScriptEngine>,
    errors: ErrorLog,
}

impl Page {
    pub(crate) fn new(
        url: Url,
        config: Config,
        script_engine: Arc<dyn ScriptEngine>,
    ) -> Result<Self, EngineError> {
        let gate = ExecutionGate::new(Document::new(url.as_str()));
        let timers =
            WindowTimers::with_cancel_timeout(gate.clone(), config.interval_cancel_timeout)?;
        let errors = ErrorLog::default();

        let timer_errors = errors.clone();
        timers.set_error_sink(Some(Arc::new(move |err: &JsError| {
            timer_errors.push(err.to_string());
        })));

        let page = Self {
            url,
            config,
            gate,
            timers,
            script_engine,
            errors,
        };
        page.gate.run(|doc| page.wire(doc))?;
        Ok(page)
    }

    /// Connect a fresh document to this page's error log and script engine
    fn wire(&self, doc: &mut Document) {
        let errors = self.errors.clone();
        doc.set_error_sink(Some(Arc::new(move |err: &HandlerError| {
            errors.push(err.message().to_string());
        })));
        if self.config.enable_javascript {
            let compiler = EngineHandlerCompiler::new(Arc::clone(&self.script_engine));
            doc.set_inline_handler_compiler(Some(Arc::new(compiler)));
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gate(&self) -> &ExecutionGate<Document> {
        &self.gate
    }

    pub fn timers(&self) -> &WindowTimers<Document> {
        &self.timers
    }

    /// Run `f` against the document inside the gate
    pub fn with_document<R>(&self, f: impl FnOnce(&mut Document) -> R) -> Result<R, EngineError> {
        Ok(self.gate.run(f)?)
    }

    pub fn title(&self) -> Result<String, EngineError> {
        self.with_document(|doc| doc.title())
    }

    /// Drain the errors swallowed since the last call
    pub fn take_errors(&self) -> Vec<String> {
        self.errors.take()
    }

    /// Build `html` into the current document, then run its inline scripts
    /// and fire the load events
    pub fn load(&self, html: &str) -> Result<(), EngineError> {
        tracing::info!("Loading: {}", self.url);
        let markup = tokenize(html);
        if !markup.errors.is_empty() {
            tracing::debug!("{} recoverable parse errors", markup.errors.len());
        }
        self.gate.run(|doc| build_document(doc, &markup.nodes))?;

        if self.config.enable_javascript && self.config.run_inline_scripts {
            self.run_inline_scripts()?;
        }
        if self.config.dispatch_load_events {
            self.gate.run(|doc| {
                let mut ready = Event::new("DOMContentLoaded", true, false);
                let _ = doc.dispatch_event(doc.root(), &mut ready);
                if let Some(body) = doc.body() {
                    let mut load = Event::new("load", false, false);
                    let _ = doc.dispatch_event(body, &mut load);
                }
            })?;
        }
        Ok(())
    }

    fn run_inline_scripts(&self) -> Result<(), EngineError> {
        let engine = Arc::clone(&self.script_engine);
        let errors = self.errors.clone();
        self.gate.run(|doc| {
            let scripts = doc.get_elements_by_tag_name(doc.root(), "script");
            for script in scripts {
                if doc.provenance(script) != Some(Provenance::Parser) {
                    continue;
                }
                if doc.has_attribute(script, "src") {
                    tracing::debug!("Skipping external script");
                    continue;
                }
                let is_js = doc
                    .get_attribute(script, "type")
                    .is_none_or(|t| t.is_empty() || t.to_ascii_lowercase().contains("javascript"));
                if !is_js {
                    continue;
                }
                let Some(source) = doc
                    .element(script)
                    .and_then(|e| e.inline_content())
                    .map(str::to_string)
                else {
                    continue;
                };
                if let Err(err) = engine.execute(doc, &source) {
                    tracing::warn!("Inline script failed: {}", err);
                    errors.push(err.to_string());
                }
            }
        })?;
        Ok(())
    }

    /// Execute `source` in the page's script engine
    pub fn run_script(&self, source: &str) -> Result<JsValue, EngineError> {
        if !self.config.enable_javascript {
            return Err(EngineError::JavaScriptDisabled);
        }
        let engine = Arc::clone(&self.script_engine);
        let outcome = self
            .gate
            .run(|doc| panic::catch_unwind(AssertUnwindSafe(|| engine.execute(doc, source))))?;
        match outcome {
            Ok(result) => Ok(result?),
            Err(_) => Err(JsError::Panic("script engine panicked".to_string()).into()),
        }
    }

    /// Deliver a resource completion. The callback runs inside the gate;
    /// its errors and panics go to the page's error log.
    pub fn run_completion<F>(&self, callback: F, args: &[JsValue]) -> Result<(), EngineError>
    where
        F: FnOnce(&mut Document, &[JsValue]) -> Result<(), JsError>,
    {
        let outcome = self
            .gate
            .run(|doc| panic::catch_unwind(AssertUnwindSafe(|| callback(doc, args))))?;
        self.errors.settle(outcome);
        Ok(())
    }

    /// Await `future` on the smol executor, then deliver its result to
    /// `callback` through the gate. A completion whose document was
    /// replaced in the meantime is dropped.
    pub fn complete_async<Fut, F>(
        &self,
        future: Fut,
        callback: F,
    ) -> Result<smol::Task<Result<(), EngineError>>, EngineError>
    where
        Fut: Future<Output = Vec<JsValue>> + Send + 'static,
        F: FnOnce(&mut Document, &[JsValue]) -> Result<(), JsError> + Send + 'static,
    {
        let origin = self.gate.run(|doc| doc.id())?;
        let gate = self.gate.clone();
        let errors = self.errors.clone();
        Ok(smol::spawn(async move {
            let args = future.await;
            let outcome = smol::unblock(move || {
                gate.run(|doc| {
                    if doc.id() != origin {
                        tracing::debug!("Dropping completion for superseded document");
                        return None;
                    }
                    Some(panic::catch_unwind(AssertUnwindSafe(|| callback(doc, &args))))
                })
            })
            .await?;
            if let Some(outcome) = outcome {
                errors.settle(outcome);
            }
            Ok::<_, EngineError>(())
        }))
    }

    /// The current document is being replaced: cancel everything it scheduled
    pub fn document_superseded(&self) {
        self.timers.clear_all();
    }

    /// Replace the document with one built from `html`. `url` may be
    /// relative to the current page.
    pub fn navigate(&mut self, url: &str, html: &str) -> Result<(), EngineError> {
        let url = self.url.join(url)?;
        tracing::info!("Navigating to {}", url);
        self.document_superseded();
        self.gate.run(|doc| {
            *doc = Document::new(url.as_str());
            self.wire(doc);
        })?;
        self.url = url;
        self.load(html)
    }

    /// `element.innerHTML = html`: replace the children of `node` with nodes
    /// built from `html`, tagged as script-inserted
    pub fn set_inner_html(&self, node: NodeId, html: &str) -> Result<(), EngineError> {
        self.gate.run(|doc| {
            if doc.element(node).is_none() {
                return Err(wisp_dom::DomError::NotFound);
            }
            for child in doc.children(node).to_vec() {
                doc.remove(child)?;
            }
            HtmlParser::new().parse_fragment(doc, node, html, Provenance::Script);
            Ok(())
        })??;
        Ok(())
    }

    /// Dispatch a synthetic `click` on `node`
    pub fn click(&self, node: NodeId) -> Result<bool, EngineError> {
        Ok(self.gate.run(|doc| doc.click(node))??)
    }

    pub fn dispatch_event(&self, node: NodeId, event: &mut Event) -> Result<bool, EngineError> {
        Ok(self.gate.run(|doc| doc.dispatch_event(node, event))??)
    }

    pub fn set_timeout(&self, handler: TimerHandler<Document>, delay_ms: u64, args: Vec<JsValue>) -> TimerHandle {
        self.timers.set_timeout(handler, delay_ms, args)
    }

    pub fn set_interval(&self, handler: TimerHandler<Document>, period_ms: u64, args: Vec<JsValue>) -> TimerHandle {
        self.timers.set_interval(handler, period_ms, args)
    }

    pub fn clear_timeout(&self, handle: TimerHandle) {
        self.timers.clear_timeout(handle);
    }

    pub fn clear_interval(&self, handle: TimerHandle) {
        self.timers.clear_interval(handle);
    }

    /// Timer access for script bindings running inside the gate
    pub fn timer_control(&self) -> TimerControl<Document> {
        self.timers.control()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url.as_str())
            .field("timers", &self.timers)
            .finish()
    }
}
