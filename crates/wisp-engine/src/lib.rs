//! Wisp Engine
//!
//! A headless browser engine: HTML in, live DOM out, with scripts, timers
//! and async completions serialized against the document the way a browser
//! serializes them against its main thread.
//!
//! # Example
//! ```rust,no_run
//! use wisp_engine::{Config, Engine};
//!
//! let engine = Engine::new(Config::default());
//! let page = engine.load_html("https://example.com/", "<p id=hi>Hello</p>")?;
//! let hi = page.with_document(|doc| doc.get_element_by_id("hi"))?;
//! # Ok::<(), wisp_engine::EngineError>(())
//! ```

mod config;
mod engine;
mod page;

pub use config::Config;
pub use engine::{Engine, EngineError};
pub use page::Page;

// Re-export sub-crates for advanced usage
pub use wisp_dom as dom;
pub use wisp_html as html;
pub use wisp_js as js;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
