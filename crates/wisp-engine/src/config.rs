//! Engine Configuration

use std::time::Duration;

/// Engine configuration options
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable JavaScript execution
    pub enable_javascript: bool,

    /// User agent string
    pub user_agent: String,

    /// Longest time clearing an interval waits for a firing in progress
    pub interval_cancel_timeout: Duration,

    /// Execute parser-inserted inline `<script>` elements after a load
    pub run_inline_scripts: bool,

    /// Dispatch `DOMContentLoaded` and `load` once a page is built
    pub dispatch_load_events: bool,
}

impl Config {
    /// Configuration for pages that never run script
    pub fn static_pages() -> Self {
        Self {
            enable_javascript: false,
            run_inline_scripts: false,
            ..Self::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_javascript: true,
            user_agent: format!("Wisp/{}", crate::VERSION),
            interval_cancel_timeout: wisp_js::DEFAULT_CANCEL_TIMEOUT,
            run_inline_scripts: true,
            dispatch_load_events: true,
        }
    }
}
