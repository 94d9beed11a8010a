//! Browser session primitives the extraction depends on
//!
//! The scraper only talks to the page through [`BrowserSession`]. The production
//! implementation is [`WebDriverSession`], a synchronous W3C WebDriver client; tests drive
//! the same code with an in-memory session.
//!
//! # Error Handling Strategy
//!
//! Every primitive is a blocking round-trip that may fail independently. Element handles can
//! go stale between a read and its use because the chat client mutates the list on its own,
//! so callers re-query collections after every scroll instead of caching handles.

pub mod driver_process;
pub mod webdriver;

use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub use driver_process::DriverProcess;
pub use webdriver::{WebDriverSession, WebDriverSettings};

/// Structural element query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XPath(String);

impl XPath {
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no element matches {query}")]
    NotFound { query: String },

    #[error("stale element reference")]
    StaleElement,

    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("webdriver error \"{error}\": {message}")]
    Protocol { error: String, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid webdriver response: {0}")]
    InvalidResponse(String),

    #[error("driver process error: {0}")]
    Driver(String),

    #[error("session already closed")]
    Closed,
}

impl BrowserError {
    /// Whether retrying after re-querying the page can help
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BrowserError::NotFound { .. }
                | BrowserError::StaleElement
                | BrowserError::Timeout { .. }
        )
    }
}

/// Blocking access to one live browser session.
pub trait BrowserSession {
    /// Opaque handle to a realized element
    type Element: Clone + fmt::Debug;

    fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Find the first element matching `query` anywhere in the document, polling until it
    /// appears or `timeout` elapses.
    fn wait_for_element(&self, query: &XPath, timeout: Duration)
    -> Result<Self::Element, BrowserError>;

    /// All elements matching `query` relative to `parent`, in document order.
    fn find_elements(
        &self,
        parent: &Self::Element,
        query: &XPath,
    ) -> Result<Vec<Self::Element>, BrowserError>;

    fn text(&self, element: &Self::Element) -> Result<String, BrowserError>;

    fn attribute(&self, element: &Self::Element, name: &str)
    -> Result<Option<String>, BrowserError>;

    fn scroll_into_view(&self, element: &Self::Element) -> Result<(), BrowserError>;

    /// Run `script` with `element` bound to `arguments[0]` and return its result.
    fn execute_script(
        &self,
        script: &str,
        element: &Self::Element,
    ) -> Result<serde_json::Value, BrowserError>;

    fn click(&self, element: &Self::Element) -> Result<(), BrowserError>;

    /// Tear the session down. Calling it more than once is a no-op.
    fn quit(&self) -> Result<(), BrowserError>;
}
