//! Error types shared across the extraction pipeline.
//!
//! # Error Handling Strategy
//!
//! - [`FormatError`] is fatal wherever it surfaces outside the per-image isolation boundary:
//!   an unparseable timestamp means the chat client's markup changed.
//! - Chat lookup failures are folded into a boolean by the locator and surface here as
//!   [`ScrapeError::ChatNotFound`].
//! - Image failures never reach this type; the assembler logs them and leaves the record's
//!   image empty.
//! - Every other failure while reading a record aborts the run. No partial export is written.

use std::path::PathBuf;

use thiserror::Error;

use crate::browser::BrowserError;
use crate::parsers::FormatError;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("timestamp format error: {0}")]
    Format(#[from] FormatError),

    #[error("chat \"{name}\" not found after {attempts} attempts")]
    ChatNotFound { name: String, attempts: u32 },

    #[error(
        "boundary not reached after {iterations} scroll iterations ({loaded} timestamped messages loaded)"
    )]
    BoundaryNotFound { iterations: u32, loaded: usize },

    #[error("message window holds {found} messages but {expected} were requested")]
    WindowTooShort { expected: usize, found: usize },

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("{context}: {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { context, path: path.into(), source }
    }
}

/// Result type alias using [`ScrapeError`]
pub type Result<T> = std::result::Result<T, ScrapeError>;
