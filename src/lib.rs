//! Chat History Export - Extract a bounded window of chat history from a web chat session
//!
//! This library drives a logged-in browser session through the chat web client and turns the
//! lazily loaded message list into structured records. It supports:
//!
//! - Opening a chat by title with bounded retries
//! - Paging history backwards until a message older than a boundary instant is loaded
//! - Aligning message bodies, timestamps, senders and inline images into one record per
//!   message, saving images next to the export
//! - Writing the records to a single JSON file
//!
//! # Example
//!
//! ```no_run
//! use chat_history_export::{ExportConfig, parse_instant, run_export};
//!
//! let boundary = parse_instant("[08:00, 01/01/2024]")?;
//! let config = ExportConfig::new("Family", boundary);
//! let report = run_export(&config)?;
//! println!("Exported {} records to {}", report.records, report.path.display());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod models;
pub mod parsers;
pub mod scraper;
pub mod utils;

// Re-export commonly used types
pub use browser::{BrowserError, BrowserSession, XPath};
pub use config::{ExportConfig, Selectors};
pub use error::{Result, ScrapeError};
pub use exporter::Exporter;
pub use models::{ConversationRecord, MessageRow, MessageWindow, ScrollOutcome};
pub use parsers::{FormatError, Instant, parse_instant};
pub use scraper::{extract_history, run_export};
