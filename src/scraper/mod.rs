//! Extraction of a bounded window of chat history from a live browser session
//!
//! Control flow, leaf components first:
//!
//! 1. [`ChatLocator`] opens the chat by title, with constant-delay retries
//! 2. [`BoundaryScroller`] pages history backwards until a message older than the boundary
//!    is loaded and reports how many trailing messages to keep
//! 3. [`collect_window`] re-reads the message rows with their parts, and
//!    [`RecordAssembler`] turns the kept rows into records, saving inline images through
//!    [`ImageStore`]
//! 4. [`crate::exporter::Exporter`] writes the records out
//!
//! # Error Handling Strategy
//!
//! - **Chat lookup**: failures are retried, then reported as a boolean and turned into
//!   [`crate::ScrapeError::ChatNotFound`] by the pipeline.
//! - **Pagination**: transient session errors (stale handles, missing nodes, driver timeouts)
//!   cost one iteration and trigger a re-read; the iteration budget turns an endless chat
//!   into [`crate::ScrapeError::BoundaryNotFound`].
//! - **Records**: image failures are isolated per record; every other failure aborts the run
//!   before anything is exported.

pub mod assembler;
pub mod images;
pub mod locator;
pub mod pipeline;
pub mod scroller;

pub use assembler::{RecordAssembler, collect_window};
pub use images::{ImageProcessingError, ImageStore, decode_data_url};
pub use locator::ChatLocator;
pub use pipeline::{ExportReport, Extraction, extract_history, run_export};
pub use scroller::{BoundaryScroller, cut_index, scan_trailing};
