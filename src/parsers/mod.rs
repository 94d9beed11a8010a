//! Parsers for text rendered by the chat client
//!
//! Timestamps are the only structured text the extraction depends on. A parse failure is
//! never recovered locally: it means the client's markup no longer matches what the
//! selectors expect, so callers propagate it and abort the run.

pub mod timestamp;

pub use timestamp::{FormatError, Instant, TIMESTAMP_WIDTH, parse_instant};
