//! Data models for extracted chat history.
//!
//! - [`ConversationRecord`] - One exported message (sender, text, timestamp, image file)
//! - [`MessageWindow`] - Message rows read from the page, each with its optional timestamp,
//!   sender and image nodes
//! - [`ScrollOutcome`] - Why the boundary scroller stopped and how many messages to keep

pub mod outcome;
pub mod record;
pub mod window;

pub use outcome::ScrollOutcome;
pub use record::{ConversationRecord, UNAVAILABLE};
pub use window::{MessageRow, MessageWindow};
