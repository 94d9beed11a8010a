use serde::{Deserialize, Serialize};

use crate::parsers::Instant;

/// Placeholder for text fields the message window has no node for
pub const UNAVAILABLE: &str = "N/A";

/// One extracted chat message, in export field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub sender: String,
    pub message: String,
    #[serde(rename = "date_time")]
    pub timestamp: Option<Instant>,
    pub image: Option<String>,
}

impl ConversationRecord {
    pub fn has_sender(&self) -> bool {
        self.sender != UNAVAILABLE
    }
}
