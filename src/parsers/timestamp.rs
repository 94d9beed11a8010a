use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of characters in a `[HH:MM, DD/MM/YYYY]` timestamp
pub const TIMESTAMP_WIDTH: usize = 19;

const TIMESTAMP_FORMAT: &str = "[%H:%M, %d/%m/%Y]";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("timestamp \"{input}\" is shorter than 19 characters")]
    TooShort { input: String },

    #[error("timestamp \"{input}\" does not match [HH:MM, DD/MM/YYYY]: {source}")]
    Pattern {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Minute-precision point in time as shown by the chat client.
///
/// Serializes as ISO-8601 without an offset (`2024-01-02T09:15:00`); the chat client renders
/// local wall-clock time and carries no zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(NaiveDateTime);

impl Instant {
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

impl From<NaiveDateTime> for Instant {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

/// Parse the leading `[HH:MM, DD/MM/YYYY]` of `text`.
///
/// Anything after the first 19 characters (the sender annotation the chat client appends to
/// its metadata attribute) is ignored. Inputs shorter than that, or whose prefix does not
/// match the pattern, fail with [`FormatError`]; no default instant is ever substituted.
pub fn parse_instant(text: &str) -> Result<Instant, FormatError> {
    let prefix: String = text.chars().take(TIMESTAMP_WIDTH).collect();
    if prefix.chars().count() < TIMESTAMP_WIDTH {
        return Err(FormatError::TooShort { input: text.to_string() });
    }

    NaiveDateTime::parse_from_str(&prefix, TIMESTAMP_FORMAT)
        .map(Instant)
        .map_err(|source| FormatError::Pattern { input: prefix, source })
}
