//! Export of assembled records to a single JSON file

use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::Span;

use crate::error::Result;
use crate::models::ConversationRecord;
use crate::utils::write_atomic;

const INDENT: &[u8] = b"    ";

/// Serialize `records` as a pretty JSON array with four-space indentation.
///
/// Output depends only on the records, so equal input yields byte-identical files.
pub fn to_json_bytes(records: &[ConversationRecord]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(INDENT));
    records.serialize(&mut serializer)?;
    Ok(bytes)
}

pub struct Exporter {
    span: Span,
}

impl Exporter {
    pub fn new(span: Span) -> Self {
        Self { span }
    }

    /// Write `records` to `path`, replacing any previous export, and log each record.
    pub fn export(&self, path: &Path, records: &[ConversationRecord]) -> Result<()> {
        let _guard = self.span.enter();
        let bytes = to_json_bytes(records)?;
        write_atomic(path, &bytes)?;

        for record in records {
            let date_time = record.timestamp.map(|t| t.to_iso8601());
            tracing::info!(
                sender = %record.sender,
                date_time = date_time.as_deref().unwrap_or("N/A"),
                image = record.image.as_deref().unwrap_or(""),
                message = %record.message,
                "Exported record"
            );
        }
        tracing::info!(path = %path.display(), records = records.len(), "Conversation data saved");

        Ok(())
    }
}
