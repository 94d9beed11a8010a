use tracing::Span;

use super::images::{ImageProcessingError, ImageStore, RENDER_IMAGE_SCRIPT, decode_data_url};
use crate::browser::{BrowserSession, XPath};
use crate::config::Selectors;
use crate::error::{Result, ScrapeError};
use crate::models::{ConversationRecord, MessageRow, MessageWindow, UNAVAILABLE};
use crate::parsers::parse_instant;

/// Read the message rows under the list container and look up each row's parts inside it.
///
/// Rows without a message body are skipped.
pub fn collect_window<S: BrowserSession>(
    session: &S,
    list: &S::Element,
    selectors: &Selectors,
) -> Result<MessageWindow<S::Element>> {
    let row_nodes = session.find_elements(list, &selectors.message_row())?;
    let (body, timestamp, sender, image) =
        (selectors.message_body(), selectors.timestamp(), selectors.sender(), selectors.image());

    let mut rows = Vec::with_capacity(row_nodes.len());
    for node in &row_nodes {
        let Some(body) = first_match(session, node, &body)? else {
            continue;
        };
        rows.push(MessageRow {
            body,
            timestamp: first_match(session, node, &timestamp)?,
            sender: first_match(session, node, &sender)?,
            image: first_match(session, node, &image)?,
        });
    }

    tracing::debug!(rows = row_nodes.len(), messages = rows.len(), "Collected message window");
    Ok(MessageWindow::new(rows))
}

fn first_match<S: BrowserSession>(
    session: &S,
    parent: &S::Element,
    query: &XPath,
) -> Result<Option<S::Element>> {
    Ok(session.find_elements(parent, query)?.into_iter().next())
}

/// Builds one [`ConversationRecord`] per message row from a stable message window.
pub struct RecordAssembler {
    timestamp_attribute: String,
    images: ImageStore,
    span: Span,
}

impl RecordAssembler {
    pub fn new(selectors: &Selectors, images: ImageStore, span: Span) -> Self {
        Self { timestamp_attribute: selectors.timestamp_attribute.clone(), images, span }
    }

    /// Assemble exactly `cut_index` records from rows `0..cut_index` of `window`.
    ///
    /// Each record takes the timestamp, sender and image found in its own row; a part the
    /// row lacks is unavailable and is never borrowed from a neighbour.
    ///
    /// # Errors
    ///
    /// Fails when the window has fewer than `cut_index` rows, when a present timestamp
    /// does not parse, or on any session error outside image extraction. Image failures are
    /// logged and leave that record without an image.
    pub fn assemble<S: BrowserSession>(
        &self,
        session: &S,
        window: &MessageWindow<S::Element>,
        cut_index: usize,
    ) -> Result<Vec<ConversationRecord>> {
        let _guard = self.span.enter();
        if window.len() < cut_index {
            return Err(ScrapeError::WindowTooShort { expected: cut_index, found: window.len() });
        }

        let mut records = Vec::with_capacity(cut_index);
        let mut image_failures = 0;

        for (i, row) in window.rows()[..cut_index].iter().enumerate() {
            let message = session.text(&row.body)?;

            let timestamp = match &row.timestamp {
                Some(node) => {
                    let text =
                        session.attribute(node, &self.timestamp_attribute)?.unwrap_or_default();
                    Some(parse_instant(&text)?)
                }
                None => None,
            };

            let sender = match &row.sender {
                Some(node) => session.text(node)?,
                None => UNAVAILABLE.to_string(),
            };

            let image = match &row.image {
                Some(node) => match self.extract_image(session, node) {
                    Ok(file_name) => Some(file_name),
                    Err(e) => {
                        image_failures += 1;
                        tracing::error!(index = i, error = %e, "Error processing image");
                        None
                    }
                },
                None => None,
            };

            records.push(ConversationRecord { sender, message, timestamp, image });
        }

        tracing::info!(
            records = records.len(),
            with_timestamp = records.iter().filter(|r| r.timestamp.is_some()).count(),
            with_sender = records.iter().filter(|r| r.has_sender()).count(),
            with_image = records.iter().filter(|r| r.image.is_some()).count(),
            image_failures,
            "Assembled conversation records"
        );

        Ok(records)
    }

    fn extract_image<S: BrowserSession>(
        &self,
        session: &S,
        node: &S::Element,
    ) -> std::result::Result<String, ImageProcessingError> {
        let value = session.execute_script(RENDER_IMAGE_SCRIPT, node)?;
        let url = value.as_str().ok_or(ImageProcessingError::NotDataUrl)?;
        let bytes = decode_data_url(url)?;
        self.images.save(&bytes)
    }
}
