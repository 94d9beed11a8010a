use std::thread;

use tracing::Span;

use crate::browser::{BrowserError, BrowserSession, XPath};
use crate::config::{LocateSettings, Selectors};

/// Finds a chat in the sidebar by title and opens it.
pub struct ChatLocator {
    selectors: Selectors,
    settings: LocateSettings,
    span: Span,
}

impl ChatLocator {
    pub fn new(selectors: &Selectors, settings: LocateSettings, span: Span) -> Self {
        Self { selectors: selectors.clone(), settings, span }
    }

    /// Open the first chat whose title contains `name`.
    ///
    /// Every failure (not found, timeout, stale handle, click rejected) costs one attempt and
    /// a constant delay. Returns `false` once all attempts are spent; without an open chat
    /// nothing downstream is meaningful, so callers treat that as fatal.
    pub fn locate<S: BrowserSession>(&self, session: &S, name: &str) -> bool {
        let _guard = self.span.enter();
        let query = self.selectors.chat_title(name);

        for attempt in 1..=self.settings.retries {
            tracing::debug!(attempt, query = %query, "Locating chat");

            match self.open(session, &query) {
                Ok(title) => {
                    tracing::info!(attempt, title = %title, "Chat opened");
                    return true;
                }
                Err(e) => {
                    tracing::error!(attempt, error = %e, "Error locating chat");
                    if attempt < self.settings.retries {
                        thread::sleep(self.settings.delay);
                    }
                }
            }
        }

        tracing::error!(retries = self.settings.retries, name, "Failed to locate chat");
        false
    }

    fn open<S: BrowserSession>(
        &self,
        session: &S,
        query: &XPath,
    ) -> Result<String, BrowserError> {
        let element = session.wait_for_element(query, self.settings.wait)?;
        let title = session.text(&element)?;
        session.click(&element)?;
        Ok(title)
    }
}
