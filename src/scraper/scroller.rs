use std::convert::Infallible;
use std::thread;
use std::time::Instant as Clock;

use tracing::Span;

use crate::browser::BrowserSession;
use crate::config::{ScrollSettings, Selectors};
use crate::error::{Result, ScrapeError};
use crate::models::ScrollOutcome;
use crate::parsers::{Instant, parse_instant};

/// Walk `items` from the most recent (last) upward and return the position of the first one
/// older than `target`, i.e. the count of trailing items at or after it.
///
/// `keep` runs for every item passed on the way up. Returns `None` when nothing is older.
pub fn scan_trailing<T, E>(
    items: &[T],
    target: Instant,
    mut instant_of: impl FnMut(&T) -> std::result::Result<Instant, E>,
    mut keep: impl FnMut(&T) -> std::result::Result<(), E>,
) -> std::result::Result<Option<usize>, E> {
    for (position, item) in items.iter().rev().enumerate() {
        if instant_of(item)? < target {
            return Ok(Some(position));
        }
        keep(item)?;
    }
    Ok(None)
}

/// Count of trailing instants at or after `target`, or `None` if none is older.
pub fn cut_index(instants: &[Instant], target: Instant) -> Option<usize> {
    let scanned = scan_trailing(instants, target, |i| Ok::<_, Infallible>(*i), |_| Ok(()));
    match scanned {
        Ok(cut) => cut,
        Err(never) => match never {},
    }
}

/// Drives backward pagination of the message list until a message older than the boundary
/// has been realized.
///
/// Scrolling the topmost timestamp node into view makes the chat client render older
/// history above it. Once the topmost message is older than the boundary, the cut point lies
/// somewhere inside the loaded collection, and a scan from the bottom locates it without
/// triggering further loads.
pub struct BoundaryScroller {
    selectors: Selectors,
    settings: ScrollSettings,
    span: Span,
}

impl BoundaryScroller {
    pub fn new(selectors: &Selectors, settings: ScrollSettings, span: Span) -> Self {
        Self { selectors: selectors.clone(), settings, span }
    }

    /// Load history until a message older than `target` is present.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::BoundaryNotFound`] when the iteration budget runs out while the list
    ///   is still growing
    /// - [`ScrapeError::Format`] when a timestamp node carries an unparseable attribute
    /// - [`ScrapeError::Browser`] for non-transient session failures
    pub fn load_until<S: BrowserSession>(
        &self,
        session: &S,
        list: &S::Element,
        target: Instant,
    ) -> Result<ScrollOutcome> {
        let _guard = self.span.enter();
        let query = self.selectors.timestamp();
        let mut previous: Option<(usize, Instant)> = None;
        let mut stalls = 0;
        let mut loaded = 0;

        for iteration in 1..=self.settings.max_iterations {
            let nodes = session.find_elements(list, &query)?;
            loaded = nodes.len();
            if nodes.is_empty() {
                tracing::debug!("No more messages found");
                return Ok(ScrollOutcome::NoHistory);
            }

            let current = match self.read_instant(session, &nodes[0]) {
                Ok(instant) => instant,
                Err(ScrapeError::Browser(e)) if e.is_transient() => {
                    tracing::debug!(iteration, error = %e, "Topmost message unreadable");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if current < target {
                match self.scan_loaded(session, &nodes, target) {
                    Ok(cut_index) => {
                        tracing::info!(iteration, loaded, cut_index, "Boundary reached");
                        return Ok(ScrollOutcome::BoundaryReached { cut_index });
                    }
                    Err(ScrapeError::Browser(e)) if e.is_transient() => {
                        tracing::debug!(iteration, error = %e, "Scan interrupted, re-reading");
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            if previous == Some((loaded, current)) {
                stalls += 1;
                if stalls >= self.settings.stall_limit {
                    tracing::info!(iteration, loaded, "History exhausted before the boundary");
                    return Ok(ScrollOutcome::HistoryExhausted { cut_index: loaded });
                }
            } else {
                stalls = 0;
            }
            previous = Some((loaded, current));

            tracing::info!(iteration, loaded, oldest = %current, "Loading older messages...");
            match session.scroll_into_view(&nodes[0]) {
                Ok(()) => {}
                Err(e) if e.is_transient() => {
                    tracing::debug!(iteration, error = %e, "Scroll trigger missed");
                }
                Err(e) => return Err(e.into()),
            }
            self.wait_for_settle(session, list, loaded)?;
        }

        tracing::warn!(iterations = self.settings.max_iterations, loaded, "Scroll budget spent");
        Err(ScrapeError::BoundaryNotFound { iterations: self.settings.max_iterations, loaded })
    }

    fn read_instant<S: BrowserSession>(&self, session: &S, node: &S::Element) -> Result<Instant> {
        let text = session
            .attribute(node, &self.selectors.timestamp_attribute)?
            .unwrap_or_default();
        Ok(parse_instant(&text)?)
    }

    /// Scan the loaded collection bottom-up, bringing each kept message into view.
    fn scan_loaded<S: BrowserSession>(
        &self,
        session: &S,
        nodes: &[S::Element],
        target: Instant,
    ) -> Result<usize> {
        let found = scan_trailing(
            nodes,
            target,
            |node| self.read_instant(session, node),
            |node| -> Result<()> {
                session.scroll_into_view(node)?;
                thread::sleep(self.settings.scan_pause);
                Ok(())
            },
        )?;
        // The topmost node was just verified older than the target
        Ok(found.unwrap_or(0))
    }

    /// Poll the collection length until it has grown past `before` and held steady for two
    /// consecutive polls, or the settle timeout passes.
    fn wait_for_settle<S: BrowserSession>(
        &self,
        session: &S,
        list: &S::Element,
        before: usize,
    ) -> Result<usize> {
        let query = self.selectors.timestamp();
        let settle = self.settings.settle;
        let deadline = Clock::now() + settle.timeout;
        let mut last: Option<usize> = None;

        loop {
            thread::sleep(settle.poll_interval);
            let count = match session.find_elements(list, &query) {
                Ok(nodes) => Some(nodes.len()),
                Err(e) if e.is_transient() => None,
                Err(e) => return Err(e.into()),
            };

            if let (Some(count), Some(prev)) = (count, last) {
                if count == prev && count > before {
                    return Ok(count);
                }
            }
            if Clock::now() >= deadline {
                tracing::debug!(before, last = ?count, "Settle timeout");
                return Ok(count.unwrap_or(before));
            }
            last = count;
        }
    }
}
