use serde::Serialize;

/// How the boundary scroller stopped.
///
/// Running out of scroll budget is not an outcome; it is reported as
/// [`crate::ScrapeError::BoundaryNotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScrollOutcome {
    /// The message list holds no timestamped message at all
    NoHistory,
    /// A message older than the boundary is loaded; `cut_index` trailing messages are kept
    BoundaryReached { cut_index: usize },
    /// The list stopped growing before anything older than the boundary appeared
    HistoryExhausted { cut_index: usize },
}

impl ScrollOutcome {
    /// Count of trailing messages at or after the boundary
    pub fn cut_index(&self) -> usize {
        match self {
            ScrollOutcome::NoHistory => 0,
            ScrollOutcome::BoundaryReached { cut_index }
            | ScrollOutcome::HistoryExhausted { cut_index } => *cut_index,
        }
    }
}
