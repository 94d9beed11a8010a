/// Element handles of one rendered message row.
///
/// Only the body is required. Consecutive messages from one sender omit the timestamp
/// header and the sender label, and only image messages have an image node, so the other
/// parts are looked up inside the row and are absent when the row has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow<E> {
    pub body: E,
    pub timestamp: Option<E>,
    pub sender: Option<E>,
    pub image: Option<E>,
}

impl<E> MessageRow<E> {
    pub fn new(body: E) -> Self {
        Self { body, timestamp: None, sender: None, image: None }
    }

    pub fn is_stamped(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Message rows currently realized in the message list, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageWindow<E> {
    rows: Vec<MessageRow<E>>,
}

impl<E: Clone> MessageWindow<E> {
    pub fn new(rows: Vec<MessageRow<E>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MessageRow<E>] {
        &self.rows
    }

    /// Number of message rows, which bounds the number of records
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows carrying a timestamp header
    pub fn stamped(&self) -> usize {
        self.rows.iter().filter(|row| row.is_stamped()).count()
    }

    /// Keep the rows from the `count`-th timestamped row, counted from the newest, through
    /// the end of the window.
    ///
    /// Header-less rows below a kept timestamped row are continuations of it and are kept
    /// with it. `count == 0` keeps nothing. Returns `None` when fewer than `count` rows are
    /// timestamped.
    pub fn trailing_stamped(&self, count: usize) -> Option<Self> {
        if count == 0 {
            return Some(Self::new(Vec::new()));
        }

        let (start, _) = self
            .rows
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, row)| row.is_stamped())
            .nth(count - 1)?;
        Some(Self::new(self.rows[start..].to_vec()))
    }
}
