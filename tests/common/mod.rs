//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chat_history_export::config::{ExportConfig, Selectors, SettleSettings};
use chat_history_export::{BrowserError, BrowserSession, XPath, parse_instant};
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::Value;

const TITLE_PREFIX: &str = "//span[contains(@title, \"";
const TITLE_SUFFIX: &str = "\")]";

/// `[HH:MM, 01/01/2024]` for the given minute offset from 08:00
pub fn stamp_at(minutes_after_eight: u32) -> String {
    let total = 8 * 60 + minutes_after_eight;
    format!("[{:02}:{:02}, 01/01/2024]", total / 60, total % 60)
}

/// Data URL of a 1x1 PNG
pub fn png_data_url() -> String {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(1, 1, Rgba([0, 128, 255, 255]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

/// Configuration with every wait and pause set to zero
pub fn fast_config(chat_name: &str, boundary: &str, output_dir: &Path) -> ExportConfig {
    let mut config = ExportConfig::new(chat_name, parse_instant(boundary).unwrap());
    config.output_dir = output_dir.to_path_buf();
    config.element_wait = Duration::ZERO;
    config.locate.delay = Duration::ZERO;
    config.locate.wait = Duration::ZERO;
    config.scroll.max_iterations = 50;
    config.scroll.scan_pause = Duration::ZERO;
    config.scroll.settle =
        SettleSettings { poll_interval: Duration::ZERO, timeout: Duration::ZERO };
    config
}

#[derive(Debug, Clone)]
pub enum FakeImage {
    DataUrl(String),
    /// Script result that is not a data URL
    Garbage(Value),
    /// Script execution fails in the browser
    ScriptError,
}

/// One message in the simulated chat
#[derive(Debug, Clone)]
pub struct FakeMessage {
    /// `None` for rows without a message body, such as date dividers
    pub text: Option<String>,
    pub sender: Option<String>,
    pub stamp: Option<String>,
    pub image: Option<FakeImage>,
}

impl FakeMessage {
    /// Message with a timestamp header and a sender label
    pub fn new(stamp: &str, sender: &str, text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            sender: Some(sender.to_string()),
            stamp: Some(stamp.to_string()),
            image: None,
        }
    }

    /// Message with neither timestamp header nor sender label
    pub fn bare(text: &str) -> Self {
        Self { text: Some(text.to_string()), sender: None, stamp: None, image: None }
    }

    /// Row without a message body
    pub fn divider() -> Self {
        Self { text: None, sender: None, stamp: None, image: None }
    }

    pub fn with_sender(mut self, sender: &str) -> Self {
        self.sender = Some(sender.to_string());
        self
    }

    pub fn without_sender(mut self) -> Self {
        self.sender = None;
        self
    }

    pub fn with_image(mut self, image: FakeImage) -> Self {
        self.image = Some(image);
        self
    }
}

/// Element handles of the simulated page, keyed by absolute message index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeElement {
    ChatTitle(String),
    List,
    Row(usize),
    Body(usize),
    Stamp(usize),
    Sender(usize),
    Image(usize),
}

#[derive(Debug, Default)]
struct FakeState {
    loaded: usize,
    opened: Option<String>,
    navigated: Vec<String>,
    title_lookups: u32,
    click_failures: u32,
    stale_attribute_reads: u32,
    stale_scrolls: u32,
    /// Messages realized by the last trigger but not rendered yet
    pending: usize,
    /// Timestamp queries left before `pending` is rendered
    pending_polls: u32,
    timestamp_queries: u32,
    scrolled: Vec<FakeElement>,
    quit: bool,
}

/// In-memory chat page: the last `loaded` messages are realized, and scrolling the topmost
/// timestamp node into view realizes `page_size` more above it, optionally only after a
/// number of further timestamp queries.
pub struct FakeSession {
    chats: Vec<String>,
    messages: Vec<FakeMessage>,
    page_size: usize,
    render_polls: u32,
    selectors: Selectors,
    state: RefCell<FakeState>,
}

impl FakeSession {
    pub fn new(chat: &str, messages: Vec<FakeMessage>) -> Self {
        let loaded = messages.len();
        Self {
            chats: vec![chat.to_string()],
            messages,
            page_size: 0,
            render_polls: 0,
            selectors: Selectors::default(),
            state: RefCell::new(FakeState { loaded, ..FakeState::default() }),
        }
    }

    /// Realize only the newest `initial` messages and load `page_size` more per trigger
    pub fn lazy(mut self, initial: usize, page_size: usize) -> Self {
        self.page_size = page_size;
        self.state.borrow_mut().loaded = initial.min(self.messages.len());
        self
    }

    /// Render each loaded page only on the `polls`-th timestamp query after its trigger
    pub fn render_after_polls(mut self, polls: u32) -> Self {
        self.render_polls = polls;
        self
    }

    pub fn with_chat(mut self, title: &str) -> Self {
        self.chats.push(title.to_string());
        self
    }

    /// Reject the next `count` clicks with a stale element error
    pub fn failing_clicks(self, count: u32) -> Self {
        self.state.borrow_mut().click_failures = count;
        self
    }

    /// Fail the next `count` attribute reads with a stale element error
    pub fn stale_attribute_reads(self, count: u32) -> Self {
        self.state.borrow_mut().stale_attribute_reads = count;
        self
    }

    /// Fail the next `count` scroll triggers with a stale element error
    pub fn stale_scrolls(self, count: u32) -> Self {
        self.state.borrow_mut().stale_scrolls = count;
        self
    }

    /// The chat list element, opening `chat` first
    pub fn open_list(&self) -> FakeElement {
        let chat = self.chats[0].clone();
        self.state.borrow_mut().opened = Some(chat);
        FakeElement::List
    }

    pub fn loaded(&self) -> usize {
        self.state.borrow().loaded
    }

    pub fn opened(&self) -> Option<String> {
        self.state.borrow().opened.clone()
    }

    pub fn navigated(&self) -> Vec<String> {
        self.state.borrow().navigated.clone()
    }

    pub fn title_lookups(&self) -> u32 {
        self.state.borrow().title_lookups
    }

    pub fn scrolled(&self) -> Vec<FakeElement> {
        self.state.borrow().scrolled.clone()
    }

    pub fn timestamp_queries(&self) -> u32 {
        self.state.borrow().timestamp_queries
    }

    pub fn is_quit(&self) -> bool {
        self.state.borrow().quit
    }

    fn first_realized(&self) -> usize {
        self.messages.len() - self.state.borrow().loaded
    }

    fn realized(
        &self,
        keep: impl Fn(&FakeMessage) -> bool,
        make: fn(usize) -> FakeElement,
    ) -> Vec<FakeElement> {
        (self.first_realized()..self.messages.len())
            .filter(|&i| keep(&self.messages[i]))
            .map(make)
            .collect()
    }

    fn render_pending(&self) {
        let mut state = self.state.borrow_mut();
        state.timestamp_queries += 1;
        if state.pending == 0 {
            return;
        }
        state.pending_polls = state.pending_polls.saturating_sub(1);
        if state.pending_polls == 0 {
            state.loaded = (state.loaded + state.pending).min(self.messages.len());
            state.pending = 0;
        }
    }
}

impl BrowserSession for FakeSession {
    type Element = FakeElement;

    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.state.borrow_mut().navigated.push(url.to_string());
        Ok(())
    }

    fn wait_for_element(
        &self,
        query: &XPath,
        _timeout: Duration,
    ) -> Result<FakeElement, BrowserError> {
        let timeout = || BrowserError::Timeout { what: query.to_string(), seconds: 0 };

        if *query == self.selectors.message_list() {
            return match self.state.borrow().opened {
                Some(_) => Ok(FakeElement::List),
                None => Err(timeout()),
            };
        }

        let needle = query
            .as_str()
            .strip_prefix(TITLE_PREFIX)
            .and_then(|rest| rest.strip_suffix(TITLE_SUFFIX))
            .ok_or_else(|| BrowserError::NotFound { query: query.to_string() })?;
        self.state.borrow_mut().title_lookups += 1;
        self.chats
            .iter()
            .find(|title| title.contains(needle))
            .map(|title| FakeElement::ChatTitle(title.clone()))
            .ok_or_else(timeout)
    }

    fn find_elements(
        &self,
        parent: &FakeElement,
        query: &XPath,
    ) -> Result<Vec<FakeElement>, BrowserError> {
        let s = &self.selectors;
        let elements = match parent {
            FakeElement::List if *query == s.message_row() => {
                self.realized(|_| true, FakeElement::Row)
            }
            FakeElement::List if *query == s.timestamp() => {
                self.render_pending();
                self.realized(|m| m.stamp.is_some(), FakeElement::Stamp)
            }
            FakeElement::Row(i) => {
                let message = &self.messages[*i];
                let part = if *query == s.message_body() {
                    message.text.as_ref().map(|_| FakeElement::Body(*i))
                } else if *query == s.timestamp() {
                    message.stamp.as_ref().map(|_| FakeElement::Stamp(*i))
                } else if *query == s.sender() {
                    message.sender.as_ref().map(|_| FakeElement::Sender(*i))
                } else if *query == s.image() {
                    message.image.as_ref().map(|_| FakeElement::Image(*i))
                } else {
                    None
                };
                part.into_iter().collect()
            }
            _ => Vec::new(),
        };
        Ok(elements)
    }

    fn text(&self, element: &FakeElement) -> Result<String, BrowserError> {
        Ok(match element {
            FakeElement::ChatTitle(title) => title.clone(),
            FakeElement::Body(i) => self.messages[*i].text.clone().unwrap_or_default(),
            FakeElement::Sender(i) => self.messages[*i].sender.clone().unwrap_or_default(),
            _ => String::new(),
        })
    }

    fn attribute(&self, element: &FakeElement, name: &str) -> Result<Option<String>, BrowserError> {
        {
            let mut state = self.state.borrow_mut();
            if state.stale_attribute_reads > 0 {
                state.stale_attribute_reads -= 1;
                return Err(BrowserError::StaleElement);
            }
        }

        match element {
            FakeElement::Stamp(i) if name == self.selectors.timestamp_attribute => {
                let message = &self.messages[*i];
                Ok(message.stamp.as_ref().map(|stamp| {
                    format!("{} {}: ", stamp, message.sender.as_deref().unwrap_or("Unknown"))
                }))
            }
            _ => Ok(None),
        }
    }

    fn scroll_into_view(&self, element: &FakeElement) -> Result<(), BrowserError> {
        let first = self.first_realized();
        let mut state = self.state.borrow_mut();
        if state.stale_scrolls > 0 {
            state.stale_scrolls -= 1;
            return Err(BrowserError::StaleElement);
        }
        state.scrolled.push(element.clone());

        let topmost_stamp =
            (first..self.messages.len()).find(|&i| self.messages[i].stamp.is_some());
        if let FakeElement::Stamp(i) = element {
            if Some(*i) == topmost_stamp && state.pending == 0 {
                if self.render_polls == 0 {
                    state.loaded = (state.loaded + self.page_size).min(self.messages.len());
                } else {
                    state.pending = self.page_size;
                    state.pending_polls = self.render_polls;
                }
            }
        }
        Ok(())
    }

    fn execute_script(&self, _script: &str, element: &FakeElement) -> Result<Value, BrowserError> {
        let FakeElement::Image(i) = element else {
            return Ok(Value::Null);
        };
        match &self.messages[*i].image {
            Some(FakeImage::DataUrl(url)) => Ok(Value::String(url.clone())),
            Some(FakeImage::Garbage(value)) => Ok(value.clone()),
            Some(FakeImage::ScriptError) | None => Err(BrowserError::Protocol {
                error: "javascript error".to_string(),
                message: "canvas is tainted".to_string(),
            }),
        }
    }

    fn click(&self, element: &FakeElement) -> Result<(), BrowserError> {
        let mut state = self.state.borrow_mut();
        if state.click_failures > 0 {
            state.click_failures -= 1;
            return Err(BrowserError::StaleElement);
        }
        if let FakeElement::ChatTitle(title) = element {
            state.opened = Some(title.clone());
        }
        Ok(())
    }

    fn quit(&self) -> Result<(), BrowserError> {
        self.state.borrow_mut().quit = true;
        Ok(())
    }
}
