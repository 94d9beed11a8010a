//! Run configuration
//!
//! Everything the extraction needs is carried by [`ExportConfig`]; the CLI builds it from
//! flags and environment variables. DOM selectors default to the markup of the chat web
//! client and can be overridden from a JSON file when that markup changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::{WebDriverSettings, XPath};
use crate::error::{Result, ScrapeError};
use crate::parsers::Instant;
use crate::utils::xpath_literal;

pub const CHAT_URL: &str = "https://web.whatsapp.com/";
pub const EXPORT_FILENAME: &str = "conversation_data.json";
pub const IMAGES_DIRNAME: &str = "images";
pub const DEFAULT_OUTPUT_DIR: &str = "data";

/// Bounded wait for key elements (chat title, message list)
pub const ELEMENT_WAIT: Duration = Duration::from_secs(20);

const CHAT_NAME_PLACEHOLDER: &str = "{name}";

/// XPath expressions locating the parts of the chat UI.
///
/// `message_row` and `timestamp` are evaluated relative to the message list container. The
/// body, timestamp, sender and image queries are also evaluated relative to one message row,
/// where the first match is used. A row holds at most one timestamp node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Chat entry in the sidebar; `{name}` is replaced by the quoted chat name
    pub chat_title: String,
    pub message_list: String,
    /// One rendered message; rows without a body (date dividers, notices) are skipped
    pub message_row: String,
    pub message_body: String,
    pub timestamp: String,
    /// Attribute on the timestamp node holding `[HH:MM, DD/MM/YYYY] Sender: `
    pub timestamp_attribute: String,
    pub sender: String,
    pub image: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            chat_title: "//span[contains(@title, {name})]".to_string(),
            message_list: r#"//div[contains(@class, "x3psx0u xwib8y2 xkhd6sd xrmvbpv")]"#
                .to_string(),
            message_row: r#".//div[@role="row"]"#.to_string(),
            message_body: r#".//div[contains(@class, "_akbu")]"#.to_string(),
            timestamp: r#".//div[contains(@class, "copyable-text")]"#.to_string(),
            timestamp_attribute: "data-pre-plain-text".to_string(),
            sender: r#".//span[contains(@class, "_ahx_")]"#.to_string(),
            image: r#".//img[@class="x15kfjtz x1c4vz4f x2lah0s xdl72j9 x127lhb5 x4afe7t xa3vuyk x10e4vud"]"#
                .to_string(),
        }
    }
}

impl Selectors {
    /// Load selectors from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ScrapeError::io("Failed to read selectors file", path, e))?;
        let selectors: Selectors = serde_json::from_str(&content)?;
        if !selectors.chat_title.contains(CHAT_NAME_PLACEHOLDER) {
            return Err(ScrapeError::Config(format!(
                "chat_title selector must contain {}",
                CHAT_NAME_PLACEHOLDER
            )));
        }
        Ok(selectors)
    }

    /// Chat title query matching any title that contains `name`
    pub fn chat_title(&self, name: &str) -> XPath {
        XPath::new(self.chat_title.replace(CHAT_NAME_PLACEHOLDER, &xpath_literal(name)))
    }

    pub fn message_list(&self) -> XPath {
        XPath::new(&self.message_list)
    }

    pub fn message_row(&self) -> XPath {
        XPath::new(&self.message_row)
    }

    pub fn message_body(&self) -> XPath {
        XPath::new(&self.message_body)
    }

    pub fn timestamp(&self) -> XPath {
        XPath::new(&self.timestamp)
    }

    pub fn sender(&self) -> XPath {
        XPath::new(&self.sender)
    }

    pub fn image(&self) -> XPath {
        XPath::new(&self.image)
    }
}

/// Chat locator retry policy. The delay is constant per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateSettings {
    pub retries: u32,
    pub delay: Duration,
    pub wait: Duration,
}

impl Default for LocateSettings {
    fn default() -> Self {
        Self { retries: 3, delay: Duration::from_secs(2), wait: ELEMENT_WAIT }
    }
}

/// How long to wait for lazy rendering after a scroll trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(250), timeout: Duration::from_secs(5) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSettings {
    /// Upper bound on backward pagination triggers
    pub max_iterations: u32,
    /// Consecutive triggers that load nothing new before history counts as exhausted
    pub stall_limit: u32,
    pub settle: SettleSettings,
    /// Pause after scrolling each kept message into view during the final scan
    pub scan_pause: Duration,
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            stall_limit: 3,
            settle: SettleSettings::default(),
            scan_pause: Duration::from_secs(1),
        }
    }
}

/// Complete configuration of one export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub chat_name: String,
    /// Oldest message instant to keep
    pub boundary: Instant,
    pub output_dir: PathBuf,
    pub chat_url: String,
    /// Bounded wait for the message list once the chat is open
    pub element_wait: Duration,
    pub webdriver: WebDriverSettings,
    /// Spawn this chromedriver binary instead of connecting to a running one
    pub chromedriver: Option<PathBuf>,
    pub selectors: Selectors,
    pub locate: LocateSettings,
    pub scroll: ScrollSettings,
}

impl ExportConfig {
    pub fn new(chat_name: impl Into<String>, boundary: Instant) -> Self {
        Self {
            chat_name: chat_name.into(),
            boundary,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            chat_url: CHAT_URL.to_string(),
            element_wait: ELEMENT_WAIT,
            webdriver: WebDriverSettings::default(),
            chromedriver: None,
            selectors: Selectors::default(),
            locate: LocateSettings::default(),
            scroll: ScrollSettings::default(),
        }
    }

    pub fn export_path(&self) -> PathBuf {
        self.output_dir.join(EXPORT_FILENAME)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIRNAME)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::parsers::parse_instant;

    #[test]
    fn test_chat_title_quotes_name() {
        let selectors = Selectors::default();
        assert_eq!(
            selectors.chat_title("Family").as_str(),
            r#"//span[contains(@title, "Family")]"#
        );
        assert_eq!(
            selectors.chat_title(r#"The "A" team"#).as_str(),
            r#"//span[contains(@title, 'The "A" team')]"#
        );
    }

    #[test]
    fn test_selectors_partial_override() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("selectors.json");
        fs::write(&path, r#"{"sender": ".//span[@data-sender]"}"#).unwrap();

        let selectors = Selectors::from_file(&path).unwrap();
        assert_eq!(selectors.sender, ".//span[@data-sender]");
        assert_eq!(selectors.timestamp_attribute, "data-pre-plain-text");
    }

    #[test]
    fn test_selectors_reject_title_without_placeholder() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("selectors.json");
        fs::write(&path, r#"{"chat_title": "//span[@title]"}"#).unwrap();

        let err = Selectors::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("{name}"));
    }

    #[test]
    fn test_selectors_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("selectors.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(Selectors::from_file(&path), Err(ScrapeError::Serialization(_))));
    }

    #[test]
    fn test_export_config_paths() {
        let boundary = parse_instant("[08:06, 01/01/2024]").unwrap();
        let mut config = ExportConfig::new("Family", boundary);
        config.output_dir = PathBuf::from("/tmp/out");

        assert_eq!(config.export_path(), PathBuf::from("/tmp/out/conversation_data.json"));
        assert_eq!(config.images_dir(), PathBuf::from("/tmp/out/images"));
        assert_eq!(config.locate.retries, 3);
        assert_eq!(config.locate.delay, Duration::from_secs(2));
    }
}
