//! Synchronous W3C WebDriver client for a Chrome session

use std::cell::Cell;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use reqwest::Method;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{BrowserError, BrowserSession, XPath};

/// W3C key identifying an element reference in JSON payloads
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const SCROLL_INTO_VIEW_SCRIPT: &str = "arguments[0].scrollIntoView(true);";

#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    pub webdriver_url: String,
    pub profile_dir: Option<PathBuf>,
    pub headless: bool,
    pub script_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            profile_dir: None,
            headless: false,
            script_timeout: Duration::from_secs(900),
            request_timeout: Duration::from_secs(960),
        }
    }
}

/// Element reference returned by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebElement {
    id: String,
}

impl WebElement {
    fn to_json(&self) -> Value {
        json!({ ELEMENT_KEY: self.id })
    }

    fn from_json(value: &Value) -> Result<Self, BrowserError> {
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| Self { id: id.to_string() })
            .ok_or_else(|| BrowserError::InvalidResponse(format!("not an element: {}", value)))
    }
}

#[derive(Deserialize)]
struct Envelope {
    value: Value,
}

#[derive(Deserialize)]
struct ErrorValue {
    error: String,
    #[serde(default)]
    message: String,
}

/// One Chrome session driven over HTTP.
///
/// The session is deleted by [`BrowserSession::quit`] or, failing that, when dropped.
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
    script_timeout: Duration,
    closed: Cell<bool>,
}

impl WebDriverSession {
    /// Create a new Chrome session on the driver at `settings.webdriver_url`.
    pub fn start(settings: &WebDriverSettings) -> Result<Self, BrowserError> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        let base_url = settings.webdriver_url.trim_end_matches('/').to_string();

        let mut args = vec!["--disable-search-engine-choice-screen".to_string()];
        if let Some(profile) = &settings.profile_dir {
            args.push(format!("user-data-dir={}", profile.display()));
        }
        if settings.headless {
            args.push("--headless=new".to_string());
        }

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args },
                    "timeouts": { "script": settings.script_timeout.as_millis() as u64 }
                }
            }
        });

        let session_url = format!("{}/session", base_url);
        let value = send(
            &client,
            Method::POST,
            &session_url,
            Some(capabilities),
            settings.script_timeout,
        )?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::InvalidResponse("missing sessionId".to_string()))?
            .to_string();

        tracing::info!(session_id = %session_id, driver = %base_url, "Browser session started");

        Ok(Self {
            client,
            base_url,
            session_id,
            script_timeout: settings.script_timeout,
            closed: Cell::new(false),
        })
    }

    fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        if self.closed.get() {
            return Err(BrowserError::Closed);
        }
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        send(&self.client, method, &url, body, self.script_timeout)
    }

    fn find_one(&self, query: &XPath) -> Result<WebElement, BrowserError> {
        let value = self.command(
            Method::POST,
            "/element",
            Some(json!({ "using": "xpath", "value": query.as_str() })),
        );
        match value {
            Ok(value) => WebElement::from_json(&value),
            Err(BrowserError::NotFound { .. }) => {
                Err(BrowserError::NotFound { query: query.to_string() })
            }
            Err(e) => Err(e),
        }
    }
}

/// Send one WebDriver command and unwrap the `value` envelope.
fn send(
    client: &Client,
    method: Method,
    url: &str,
    body: Option<Value>,
    script_timeout: Duration,
) -> Result<Value, BrowserError> {
    let request = client.request(method, url);
    let request = match body {
        Some(body) => request.json(&body),
        None => request,
    };
    let response = request.send()?;
    let status = response.status();
    let envelope: Envelope = response.json()?;

    if status.is_success() {
        return Ok(envelope.value);
    }

    let error: ErrorValue = serde_json::from_value(envelope.value)
        .map_err(|e| BrowserError::InvalidResponse(format!("status {}: {}", status, e)))?;
    Err(driver_error(error, script_timeout))
}

/// Map a W3C error body onto [`BrowserError`]. Driver-side timeouts are bounded by the
/// session's script timeout.
fn driver_error(error: ErrorValue, script_timeout: Duration) -> BrowserError {
    match error.error.as_str() {
        "no such element" => BrowserError::NotFound { query: error.message },
        "stale element reference" => BrowserError::StaleElement,
        "timeout" | "script timeout" => {
            BrowserError::Timeout { what: error.message, seconds: script_timeout.as_secs() }
        }
        _ => BrowserError::Protocol { error: error.error, message: error.message },
    }
}

impl BrowserSession for WebDriverSession {
    type Element = WebElement;

    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))?;
        Ok(())
    }

    fn wait_for_element(
        &self,
        query: &XPath,
        timeout: Duration,
    ) -> Result<WebElement, BrowserError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_one(query) {
                Ok(element) => return Ok(element),
                Err(BrowserError::NotFound { .. }) if Instant::now() < deadline => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(BrowserError::NotFound { .. }) => {
                    return Err(BrowserError::Timeout {
                        what: query.to_string(),
                        seconds: timeout.as_secs(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn find_elements(
        &self,
        parent: &WebElement,
        query: &XPath,
    ) -> Result<Vec<WebElement>, BrowserError> {
        let value = self.command(
            Method::POST,
            &format!("/element/{}/elements", parent.id),
            Some(json!({ "using": "xpath", "value": query.as_str() })),
        )?;
        value
            .as_array()
            .ok_or_else(|| BrowserError::InvalidResponse("expected an element array".to_string()))?
            .iter()
            .map(WebElement::from_json)
            .collect()
    }

    fn text(&self, element: &WebElement) -> Result<String, BrowserError> {
        let value = self.command(Method::GET, &format!("/element/{}/text", element.id), None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn attribute(&self, element: &WebElement, name: &str) -> Result<Option<String>, BrowserError> {
        let value = self.command(
            Method::GET,
            &format!("/element/{}/attribute/{}", element.id, name),
            None,
        )?;
        Ok(value.as_str().map(str::to_string))
    }

    fn scroll_into_view(&self, element: &WebElement) -> Result<(), BrowserError> {
        self.execute_script(SCROLL_INTO_VIEW_SCRIPT, element)?;
        Ok(())
    }

    fn execute_script(&self, script: &str, element: &WebElement) -> Result<Value, BrowserError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [element.to_json()] })),
        )
    }

    fn click(&self, element: &WebElement) -> Result<(), BrowserError> {
        self.command(Method::POST, &format!("/element/{}/click", element.id), Some(json!({})))?;
        Ok(())
    }

    fn quit(&self) -> Result<(), BrowserError> {
        if self.closed.get() {
            return Ok(());
        }
        self.command(Method::DELETE, "", None)?;
        self.closed.set(true);
        tracing::info!(session_id = %self.session_id, "Browser session closed");
        Ok(())
    }
}

impl Drop for WebDriverSession {
    fn drop(&mut self) {
        if !self.closed.get() {
            if let Err(e) = self.quit() {
                tracing::warn!(error = %e, "Failed to close browser session");
            }
        }
    }
}
