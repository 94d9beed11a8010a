//! Optional chromedriver child process owned by the exporter

use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;

use super::BrowserError;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A chromedriver started by us and killed when dropped.
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    /// Spawn `binary --port=<port>` and wait until its `/status` endpoint reports ready.
    pub fn spawn(binary: &Path, port: u16, ready_timeout: Duration) -> Result<Self, BrowserError> {
        let child = Command::new(binary)
            .arg(format!("--port={}", port))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                BrowserError::Driver(format!("failed to start {}: {}", binary.display(), e))
            })?;

        let mut process = Self { child, port };
        process.wait_until_ready(ready_timeout)?;
        tracing::info!(binary = %binary.display(), port, "Driver process ready");
        Ok(process)
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), BrowserError> {
        let client = Client::builder().timeout(Duration::from_secs(2)).build()?;
        let status_url = format!("{}/status", self.url());
        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait().map_err(|e| {
                BrowserError::Driver(format!("failed to poll driver process: {}", e))
            })? {
                return Err(BrowserError::Driver(format!("driver exited early with {}", status)));
            }

            let ready = client
                .get(&status_url)
                .send()
                .and_then(|r| r.json::<serde_json::Value>())
                .map(|v| v["value"]["ready"].as_bool().unwrap_or(false))
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            thread::sleep(READY_POLL_INTERVAL);
        }

        Err(BrowserError::Timeout { what: status_url, seconds: timeout.as_secs() })
    }
}

impl Drop for DriverProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            tracing::debug!(error = %e, "Driver process already stopped");
        }
        let _ = self.child.wait();
    }
}
