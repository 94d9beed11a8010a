use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use tracing::{Span, info_span};

use super::assembler::{RecordAssembler, collect_window};
use super::images::ImageStore;
use super::locator::ChatLocator;
use super::scroller::BoundaryScroller;
use crate::browser::{BrowserSession, DriverProcess, WebDriverSession};
use crate::config::ExportConfig;
use crate::error::{Result, ScrapeError};
use crate::exporter::Exporter;
use crate::models::{ConversationRecord, MessageWindow, ScrollOutcome};
use crate::utils::ensure_dir;

const DEFAULT_DRIVER_PORT: u16 = 9515;
const DRIVER_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Records extracted from one chat, before export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub outcome: ScrollOutcome,
    pub records: Vec<ConversationRecord>,
}

/// Summary of a finished export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub outcome: ScrollOutcome,
    pub records: usize,
    pub images: usize,
}

/// Open the configured chat in `session`, load history back to the boundary and assemble
/// the records that are at or after it, oldest first.
pub fn extract_history<S: BrowserSession>(
    session: &S,
    config: &ExportConfig,
    span: &Span,
) -> Result<Extraction> {
    session.navigate(&config.chat_url)?;

    let locator =
        ChatLocator::new(&config.selectors, config.locate, info_span!(parent: span, "locate"));
    if !locator.locate(session, &config.chat_name) {
        return Err(ScrapeError::ChatNotFound {
            name: config.chat_name.clone(),
            attempts: config.locate.retries,
        });
    }

    let list = session.wait_for_element(&config.selectors.message_list(), config.element_wait)?;

    let scroller =
        BoundaryScroller::new(&config.selectors, config.scroll, info_span!(parent: span, "scroll"));
    let outcome = scroller.load_until(session, &list, config.boundary)?;
    if let ScrollOutcome::HistoryExhausted { cut_index } = outcome {
        tracing::warn!(
            parent: span,
            cut_index,
            boundary = %config.boundary,
            "Chat history ends after the boundary; exporting everything loaded"
        );
    }

    // Re-read after scrolling; handles from the scroll loop may be stale
    let window = kept_rows(collect_window(session, &list, &config.selectors)?, outcome)?;

    let assembler = RecordAssembler::new(
        &config.selectors,
        ImageStore::new(config.images_dir()),
        info_span!(parent: span, "assemble"),
    );
    let records = assembler.assemble(session, &window, window.len())?;

    Ok(Extraction { outcome, records })
}

/// Rows of `window` to export for `outcome`.
///
/// The cut index counts timestamp nodes, so the kept rows start at the timestamped row that
/// many places from the bottom. Exhausted history keeps every row.
fn kept_rows<E: Clone>(
    window: MessageWindow<E>,
    outcome: ScrollOutcome,
) -> Result<MessageWindow<E>> {
    if let ScrollOutcome::HistoryExhausted { .. } = outcome {
        return Ok(window);
    }

    let cut_index = outcome.cut_index();
    window
        .trailing_stamped(cut_index)
        .ok_or_else(|| ScrapeError::WindowTooShort { expected: cut_index, found: window.stamped() })
}

/// Run a complete export against a real browser: start the driver session, extract, tear
/// the session down, then write the export file.
///
/// The session is torn down whether or not extraction succeeded. Nothing is written when
/// extraction fails.
pub fn run_export(config: &ExportConfig) -> Result<ExportReport> {
    let span = info_span!("export", chat = %config.chat_name);
    ensure_dir(&config.output_dir)?;

    let mut webdriver = config.webdriver.clone();
    let _driver = match &config.chromedriver {
        Some(binary) => {
            let port = driver_port(&webdriver.webdriver_url)?;
            let driver = DriverProcess::spawn(binary, port, DRIVER_READY_TIMEOUT)?;
            webdriver.webdriver_url = driver.url();
            Some(driver)
        }
        None => None,
    };

    let session = WebDriverSession::start(&webdriver)?;
    let extraction = extract_history(&session, config, &span);
    if let Err(e) = session.quit() {
        tracing::warn!(parent: &span, error = %e, "Session teardown failed");
    }
    let extraction = extraction?;

    let path = config.export_path();
    Exporter::new(info_span!(parent: &span, "export_file")).export(&path, &extraction.records)?;

    Ok(ExportReport {
        path,
        outcome: extraction.outcome,
        records: extraction.records.len(),
        images: extraction.records.iter().filter(|r| r.image.is_some()).count(),
    })
}

fn driver_port(webdriver_url: &str) -> Result<u16> {
    let url = Url::parse(webdriver_url).map_err(|e| {
        ScrapeError::Config(format!("invalid webdriver url {}: {}", webdriver_url, e))
    })?;
    Ok(url.port().unwrap_or(DEFAULT_DRIVER_PORT))
}
