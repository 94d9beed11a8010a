use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_OUTPUT_DIR, ExportConfig, Selectors};
use crate::logging::{LogFormat, init_logging};
use crate::models::ScrollOutcome;
use crate::parsers::{Instant, parse_instant};
use crate::scraper::run_export;

#[derive(Parser)]
#[command(name = "chat-history-export")]
#[command(version = "0.1.0")]
#[command(about = "Export chat history back to a given oldest message", long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export messages at or after the oldest-message boundary
    Export(ExportArgs),
    /// Parse a "[HH:MM, DD/MM/YYYY]" timestamp and print it as ISO-8601
    CheckTimestamp {
        /// Timestamp text; anything after the first 19 characters is ignored
        text: String,
    },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Browser profile directory holding the logged-in session
    #[arg(long, env = "CHROME_PROFILE")]
    pub profile_dir: Option<PathBuf>,

    /// Chat to export; the first chat whose title contains this text is opened
    #[arg(long, env = "GROUP_CHAT_NAME")]
    pub chat_name: String,

    /// Oldest message to keep, as "[HH:MM, DD/MM/YYYY]"
    #[arg(long, env = "OLDEST_MESSAGE", value_parser = parse_instant)]
    pub oldest_message: Instant,

    /// Directory receiving the export file and the images subdirectory
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// WebDriver endpoint
    #[arg(long, default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    /// Start this chromedriver binary on the --webdriver-url port
    #[arg(long)]
    pub chromedriver: Option<PathBuf>,

    /// Run the browser without a window (the profile must already be logged in)
    #[arg(long)]
    pub headless: bool,

    /// JSON file overriding DOM selectors
    #[arg(long)]
    pub selectors: Option<PathBuf>,

    /// Give up after this many backward pagination triggers
    #[arg(long, default_value_t = 500)]
    pub max_scroll_iterations: u32,

    /// Longest wait for older messages to render after each trigger
    #[arg(long, default_value_t = 5000)]
    pub settle_timeout_ms: u64,

    /// Pause after scrolling each kept message into view
    #[arg(long, default_value_t = 1000)]
    pub scan_pause_ms: u64,
}

impl ExportArgs {
    pub fn to_config(&self) -> Result<ExportConfig> {
        let mut config = ExportConfig::new(&self.chat_name, self.oldest_message);
        config.output_dir = self.output_dir.clone();
        config.webdriver.webdriver_url = self.webdriver_url.clone();
        config.webdriver.profile_dir = self.profile_dir.clone();
        config.webdriver.headless = self.headless;
        config.chromedriver = self.chromedriver.clone();
        config.scroll.max_iterations = self.max_scroll_iterations;
        config.scroll.settle.timeout = Duration::from_millis(self.settle_timeout_ms);
        config.scroll.scan_pause = Duration::from_millis(self.scan_pause_ms);

        if let Some(path) = &self.selectors {
            config.selectors = Selectors::from_file(path)
                .with_context(|| format!("Failed to load selectors from {}", path.display()))?;
        }

        Ok(config)
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match &cli.command {
        Some(Commands::Export(args)) => {
            export(args)?;
        }
        Some(Commands::CheckTimestamp { text }) => {
            let instant = parse_instant(text).context("Invalid timestamp")?;
            println!("{}", instant.to_iso8601());
        }
        None => {
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn export(args: &ExportArgs) -> Result<()> {
    let config = args.to_config()?;
    let report = run_export(&config)
        .with_context(|| format!("Failed to export chat \"{}\"", config.chat_name))?;

    println!("Chat History Export");
    println!("===================");
    println!("Chat: {}", config.chat_name);
    println!("Oldest message boundary: {}", config.boundary);
    println!("Records exported: {}", report.records);
    println!("  With images: {}", report.images);
    if let ScrollOutcome::HistoryExhausted { .. } = report.outcome {
        println!("Note: chat history ends after the boundary");
    }
    println!();
    println!("Output file: {}", report.path.display());

    Ok(())
}
