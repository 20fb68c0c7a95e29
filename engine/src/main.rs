//! webui - declarative UI composition engine.
//!
//! This binary loads an XML configuration document, mounts the active layout
//! and prints the rendered element tree once every component has finished
//! synchronizing with the backend.
//!
//! # Commands
//!
//! - `webui check <document>`: Parse a document and report its tables
//! - `webui run`: Mount the active layout and render it
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use webui_engine::config::Config;
use webui_engine::document::Document;
use webui_engine::element::Element;
use webui_engine::engine::{Constructed, Engine};
use webui_engine::error::EngineError;
use webui_engine::transport::HttpTransport;

/// Default re-sync interval in watch mode.
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 5;

/// webui - declarative UI composition engine.
///
/// Builds the UI described by an XML document and keeps it synchronized
/// with a webui backend.
#[derive(Parser, Debug)]
#[command(name = "webui")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    WEBUI_BACKEND_URL           Backend URL (required for 'run')
    WEBUI_DOCUMENT              Configuration document (default: webapp.xml)
    WEBUI_RETRY_DELAY_MS        Pending notification poll delay (default: 1000)
    WEBUI_REQUEST_TIMEOUT_SECS  HTTP request timeout (default: 30)

EXAMPLES:
    # Validate a document
    webui check ui/webapp.xml

    # Render the active layout once
    export WEBUI_BACKEND_URL=http://localhost:8080
    webui run

    # Keep re-syncing and print every change
    webui run --watch
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a configuration document and report its contents.
    Check {
        /// Path of the document.
        document: PathBuf,
    },

    /// Mount the active layout and render it.
    ///
    /// Requires WEBUI_BACKEND_URL environment variable.
    Run {
        /// Document to load instead of WEBUI_DOCUMENT.
        #[arg(short, long)]
        doc: Option<PathBuf>,

        /// Keep re-syncing until interrupted, printing the tree on change.
        #[arg(short, long)]
        watch: bool,

        /// Seconds between re-syncs in watch mode.
        #[arg(long, default_value_t = DEFAULT_WATCH_INTERVAL_SECS)]
        interval: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Check { document } => run_check(&document),
        Command::Run {
            doc,
            watch,
            interval,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_engine(doc, watch, Duration::from_secs(interval.max(1))))
        }
    }
}

/// Parses a document and prints a summary of its tables.
fn run_check(path: &Path) -> Result<()> {
    let document = Document::load(path)
        .with_context(|| format!("Failed to load document {}", path.display()))?;

    let mut styles: Vec<&String> = document.styles.keys().collect();
    styles.sort();
    let mut layouts: Vec<&String> = document.layouts.keys().collect();
    layouts.sort();

    println!("styles:  {}", join(&styles));
    println!("layouts: {}", join(&layouts));
    for (key, value) in document.setup.iter() {
        println!("setup:   {key} = {value}");
    }
    Ok(())
}

fn join(names: &[&String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }
}

/// Mounts the active layout, waits for its syncs and prints the tree.
async fn run_engine(doc: Option<PathBuf>, watch: bool, interval: Duration) -> Result<()> {
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    let path = doc.unwrap_or_else(|| config.document.clone());

    info!(
        backend_url = %config.backend_url,
        document = %path.display(),
        "Starting webui engine"
    );

    let document = Document::load(&path)
        .with_context(|| format!("Failed to load document {}", path.display()))?;
    let transport = HttpTransport::new(&config.backend_url, config.request_timeout)
        .map_err(|e| EngineError::Http(e.to_string()))?;
    let engine = Engine::builder(document, Arc::new(transport))
        .retry_delay(config.retry_delay)
        .build();

    let output = engine
        .setup()
        .output()
        .map(str::to_string)
        .context("Document setup names no UI_OUTPUT")?;
    let root = Element::new("div");
    root.set_attr("id", output.as_str());
    engine.add_mount_point(output, root.clone());

    let constructed = engine.construct_layout()?;
    settle(&constructed).await;
    let mut rendered = root.render();
    println!("{rendered}");

    if !watch {
        return Ok(());
    }

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                settle(&constructed).await;
                let next = root.render();
                if next != rendered {
                    println!("{next}");
                    rendered = next;
                } else {
                    debug!("Tree unchanged");
                }
            }
        }
    }

    info!("webui engine stopped");
    Ok(())
}

/// Waits for every mounted component's sync cycle.
///
/// A new sync joins the cycle already in flight, so this also waits for the
/// cycles started by `construct_layout`.
async fn settle(constructed: &[Constructed]) {
    let tasks: Vec<_> = constructed
        .iter()
        .filter_map(|entry| entry.component.sync_with_backend())
        .collect();
    for task in &tasks {
        task.settled().await;
    }
    if tasks.is_empty() {
        warn!("No component is synchronizing with the backend");
    }
}

/// Initializes the tracing subscriber with environment filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
