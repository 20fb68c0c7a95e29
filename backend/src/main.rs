//! webui backend - Demo server.
//!
//! This binary serves the demo components used by `demos/webapp.xml`:
//! - `demo_file_dialog` - CSV files under `WEBUI_ROOT_DIR`; opening one
//!   takes ten polls
//! - `demo_table_0`, `demo_table_1` - generated numeric tables
//! - `demo_clock` - a button labelled with the server time
//!
//! Logging is structured JSON; SIGTERM and Ctrl+C shut down gracefully.
//!
//! # Example
//!
//! ```bash
//! WEBUI_ROOT_DIR=./data WEBUI_FILE_MASK='.+\.csv' PORT=8080 \
//! cargo run --bin webui-backend
//! ```

use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use webui_backend::com::{Manager, Process, ProcessStatus};
use webui_backend::config::Config;
use webui_backend::controls::{FileDialog, Label, StaticSource, Table};
use webui_backend::routes::{create_router, AppState};

/// Polls an opened file stays in work.
const OPEN_POLLS: i64 = 10;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  PORT             - HTTP server port (default: 8080)");
            eprintln!("  WEBUI_ROOT_DIR   - File dialog root (default: current directory)");
            eprintln!("  WEBUI_FILE_MASK  - Regex for listed files (default: .+)");
            eprintln!("  RUST_LOG         - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    let manager = match demo_manager(&config) {
        Ok(manager) => manager,
        Err(err) => {
            error!(error = %format!("{err:#}"), "Failed to set up components");
            return ExitCode::from(1);
        }
    };

    info!(
        port = config.port,
        root_dir = %config.root_dir.display(),
        components = manager.com_count(),
        "webui backend starting"
    );

    let app = create_router(AppState::new(manager));

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => {
            info!(port = config.port, address = %bind_addr, "Server listening");
            listener
        }
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    info!("Server ready to accept connections");

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        return ExitCode::from(1);
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Registers the demo components.
fn demo_manager(config: &Config) -> anyhow::Result<Manager> {
    let mut polls = 0;
    let dialog = FileDialog::new(config.root_dir.clone())
        .with_mask(&config.file_mask)
        .with_context(|| format!("invalid file mask '{}'", config.file_mask))?
        .on_open(move |path| {
            polls += 1;
            if polls < OPEN_POLLS {
                Process::in_work(polls * 100 / OPEN_POLLS).with_message("Opening")
            } else {
                polls = 0;
                info!(path = %path.display(), "File opened");
                Process::new(ProcessStatus::Finished)
            }
        });

    let mut manager = Manager::new();
    manager
        .root()
        .add_com("demo_file_dialog", dialog)
        .add_com("demo_table_0", Table::new(numbers(10, 2, "Column")))
        .add_com("demo_table_1", Table::new(numbers(20, 3, "Data")))
        .add_com(
            "demo_clock",
            Label::dynamic(|| Local::now().format("%H:%M:%S").to_string()),
        );
    Ok(manager)
}

/// `rows` x `cols` table whose cell is `row * 100 + col`.
fn numbers(rows: u32, cols: u32, title: &str) -> StaticSource {
    let columns: Vec<String> = (0..cols).map(|c| format!("{title} #{c}")).collect();
    (0..rows).fold(StaticSource::new(columns), |source, row| {
        source.row((0..cols).map(|col| json!(row * 100 + col)))
    })
}

/// Initialize structured logging with tracing.
///
/// JSON output, filtered by `RUST_LOG` with a default of `info`.
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug,axum::rejection=trace"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Resolves when SIGTERM or Ctrl+C is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
