//! mmcdesk - terminal front end for the mmc back-office console.
//!
//! Signs in against the console's REST API, keeps the session in the cache
//! directory between runs, and lists or fetches customers, products and
//! transactions.

mod cli;
mod commands;

use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mmcdesk_core::Config;

use cli::Cli;
use commands::Console;

/// Log file prefix inside `<cache dir>/logs`
const LOG_FILE_PREFIX: &str = "mmcdesk.log";

/// Initialize the tracing subscriber: filtered output on stderr plus a
/// daily log file in the cache directory. The returned guard must live
/// until exit so buffered lines are flushed.
fn init_tracing(cache_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match cache_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let cache_dir = match cli.cache_dir {
        Some(dir) => dir,
        None => config.cache_dir()?,
    };
    let base_url = config.base_url_or(cli.api_base_url.as_deref());
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

    let _guard = init_tracing(Some(&cache_dir));
    info!(version = env!("CARGO_PKG_VERSION"), "mmcdesk starting");
    debug!(command = ?cli.command, %base_url, "Parsed command");

    let console = Console::open(config, &base_url, &cache_dir)?;
    console.run(cli.command).await
}
