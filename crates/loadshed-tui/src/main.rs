//! `loadshed`: terminal front-end for loadshedding schedules.
//!
//! Drill down from provinces to towns to a town's multi-day schedule,
//! with the national stage kept current by the server's push channel.
//!
//! Logs go to a file (see `--log-file`) so they never corrupt the UI.

mod action;
mod app;
mod component;
mod event;
mod target;
mod theme;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use loadshed_api::ApiClient;
use loadshed_config::Config;
use loadshed_core::StageSubscription;

use crate::app::App;

/// Browse loadshedding schedules by province and town.
#[derive(Parser, Debug)]
#[command(name = "loadshed", version, about)]
struct Cli {
    /// Service root URL (e.g., http://localhost:7010)
    #[arg(short = 's', long, env = "LOADSHED_SERVER")]
    server: Option<String>,

    /// Directory exported schedules are written to
    #[arg(short = 'o', long)]
    export_dir: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing. Hold the guard for the whole run so logs flush.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "loadshed={log_level},loadshed_core={log_level},loadshed_api={log_level}"
        ))
    });

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(loadshed_config::default_log_path);
    let log_dir = log_file.parent().unwrap_or(std::path::Path::new("."));
    let log_filename = log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("loadshed.log"));
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

/// Layered config with command-line flags on top.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => loadshed_config::load_config_from(path)?,
        None => loadshed_config::load_config()?,
    };
    if let Some(server) = &cli.server {
        config.server.clone_from(server);
    }
    if let Some(dir) = &cli.export_dir {
        config.export_dir = Some(dir.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks before the terminal enters raw mode
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli);

    let settings = resolve_config(&cli)?.to_client_settings()?;
    info!(server = %settings.base_url, "starting loadshed");

    let client = ApiClient::new(settings.base_url.clone(), &settings.transport)?;

    let cancel = CancellationToken::new();
    let stage_updates = match StageSubscription::open(
        &client,
        &settings.transport,
        settings.reconnect.clone(),
        cancel.clone(),
    ) {
        Ok(subscription) => Some(subscription),
        Err(e) => {
            warn!(error = %e, "stage push channel unavailable");
            None
        }
    };

    let mut app = App::new(client, stage_updates, settings.export_dir);
    let outcome = app.run().await;

    cancel.cancel();
    outcome
}
