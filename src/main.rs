//! mem CLI - Entry point
//!
//! Usage: mem <command> [options]

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mem::cli::{App, Cli};
use mem::config::Paths;
use mem::service::MemoryService;

/// How long a background reindex may keep the process alive after the command
const REINDEX_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warnings only, or debug with -v
    let default_level = if cli.verbose { "mem=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let paths = Paths::detect()?;
    let mut service = MemoryService::new(paths);
    match std::env::current_exe() {
        Ok(exe) => service = service.with_detached_reindex(exe),
        Err(e) => tracing::debug!(error = %e, "no executable path, hook reindex runs in-process"),
    }
    let app = App::new(service, cli.scope, cli.json, cancel);

    let hook_run = cli.command.is_hook_run();
    let result = mem::cli::run(cli.command, &app).await;

    if !hook_run {
        app.service.reindex_queue().drain(REINDEX_GRACE).await;
    }
    result
}
