//! Helpdesk server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, starts the SLA monitor on its own task, and
//! serves the ticket API over HTTP. Shutting down (ctrl-c) drains the HTTP
//! server and stops the monitor cleanly.

mod sink;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use desk_engine::{SlaMonitor, TicketService};
use desk_store_sqlite::SqliteStore;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use sink::TracingSink;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DESK_*` environment variables.
#[derive(Deserialize, Clone)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host: String,
  #[serde(default = "default_port")]
  port: u16,
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
  /// SLA sweep cadence. A tunable, not a correctness requirement.
  #[serde(default = "default_sweep_interval_secs")]
  sweep_interval_secs: u64,
  /// Operations mailbox notified about every escalation and breach.
  #[serde(default = "default_ops_email")]
  ops_email: String,
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}
fn default_port() -> u16 {
  8080
}
fn default_store_path() -> PathBuf {
  PathBuf::from("helpdesk.db")
}
fn default_sweep_interval_secs() -> u64 {
  60
}
fn default_ops_email() -> String {
  "ops@helpdesk.example".to_string()
}

#[derive(Parser)]
#[command(author, version, about = "Helpdesk ticket server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DESK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store = Arc::new(
    SqliteStore::open(&server_cfg.store_path)
      .await
      .with_context(|| {
        format!("failed to open store at {:?}", server_cfg.store_path)
      })?,
  );
  let sink = Arc::new(TracingSink);

  let service = TicketService::new(
    Arc::clone(&store),
    Arc::clone(&store),
    Arc::clone(&sink),
  );

  // The sweep runs as an explicit task with its own shutdown handle, started
  // once here and stopped after the HTTP server drains.
  let monitor = Arc::new(SlaMonitor::new(
    Arc::clone(&store),
    Arc::clone(&sink),
    server_cfg.ops_email.clone(),
  ));
  let monitor_handle =
    monitor.start(Duration::from_secs(server_cfg.sweep_interval_secs));

  let app = desk_api::api_router(service).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  monitor_handle.stop().await;
  tracing::info!("Shutdown complete");

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    return;
  }
  tracing::info!("Shutdown signal received");
}
