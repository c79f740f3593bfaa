mod api;
mod app;
mod commands;
mod config;
mod event;
mod query;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "greenspace")]
#[command(about = "A terminal client for the Greenspace social network")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/greenspace/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL
  #[arg(long)]
  url: Option<String>,

  /// Username of the signed-in user
  #[arg(short, long)]
  user: Option<String>,
}

/// Log to a daily file; the terminal belongs to the UI.
fn init_logging() -> Result<WorkerGuard> {
  let dir = config::Config::data_dir();
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "greenspace.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_env("GREENSPACE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();
  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.url {
    config.api.url = url;
  }
  if let Some(user) = args.user {
    config.username = Some(user);
  }
  tracing::info!(url = %config.api.url, user = ?config.username, "starting greenspace");

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
