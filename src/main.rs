mod app;
mod commands;
mod config;
mod event;
mod logging;
mod model;
mod offline;
mod reminder;
mod store;
mod sync;
mod transfer;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scadenze")]
#[command(about = "A terminal manager for family document expiry dates")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/scadenze/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Directory for the local databases and logs
  #[arg(short, long)]
  data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override data directory if specified on command line
  let config = if let Some(data_dir) = args.data_dir {
    config::Config {
      data_dir: Some(data_dir),
      ..config
    }
  } else {
    config
  };

  // Logs go to file: the terminal belongs to the UI
  let log_dir = config
    .data_dir
    .clone()
    .or_else(|| dirs::data_dir().map(|d| d.join("scadenze")))
    .unwrap_or_else(|| PathBuf::from("."));
  let _log_guard = logging::init(&log_dir.join("logs"))?;

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
