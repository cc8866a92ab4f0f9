use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;

use staffdir::app::App;
use staffdir::config::Config;
use staffdir::logging;
use staffdir::session::{Session, SqliteTokenStore, TokenStore};

#[derive(Parser, Debug)]
#[command(name = "staffdir")]
#[command(about = "A terminal client for the employee management API")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./staffdir.yaml, then $XDG_CONFIG_HOME/staffdir/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// API base URL, e.g. http://localhost:3000/api/v1
  #[arg(long)]
  api_url: Option<String>,

  /// Forget the saved session and exit
  #[arg(long)]
  logout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Keep the guard alive for the whole run so buffered log lines get flushed
  let _log_guard = logging::init()?;

  let store = SqliteTokenStore::open()?;
  if args.logout {
    store.clear()?;
    println!("Session cleared.");
    return Ok(());
  }

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override the API URL if specified on command line
  if let Some(url) = args.api_url {
    config = config.with_base_url(url)?;
  }

  let session = Arc::new(Session::restore(Box::new(store))?);

  // Initialize and run the app
  let mut app = App::new(config, session)?;
  app.run().await?;

  Ok(())
}
