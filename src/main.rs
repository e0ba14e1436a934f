use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracklet::config::{self, Config};
use tracklet::http;
use tracklet::logging::init_logging;

/// Issue tracking service (`SQLite` + JSON HTTP API)
#[derive(Parser, Debug)]
#[command(name = "trackletd", author, version, about, long_about = None)]
struct Cli {
    /// Path to the YAML config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Database path (overrides the config file)
    #[arg(long, env = "TRACKLET_DB")]
    db: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(long, env = "TRACKLET_LISTEN")]
    listen: Option<String>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_json) {
        eprintln!("Failed to initialize logging: {e}");
        // Don't exit, just continue without logging
    }

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    config.apply_overrides(cli.listen, cli.db);

    http::start_server(&config).await
}
