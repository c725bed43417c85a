//! History server entry point.
//!
//! Loads `history-server.toml` from the configuration directory, installs
//! logging and metrics, then runs the server until SIGINT/SIGTERM.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use history_server::config::{load_config_dir, CONFIG_FILE_NAME};
use history_server::lifecycle::install_signal_handler;
use history_server::observability::{init_logging, init_metrics};
use history_server::{HistoryServer, ShutdownHooks};

#[derive(Parser)]
#[command(name = "history-server")]
#[command(about = "Serves archived job information over HTTP", long_about = None)]
struct Cli {
    /// Directory containing the configuration file
    #[arg(long, value_name = "DIR")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config_dir(&cli.config_dir)?;
    init_logging(&config.observability).map_err(|e| e as Box<dyn std::error::Error>)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config_dir.join(CONFIG_FILE_NAME).display(),
        "history-server starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let hooks = Arc::new(ShutdownHooks::new());
    install_signal_handler(hooks.clone());

    let server = HistoryServer::new(config, hooks).await?;
    server.run().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
