mod cli;
mod engine;
mod error;
mod export;
mod logging;
mod model;
mod orchestrator;
mod render;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless() || cfg!(not(feature = "tui"));

    logging::init(&args)?;
    tracing::info!(base_url = %args.base_url, headless = is_headless, "starting");

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            // anyhow prints the error on return; only the TUI log file gets a copy.
            if !is_headless {
                tracing::error!("exiting with error: {e:#}");
            }
            Err(e)
        }
    }
}
