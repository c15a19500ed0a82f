//! SplitX video splitter
//!
//! Splits a video into fixed-length MP4 segments, one ffmpeg run per segment.
//!
//! # Usage
//!
//! ```bash
//! splitter split --input "video.mov" --minutes 2 --seconds 30
//! splitter plan --duration 320 --seconds 140 --json
//! splitter probe --input "video.mov"
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use splitx_cli::cli::{commands, Cli};
use splitx_cli::utils::logging::init_logging;
use splitx_cli::SplitXError;

/// Main entry point for the SplitX CLI application
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            let code = err
                .downcast_ref::<SplitXError>()
                .map(SplitXError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = commands::load_config(&cli).context("Failed to load configuration")?;
    init_logging(&config.log_level, config.log_format).context("Failed to initialise logging")?;

    info!("Starting SplitX");
    commands::run(cli.command, config).await?;
    info!("SplitX completed successfully");
    Ok(())
}
