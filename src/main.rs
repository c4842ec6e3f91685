//! Binary entrypoint for the LED sign.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use rust_led_sign::config::{Mode, SignSettings};
use rust_led_sign::controller::SignController;
use rust_led_sign::driver::MockSign;

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "rust-led-sign", about = "LED sign frame renderer")]
struct Cli {
    /// Path to YAML settings file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show this text instead of the configured content
    #[arg(short, long, value_name = "TEXT")]
    text: Option<String>,

    /// Show this image or animation instead of the configured content
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rust_led_sign={}", level).parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut settings = match &cli.config {
        Some(path) => SignSettings::from_yaml_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => SignSettings::default(),
    };
    if let Some(text) = cli.text {
        settings.mode = Mode::Text;
        settings.text.text = text;
    }
    let file_bytes = match &cli.file {
        Some(path) => {
            settings.mode = Mode::File;
            Some(
                std::fs::read(path)
                    .with_context(|| format!("reading {}", path.display()))?,
            )
        }
        None => None,
    };

    let mut controller = SignController::new(settings, Box::new(MockSign::new()))
        .context("starting sign controller")?;
    if let Some(bytes) = file_bytes {
        controller.set_source_bytes(bytes).await?;
    } else {
        controller.show().await?;
    }
    info!("sign running, press ctrl-c to exit");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    controller.shutdown().await;
    Ok(())
}
