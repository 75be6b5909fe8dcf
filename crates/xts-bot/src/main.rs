//! XTS market data demo - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

/// XTS market data demo
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via XTS_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    xts_telemetry::init_logging()?;

    info!("Starting XTS market data demo v{}", env!("CARGO_PKG_VERSION"));

    let config = xts_bot::AppConfig::load(args.config)?;
    info!(
        base_url = %config.base_url,
        instruments = config.instruments.len(),
        data_dir = %config.data_dir,
        "Configuration loaded"
    );

    let app = xts_bot::Application::new(config)?;
    let report = app.run().await?;

    for (name, path) in &report.batch_files {
        info!(instrument = %name, path = %path.display(), "Saved OHLC");
    }
    if let Some(path) = &report.stream_log {
        info!(path = %path.display(), events = report.stream_events, "Saved stream log");
    }

    debug!(metrics = %xts_telemetry::Metrics::render()?, "Final metrics");
    Ok(())
}
