//! Polymarket event exporter
//!
//! Exports the sub-markets of an event and the price history of their outcome
//! tokens as two CSV files.

mod renderer;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use polyexport_polymarket::PolymarketClient;
use polyexport_services::{ExportConfig, ExportPipeline, ProgressPanel};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::renderer::TerminalRenderer;

/// Logs share stderr with the panel, so stay quiet unless `RUST_LOG` asks
const DEFAULT_LOG_FILTER: &str = "warn,polyexport_cli=info";

/// Export a Polymarket event's markets and K-line history to CSV
#[derive(Debug, Parser)]
#[command(name = "polyexport", version)]
struct Args {
    /// Event page URL (https://polymarket.com/event/<slug>) or bare slug
    location: String,

    /// Directory the CSV files are written to
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Price history granularity in minutes
    #[arg(short, long)]
    fidelity: Option<u32>,

    /// Unix timestamp (seconds) the price history starts at
    #[arg(long, conflicts_with = "lookback_days")]
    start_ts: Option<i64>,

    /// Days of price history to fetch when no start is given
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Pause before each price history request, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Collapse the progress panel to its title line
    #[arg(long)]
    collapsed: bool,
}

impl Args {
    fn apply(&self, mut config: ExportConfig) -> ExportConfig {
        if let Some(dir) = &self.out_dir {
            config.output_dir = dir.clone();
        }
        if let Some(fidelity) = self.fidelity {
            config.fidelity_minutes = fidelity;
        }
        if let Some(start_ts) = self.start_ts {
            config.start_ts = Some(start_ts);
        }
        if let Some(days) = self.lookback_days {
            config.lookback_days = days;
            config.start_ts = None;
        }
        if let Some(delay) = self.delay_ms {
            config.request_delay_ms = delay;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();
    let config = args.apply(ExportConfig::from_env()?);
    config.validate()?;

    info!("Exporting {} into {}", args.location, config.output_dir.display());

    let client = PolymarketClient::with_urls(
        config.gamma_base_url.clone(),
        config.clob_base_url.clone(),
        config.http_timeout(),
    )?;

    let mut panel = ProgressPanel::new(config.preview_limit)
        .with_renderer(Arc::new(TerminalRenderer::new()));
    if args.collapsed {
        panel.toggle_collapsed();
    }

    let pipeline = ExportPipeline::new(Arc::new(client), config, panel);
    let summary = pipeline
        .run(&args.location)
        .await
        .with_context(|| format!("导出失败：{}", args.location))?;

    println!("{}", summary.markets_path.display());
    println!("{}", summary.kline_path.display());
    Ok(())
}
