//! Olist Insights - command-line entry point
//!
//! Runs the full pipeline against a directory of Olist CSV exports.

use anyhow::{Context, Result};
use clap::Parser;
use olist_insights::{run, PipelineConfig};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "olist-insights", version, about = "Olist e-commerce analysis & strategy deck")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the Olist CSV files (default: archive)
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// Directory for chart PNGs and metrics.json (default: charts)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path of the generated deck (default: Olist_Consulting_Deck.pptx)
    #[arg(long)]
    output_name: Option<PathBuf>,

    /// Open the deck with the system viewer when done
    #[arg(long)]
    open: bool,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(base_path) = &self.base_path {
            config.base_path = base_path.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(output_name) = &self.output_name {
            config.output_name = output_name.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("olist_insights=info,warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.pipeline_config()?;

    let summary = run(&config).context("analysis pipeline failed")?;
    for step in &summary.skipped {
        info!(step = step.step, reason = %step.reason, "not included in deck");
    }
    info!(
        charts = summary.charts.len(),
        deck = %summary.deck_path.display(),
        "done"
    );

    if cli.open {
        if let Err(err) = open::that(&summary.deck_path) {
            warn!(error = %err, "failed to open deck");
        }
    }
    Ok(())
}
