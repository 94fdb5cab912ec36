//! End-to-end run: load, build the fact table, derive, chart, write the deck.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::charts::{ChartRenderer, RenderedChart};
use crate::config::PipelineConfig;
use crate::data::{DatasetLoader, FactBuilder, FactError};
use crate::metrics::{MetricsReport, SkippedStep};
use crate::narrative::{self, DECK_TITLE};
use crate::ppt::{DeckError, DeckWriter};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fact(#[from] FactError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize metrics: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Deck(#[from] DeckError),
}

impl PipelineError {
    fn write(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| PipelineError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug)]
pub struct RunSummary {
    pub report: MetricsReport,
    pub charts: Vec<RenderedChart>,
    pub skipped: Vec<SkippedStep>,
    pub metrics_path: PathBuf,
    pub deck_path: PathBuf,
}

pub fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    info!(base_path = %config.base_path.display(), "loading datasets");
    let datasets = DatasetLoader::new(&config.base_path).load_all();
    info!(loaded = ?datasets.loaded_kinds(), "datasets available");

    let fact = FactBuilder::build(&datasets)?;

    let report = MetricsReport::derive(&datasets, &fact);

    let renderer = ChartRenderer::new(&config.output_dir);
    let charts = renderer
        .render_all(&report)
        .map_err(PipelineError::write(renderer.output_dir()))?;

    let metrics_path = config.metrics_path();
    let json = serde_json::to_string_pretty(&report.summary())?;
    fs::write(&metrics_path, json).map_err(PipelineError::write(&metrics_path))?;
    info!(path = %metrics_path.display(), "metrics written");

    let slides = narrative::strategy_deck(&charts);
    let deck_path = config.output_name.clone();
    if let Some(parent) = deck_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(PipelineError::write(parent))?;
    }
    DeckWriter::write(&slides, &deck_path, DECK_TITLE)?;

    let skipped = report.skipped();
    info!(
        charts = charts.len(),
        skipped = skipped.len(),
        deck = %deck_path.display(),
        "pipeline finished"
    );

    Ok(RunSummary {
        report,
        charts,
        skipped,
        metrics_path,
        deck_path,
    })
}
