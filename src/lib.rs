//! Olist Insights - E-commerce transaction analytics
//!
//! Loads the Olist CSV exports, builds an order-level fact table, derives
//! business metrics, renders them as charts and assembles a strategy deck.

pub mod charts;
pub mod config;
pub mod data;
pub mod metrics;
pub mod narrative;
pub mod pipeline;
pub mod ppt;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{run, PipelineError, RunSummary};
