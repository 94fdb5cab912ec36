//! Data module - dataset loading and fact table construction

pub mod columns;
mod fact;
mod loader;
pub mod time;

pub use fact::{FactBuilder, FactError, FactTable};
pub use loader::{DatasetKind, DatasetLoader, Datasets, LoaderError, Table};
