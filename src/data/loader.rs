//! CSV Dataset Loader Module
//! Loads the fixed set of Olist exports from a directory using Polars.

use polars::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::SkipReason;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV {path}: {source}")]
    CsvError {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

/// Logical datasets the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DatasetKind {
    Orders,
    Customers,
    Items,
    Products,
    Payments,
    Reviews,
    Sellers,
    Geolocation,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 8] = [
        DatasetKind::Orders,
        DatasetKind::Customers,
        DatasetKind::Items,
        DatasetKind::Products,
        DatasetKind::Payments,
        DatasetKind::Reviews,
        DatasetKind::Sellers,
        DatasetKind::Geolocation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DatasetKind::Orders => "orders",
            DatasetKind::Customers => "customers",
            DatasetKind::Items => "items",
            DatasetKind::Products => "products",
            DatasetKind::Payments => "payments",
            DatasetKind::Reviews => "reviews",
            DatasetKind::Sellers => "sellers",
            DatasetKind::Geolocation => "geolocation",
        }
    }

    /// Expected file name inside the base directory.
    pub fn file_name(self) -> &'static str {
        match self {
            DatasetKind::Orders => "olist_orders_dataset.csv",
            DatasetKind::Customers => "olist_customers_dataset.csv",
            DatasetKind::Items => "olist_order_items_dataset.csv",
            DatasetKind::Products => "olist_products_dataset.csv",
            DatasetKind::Payments => "olist_order_payments_dataset.csv",
            DatasetKind::Reviews => "olist_order_reviews_dataset.csv",
            DatasetKind::Sellers => "olist_sellers_dataset.csv",
            DatasetKind::Geolocation => "olist_geolocation_dataset.csv",
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Load state of a single dataset.
#[derive(Debug, Clone)]
pub enum Table {
    Loaded(DataFrame),
    Missing,
    Unreadable(String),
}

impl Table {
    pub fn frame(&self) -> Option<&DataFrame> {
        match self {
            Table::Loaded(df) => Some(df),
            Table::Missing | Table::Unreadable(_) => None,
        }
    }
}

/// Every dataset the loader attempted, keyed by logical name.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    tables: BTreeMap<DatasetKind, Table>,
}

impl Datasets {
    /// Register an in-memory table (used by tests and callers that bypass CSV).
    pub fn with_table(mut self, kind: DatasetKind, df: DataFrame) -> Self {
        self.tables.insert(kind, Table::Loaded(df));
        self
    }

    pub fn insert(&mut self, kind: DatasetKind, table: Table) {
        self.tables.insert(kind, table);
    }

    pub fn table(&self, kind: DatasetKind) -> &Table {
        self.tables.get(&kind).unwrap_or(&Table::Missing)
    }

    pub fn get(&self, kind: DatasetKind) -> Option<&DataFrame> {
        self.table(kind).frame()
    }

    /// Like `get`, but reports absence as a skip reason for derivers.
    pub fn require(&self, kind: DatasetKind) -> Result<&DataFrame, SkipReason> {
        self.get(kind).ok_or(SkipReason::MissingDataset(kind))
    }

    pub fn loaded_kinds(&self) -> Vec<DatasetKind> {
        self.tables
            .iter()
            .filter(|(_, table)| table.frame().is_some())
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Reads the Olist CSV exports from a base directory.
pub struct DatasetLoader {
    base_path: PathBuf,
}

impl DatasetLoader {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Attempt every known dataset. Never fails: absent and unreadable files
    /// are recorded and logged.
    pub fn load_all(&self) -> Datasets {
        let mut datasets = Datasets::default();

        for kind in DatasetKind::ALL {
            let path = self.base_path.join(kind.file_name());
            if !path.is_file() {
                warn!(dataset = %kind, path = %path.display(), "missing input file, skipping");
                datasets.insert(kind, Table::Missing);
                continue;
            }

            match Self::load_csv(&path) {
                Ok(df) => {
                    info!(dataset = %kind, rows = df.height(), columns = df.width(), "loaded");
                    datasets.insert(kind, Table::Loaded(df));
                }
                Err(err) => {
                    warn!(dataset = %kind, error = %err, "failed reading input file");
                    datasets.insert(kind, Table::Unreadable(err.to_string()));
                }
            }
        }

        datasets
    }

    /// Load a CSV file using Polars with every column read as a string.
    /// Typed coercion happens where values are consumed.
    pub fn load_csv(path: &Path) -> Result<DataFrame, LoaderError> {
        let to_err = |source| LoaderError::CsvError {
            path: path.to_path_buf(),
            source,
        };

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()
            .map_err(to_err)?
            .collect()
            .map_err(to_err)?;

        debug!(path = %path.display(), rows = df.height(), "csv parsed");
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_files_are_recorded_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DatasetKind::Orders.file_name()),
            "order_id,customer_id\no1,c1\no2,c2\n",
        )
        .unwrap();

        let datasets = DatasetLoader::new(dir.path()).load_all();

        assert_eq!(datasets.loaded_kinds(), vec![DatasetKind::Orders]);
        assert_eq!(datasets.get(DatasetKind::Orders).unwrap().height(), 2);
        assert!(matches!(datasets.table(DatasetKind::Payments), Table::Missing));
        assert!(matches!(
            datasets.require(DatasetKind::Geolocation),
            Err(SkipReason::MissingDataset(DatasetKind::Geolocation))
        ));
    }

    #[test]
    fn malformed_file_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DatasetKind::Payments.file_name()),
            "order_id,payment_value\no1,10,extra,fields\no2\n\"unterminated\n",
        )
        .unwrap();

        let datasets = DatasetLoader::new(dir.path()).load_all();

        assert!(matches!(
            datasets.table(DatasetKind::Payments),
            Table::Unreadable(_)
        ));
        assert!(datasets.get(DatasetKind::Payments).is_none());
    }

    #[test]
    fn columns_are_read_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zips.csv");
        fs::write(&path, "customer_zip_code_prefix,score\n01310,5\n")
            .unwrap();

        let df = DatasetLoader::load_csv(&path).unwrap();
        let zip = df.column("customer_zip_code_prefix").unwrap();

        assert_eq!(zip.dtype(), &DataType::String);
        assert_eq!(zip.str().unwrap().get(0), Some("01310"));
    }
}
