//! Fact Table Builder
//! Joins orders with per-order payment totals into the canonical fact table.

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use super::columns::{self, MONTH, ORDER_ID, PAYMENT_VALUE, PURCHASE_TS, REVENUE};
use super::loader::{DatasetKind, Datasets};
use super::time;

const ROW_INDEX: &str = "__row";

#[derive(Error, Debug)]
pub enum FactError {
    #[error("missing required input: orders dataset is required to build the fact table")]
    MissingOrders,
    #[error("orders dataset has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// One row per order with `month` and `revenue` attached. Read-only once built.
#[derive(Debug, Clone)]
pub struct FactTable {
    df: DataFrame,
}

impl FactTable {
    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        columns::has_column(&self.df, name)
    }

    pub fn months(&self) -> PolarsResult<Vec<Option<NaiveDate>>> {
        columns::date_values(&self.df, MONTH)
    }

    /// Revenue per row; never null by construction.
    pub fn revenue(&self) -> PolarsResult<Vec<f64>> {
        Ok(columns::f64_values(&self.df, REVENUE)?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect())
    }
}

/// Builds the fact table from loaded datasets.
pub struct FactBuilder;

impl FactBuilder {
    pub fn build(datasets: &Datasets) -> Result<FactTable, FactError> {
        let orders = datasets
            .get(DatasetKind::Orders)
            .ok_or(FactError::MissingOrders)?;
        for required in [ORDER_ID, PURCHASE_TS] {
            if !columns::has_column(orders, required) {
                return Err(FactError::MissingColumn(required));
            }
        }

        let mut fact = orders.clone();
        let (purchase, month) = Self::parse_purchase(orders)?;
        let order_id = fact.column(ORDER_ID)?.cast(&DataType::String)?;
        fact.with_column(order_id)?;
        fact.with_column(purchase)?;
        fact.with_column(month)?;

        let payments = Self::aggregate_payments(datasets)?;

        let df = fact
            .lazy()
            .with_row_index(ROW_INDEX, None)
            .join(
                payments.lazy(),
                [col(ORDER_ID)],
                [col(ORDER_ID)],
                JoinArgs::new(JoinType::Left),
            )
            .with_column(col(PAYMENT_VALUE).fill_null(lit(0.0)).alias(REVENUE))
            .sort([ROW_INDEX], SortMultipleOptions::default())
            .collect()?
            .drop(ROW_INDEX)?;

        info!(rows = df.height(), "fact table built");
        Ok(FactTable { df })
    }

    /// Parse purchase timestamps (unparsable -> null) and derive the month bucket.
    fn parse_purchase(orders: &DataFrame) -> Result<(Column, Column), FactError> {
        let raw = columns::string_values(orders, PURCHASE_TS)?;

        let mut millis: Vec<Option<i64>> = Vec::with_capacity(raw.len());
        let mut months: Vec<Option<i32>> = Vec::with_capacity(raw.len());
        let mut unparsed = 0usize;

        for value in &raw {
            let parsed = value.as_deref().and_then(time::parse_timestamp);
            if parsed.is_none() {
                unparsed += 1;
            }
            millis.push(parsed.map(|ts| ts.and_utc().timestamp_millis()));
            months.push(parsed.map(|ts| time::epoch_days(time::month_start(ts.date()))));
        }

        if unparsed > 0 {
            warn!(rows = unparsed, "purchase timestamps could not be parsed; month left null");
        }

        let purchase = Column::new(PURCHASE_TS.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        let month = Column::new(MONTH.into(), months).cast(&DataType::Date)?;
        Ok((purchase, month))
    }

    /// One row per order_id with the summed payment value. Empty when the
    /// payments dataset is absent or unusable.
    fn aggregate_payments(datasets: &Datasets) -> Result<DataFrame, FactError> {
        let usable = datasets.get(DatasetKind::Payments).filter(|payments| {
            let ok = columns::has_column(payments, ORDER_ID)
                && columns::has_column(payments, PAYMENT_VALUE);
            if !ok {
                warn!("payments dataset lacks order_id/payment_value; revenue defaults to 0");
            }
            ok
        });

        let Some(payments) = usable else {
            return Ok(DataFrame::new(vec![
                Column::new(ORDER_ID.into(), Vec::<String>::new()),
                Column::new(PAYMENT_VALUE.into(), Vec::<f64>::new()),
            ])?);
        };

        let aggregated = payments
            .clone()
            .lazy()
            .select([
                col(ORDER_ID).cast(DataType::String),
                col(PAYMENT_VALUE).cast(DataType::Float64),
            ])
            .group_by([col(ORDER_ID)])
            .agg([col(PAYMENT_VALUE).sum()])
            .collect()?;
        Ok(aggregated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> DataFrame {
        df!(
            "order_id" => ["o1", "o2", "o3"],
            "customer_id" => ["c1", "c2", "c3"],
            "order_purchase_timestamp" => [Some("2021-01-15 10:00:00"), Some("2021-02-03 08:30:00"), Some("garbage")],
        )
        .unwrap()
    }

    fn payments() -> DataFrame {
        df!(
            "order_id" => ["o2", "o1", "o2"],
            "payment_type" => ["credit_card", "boleto", "voucher"],
            "payment_value" => ["50", "100", "25"],
        )
        .unwrap()
    }

    #[test]
    fn split_payments_are_summed_per_order() {
        let datasets = Datasets::default()
            .with_table(DatasetKind::Orders, orders())
            .with_table(DatasetKind::Payments, payments());

        let fact = FactBuilder::build(&datasets).unwrap();

        assert_eq!(fact.height(), 3);
        assert_eq!(fact.revenue().unwrap(), vec![100.0, 75.0, 0.0]);
        assert_eq!(
            columns::string_values(fact.frame(), ORDER_ID).unwrap(),
            vec![Some("o1".into()), Some("o2".into()), Some("o3".into())]
        );
    }

    #[test]
    fn month_is_null_only_for_unparsable_timestamps() {
        let datasets = Datasets::default().with_table(DatasetKind::Orders, orders());
        let fact = FactBuilder::build(&datasets).unwrap();

        assert_eq!(
            fact.months().unwrap(),
            vec![
                NaiveDate::from_ymd_opt(2021, 1, 1),
                NaiveDate::from_ymd_opt(2021, 2, 1),
                None
            ]
        );
        assert!(matches!(
            fact.frame().column(PURCHASE_TS).unwrap().dtype(),
            DataType::Datetime(TimeUnit::Milliseconds, None)
        ));
    }

    #[test]
    fn missing_payments_default_revenue_to_zero() {
        let datasets = Datasets::default().with_table(DatasetKind::Orders, orders());
        let fact = FactBuilder::build(&datasets).unwrap();

        assert_eq!(fact.revenue().unwrap(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn row_count_is_preserved_with_duplicate_and_orphan_payments() {
        let orders = df!(
            "order_id" => ["a", "b", "c", "d"],
            "order_purchase_timestamp" => ["2021-01-01", "2021-01-02", "2021-01-03", "2021-01-04"],
        )
        .unwrap();
        let payments = df!(
            "order_id" => ["a", "a", "a", "zz", "d"],
            "payment_value" => ["1", "2", "3", "99", "oops"],
        )
        .unwrap();
        let datasets = Datasets::default()
            .with_table(DatasetKind::Orders, orders)
            .with_table(DatasetKind::Payments, payments);

        let fact = FactBuilder::build(&datasets).unwrap();
        let revenue = fact.revenue().unwrap();

        assert_eq!(fact.height(), 4);
        assert_eq!(revenue, vec![6.0, 0.0, 0.0, 0.0]);
        assert!(revenue.iter().all(|r| *r >= 0.0));
    }

    #[test]
    fn orders_are_a_hard_dependency() {
        let err = FactBuilder::build(&Datasets::default()).unwrap_err();
        assert!(matches!(err, FactError::MissingOrders));

        let no_ts = df!("order_id" => ["o1"]).unwrap();
        let datasets = Datasets::default().with_table(DatasetKind::Orders, no_ts);
        assert!(matches!(
            FactBuilder::build(&datasets).unwrap_err(),
            FactError::MissingColumn(PURCHASE_TS)
        ));
    }
}
