//! Payment method mix.

use polars::prelude::*;
use serde::Serialize;

use super::{require_columns, Derivation, SkipReason};
use crate::data::columns::{self, PAYMENT_TYPE};
use crate::data::{DatasetKind, Datasets};

pub const TOP_PAYMENT_TYPES: usize = 8;

const COUNT: &str = "count";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentShare {
    pub payment_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentDistribution {
    /// Most frequent payment types, at most `TOP_PAYMENT_TYPES`.
    pub shares: Vec<PaymentShare>,
    /// All payment rows, including ones outside the top list.
    pub total_rows: u64,
}

impl PaymentDistribution {
    /// Percentage of each listed type relative to the listed total.
    pub fn percentages(&self) -> Vec<f64> {
        let listed: u64 = self.shares.iter().map(|s| s.count).sum();
        if listed == 0 {
            return vec![0.0; self.shares.len()];
        }
        self.shares
            .iter()
            .map(|s| s.count as f64 / listed as f64 * 100.0)
            .collect()
    }
}

/// Count payment rows per type and keep the most frequent ones.
pub fn payment_distribution(datasets: &Datasets) -> Derivation<PaymentDistribution> {
    compute(datasets).into()
}

fn compute(datasets: &Datasets) -> Result<PaymentDistribution, SkipReason> {
    let payments = datasets.require(DatasetKind::Payments)?;
    require_columns(payments, "payments", &[PAYMENT_TYPE])?;

    let counts = payments
        .clone()
        .lazy()
        .select([col(PAYMENT_TYPE).cast(DataType::String)])
        .filter(col(PAYMENT_TYPE).is_not_null())
        .group_by([col(PAYMENT_TYPE)])
        .agg([len().alias(COUNT)])
        .sort(
            [COUNT, PAYMENT_TYPE],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .limit(TOP_PAYMENT_TYPES as IdxSize)
        .collect()?;

    let shares: Vec<PaymentShare> = columns::string_values(&counts, PAYMENT_TYPE)?
        .into_iter()
        .zip(columns::i64_values(&counts, COUNT)?)
        .filter_map(|(payment_type, count)| {
            Some(PaymentShare {
                payment_type: payment_type?,
                count: count?.max(0) as u64,
            })
        })
        .collect();

    if shares.is_empty() {
        return Err(SkipReason::Empty("dropping null payment types"));
    }

    Ok(PaymentDistribution {
        shares,
        total_rows: payments.height() as u64,
    })
}
