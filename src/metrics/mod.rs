//! Metrics module - business metric derivation over the fact table

mod categories;
mod cohort;
mod delivery;
mod geography;
mod payments;
mod revenue;

pub use categories::{category_contribution, CategoryRevenue, TOP_CATEGORIES, UNKNOWN_CATEGORY};
pub use cohort::{cohort_retention, CohortRetention, CohortRow};
pub use delivery::{delivery_vs_reviews, DeliveryReview, ReviewDelay, ScoreDelaySummary};
pub use geography::{collapse_zip_states, revenue_by_state, StateRevenue, TOP_STATES};
pub use payments::{payment_distribution, PaymentDistribution, PaymentShare, TOP_PAYMENT_TYPES};
pub use revenue::{
    average_order_value, revenue_growth, revenue_trend, MonthlyRevenue, MonthlyValue,
    RevenueTrend,
};

use polars::prelude::PolarsError;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::data::{DatasetKind, Datasets, FactTable};

/// Why a deriver produced nothing.
#[derive(Error, Debug)]
pub enum SkipReason {
    #[error("dataset `{0}` is not available")]
    MissingDataset(DatasetKind),
    #[error("`{table}` has no `{column}` column")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("no rows left after {0}")]
    Empty(&'static str),
    #[error("table operation failed: {0}")]
    Polars(#[from] PolarsError),
}

impl SkipReason {
    pub(crate) fn missing_column(table: &'static str, column: &'static str) -> Self {
        SkipReason::MissingColumn { table, column }
    }
}

/// Outcome of a single deriver.
#[derive(Debug)]
pub enum Derivation<T> {
    Produced(T),
    Skipped(SkipReason),
}

impl<T> Derivation<T> {
    pub fn produced(&self) -> Option<&T> {
        match self {
            Derivation::Produced(value) => Some(value),
            Derivation::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Derivation::Produced(_) => None,
            Derivation::Skipped(reason) => Some(reason),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Derivation::Skipped(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Derivation<U> {
        match self {
            Derivation::Produced(value) => Derivation::Produced(f(value)),
            Derivation::Skipped(reason) => Derivation::Skipped(reason),
        }
    }
}

impl<T> From<Result<T, SkipReason>> for Derivation<T> {
    fn from(result: Result<T, SkipReason>) -> Self {
        match result {
            Ok(value) => Derivation::Produced(value),
            Err(reason) => Derivation::Skipped(reason),
        }
    }
}

/// Fail with `MissingColumn` unless every named column exists.
pub(crate) fn require_columns(
    df: &polars::prelude::DataFrame,
    table: &'static str,
    required: &[&'static str],
) -> Result<(), SkipReason> {
    match required
        .iter()
        .find(|name| !crate::data::columns::has_column(df, name))
    {
        Some(missing) => Err(SkipReason::missing_column(table, missing)),
        None => Ok(()),
    }
}

/// A skipped step as recorded in the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedStep {
    pub step: &'static str,
    pub reason: String,
}

/// Every deriver's outcome for one run.
#[derive(Debug)]
pub struct MetricsReport {
    pub revenue_trend: Derivation<RevenueTrend>,
    pub revenue_growth: Derivation<Vec<MonthlyValue>>,
    pub average_order_value: Derivation<Vec<MonthlyValue>>,
    pub payment_distribution: Derivation<PaymentDistribution>,
    pub category_contribution: Derivation<Vec<CategoryRevenue>>,
    pub cohort_retention: Derivation<CohortRetention>,
    pub delivery_vs_reviews: Derivation<DeliveryReview>,
    pub revenue_by_state: Derivation<Vec<StateRevenue>>,
}

impl MetricsReport {
    /// Run every deriver once. Skips are logged, never propagated.
    pub fn derive(datasets: &Datasets, fact: &FactTable) -> Self {
        let revenue_trend = revenue_trend(fact);
        let revenue_growth = match revenue_trend.produced() {
            Some(trend) => Derivation::Produced(revenue_growth(trend)),
            None => Derivation::Skipped(SkipReason::Empty("revenue trend")),
        };

        let report = Self {
            revenue_trend,
            revenue_growth,
            average_order_value: average_order_value(fact),
            payment_distribution: payment_distribution(datasets),
            category_contribution: category_contribution(datasets, fact),
            cohort_retention: cohort_retention(fact),
            delivery_vs_reviews: delivery_vs_reviews(datasets),
            revenue_by_state: revenue_by_state(datasets, fact),
        };

        for step in report.skipped() {
            warn!(step = step.step, reason = %step.reason, "skipping metric");
        }
        info!(
            produced = 8 - report.skipped().len(),
            skipped = report.skipped().len(),
            "metrics derived"
        );
        report
    }

    pub fn skipped(&self) -> Vec<SkippedStep> {
        let reasons = [
            ("revenue_trend", self.revenue_trend.skip_reason()),
            ("revenue_growth", self.revenue_growth.skip_reason()),
            ("average_order_value", self.average_order_value.skip_reason()),
            ("payment_distribution", self.payment_distribution.skip_reason()),
            ("category_contribution", self.category_contribution.skip_reason()),
            ("cohort_retention", self.cohort_retention.skip_reason()),
            ("delivery_vs_reviews", self.delivery_vs_reviews.skip_reason()),
            ("revenue_by_state", self.revenue_by_state.skip_reason()),
        ];

        reasons
            .into_iter()
            .filter_map(|(step, reason)| {
                reason.map(|r| SkippedStep {
                    step,
                    reason: r.to_string(),
                })
            })
            .collect()
    }

    /// Serializable view used for `metrics.json`.
    pub fn summary(&self) -> MetricsSummary<'_> {
        MetricsSummary {
            revenue_trend: self.revenue_trend.produced(),
            revenue_growth: self.revenue_growth.produced(),
            average_order_value: self.average_order_value.produced(),
            payment_distribution: self.payment_distribution.produced(),
            category_contribution: self.category_contribution.produced(),
            cohort_retention: self.cohort_retention.produced(),
            delivery_vs_reviews: self.delivery_vs_reviews.produced(),
            revenue_by_state: self.revenue_by_state.produced(),
            skipped: self.skipped(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSummary<'a> {
    pub revenue_trend: Option<&'a RevenueTrend>,
    pub revenue_growth: Option<&'a Vec<MonthlyValue>>,
    pub average_order_value: Option<&'a Vec<MonthlyValue>>,
    pub payment_distribution: Option<&'a PaymentDistribution>,
    pub category_contribution: Option<&'a Vec<CategoryRevenue>>,
    pub cohort_retention: Option<&'a CohortRetention>,
    pub delivery_vs_reviews: Option<&'a DeliveryReview>,
    pub revenue_by_state: Option<&'a Vec<StateRevenue>>,
    pub skipped: Vec<SkippedStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FactBuilder;
    use polars::prelude::*;

    #[test]
    fn orders_only_run_skips_optional_metrics() {
        let orders = df!(
            "order_id" => ["o1", "o2"],
            "customer_id" => ["c1", "c2"],
            "order_purchase_timestamp" => ["2021-01-10 00:00:00", "2021-02-10 00:00:00"],
        )
        .unwrap();
        let datasets = Datasets::default().with_table(DatasetKind::Orders, orders);
        let fact = FactBuilder::build(&datasets).unwrap();

        let report = MetricsReport::derive(&datasets, &fact);
        let skipped: Vec<&str> = report.skipped().iter().map(|s| s.step).collect();

        assert!(report.revenue_trend.produced().is_some());
        assert!(report.cohort_retention.produced().is_some());
        assert_eq!(
            skipped,
            vec![
                "payment_distribution",
                "category_contribution",
                "delivery_vs_reviews",
                "revenue_by_state"
            ]
        );

        let json = serde_json::to_value(report.summary()).unwrap();
        assert!(json["payment_distribution"].is_null());
        assert_eq!(json["skipped"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn derivation_converts_from_result() {
        let ok: Derivation<u8> = Ok::<u8, SkipReason>(3).into();
        let skipped: Derivation<u8> = Err(SkipReason::Empty("filtering")).into();

        assert_eq!(ok.produced(), Some(&3));
        assert!(skipped.is_skipped());
        assert_eq!(
            skipped.skip_reason().unwrap().to_string(),
            "no rows left after filtering"
        );
    }
}
