//! Delivery delay vs review score.

use polars::prelude::DataFrame;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};

use super::{require_columns, Derivation, SkipReason};
use crate::data::columns::{self, DELIVERED_TS, ESTIMATED_TS, ORDER_ID, REVIEW_SCORE};
use crate::data::time;
use crate::data::{DatasetKind, Datasets};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewDelay {
    pub order_id: String,
    pub review_score: f64,
    /// Delivered minus estimated, floored to whole days. Negative = early.
    pub delay_days: i64,
}

/// Box-plot figures of delay for one review score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDelaySummary {
    pub score: i64,
    pub count: usize,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryReview {
    pub observations: Vec<ReviewDelay>,
    pub by_score: Vec<ScoreDelaySummary>,
    /// Pearson correlation between score and delay.
    pub correlation: Option<f64>,
}

pub fn delivery_vs_reviews(datasets: &Datasets) -> Derivation<DeliveryReview> {
    compute(datasets).into()
}

fn compute(datasets: &Datasets) -> Result<DeliveryReview, SkipReason> {
    let reviews = datasets.require(DatasetKind::Reviews)?;
    let orders = datasets.require(DatasetKind::Orders)?;
    require_columns(reviews, "reviews", &[ORDER_ID, REVIEW_SCORE])?;
    require_columns(orders, "orders", &[ORDER_ID, DELIVERED_TS, ESTIMATED_TS])?;

    let delays = order_delays(orders)?;

    let review_orders = columns::string_values(reviews, ORDER_ID)?;
    let scores = columns::f64_values(reviews, REVIEW_SCORE)?;

    // One observation per matching order row, as a left join would produce.
    let mut observations: Vec<ReviewDelay> = Vec::new();
    for (order_id, score) in review_orders.into_iter().zip(scores) {
        let (Some(order_id), Some(review_score)) = (order_id, score.filter(|s| s.is_finite()))
        else {
            continue;
        };
        let Some(matches) = delays.get(&order_id) else {
            continue;
        };
        for delay_days in matches.iter().flatten() {
            observations.push(ReviewDelay {
                order_id: order_id.clone(),
                review_score,
                delay_days: *delay_days,
            });
        }
    }

    if observations.is_empty() {
        return Err(SkipReason::Empty("joining reviews to delivery delays"));
    }

    Ok(DeliveryReview {
        by_score: summarize_by_score(&observations),
        correlation: correlation(&observations),
        observations,
    })
}

/// order_id -> delay in days of every row with that id (None when either
/// date is unparsable).
fn order_delays(orders: &DataFrame) -> Result<HashMap<String, Vec<Option<i64>>>, SkipReason> {
    let ids = columns::string_values(orders, ORDER_ID)?;
    let delivered = columns::string_values(orders, DELIVERED_TS)?;
    let estimated = columns::string_values(orders, ESTIMATED_TS)?;

    let parse = |raw: Option<String>| raw.as_deref().and_then(time::parse_timestamp);

    let mut delays: HashMap<String, Vec<Option<i64>>> = HashMap::new();
    for (id, (delivered, estimated)) in ids.into_iter().zip(delivered.into_iter().zip(estimated)) {
        let Some(id) = id else {
            continue;
        };
        let delay = match (parse(delivered), parse(estimated)) {
            (Some(d), Some(e)) => Some(time::floor_days(d, e)),
            _ => None,
        };
        delays.entry(id).or_default().push(delay);
    }
    Ok(delays)
}

fn summarize_by_score(observations: &[ReviewDelay]) -> Vec<ScoreDelaySummary> {
    let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry(obs.review_score.round() as i64)
            .or_default()
            .push(obs.delay_days as f64);
    }

    groups
        .into_iter()
        .map(|(score, mut delays)| {
            delays.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let q1 = percentile(&delays, 25.0);
            let q3 = percentile(&delays, 75.0);
            let iqr = q3 - q1;
            let whisker_low = delays
                .iter()
                .copied()
                .find(|&v| v >= q1 - 1.5 * iqr)
                .unwrap_or(q1);
            let whisker_high = delays
                .iter()
                .rev()
                .copied()
                .find(|&v| v <= q3 + 1.5 * iqr)
                .unwrap_or(q3);

            ScoreDelaySummary {
                score,
                count: delays.len(),
                mean: delays.iter().mean(),
                q1,
                median: percentile(&delays, 50.0),
                q3,
                whisker_low,
                whisker_high,
            }
        })
        .collect()
}

/// Calculate percentile using linear interpolation (NumPy compatible).
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    let n = sorted_values.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted_values[0];
    }

    let rank = (p / 100.0) * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(n - 1);
    let frac = rank - lower as f64;

    if lower == upper {
        sorted_values[lower]
    } else {
        sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
    }
}

fn correlation(observations: &[ReviewDelay]) -> Option<f64> {
    if observations.len() < 2 {
        return None;
    }
    let scores: Vec<f64> = observations.iter().map(|o| o.review_score).collect();
    let delays: Vec<f64> = observations.iter().map(|o| o.delay_days as f64).collect();

    let sd_scores = scores.iter().std_dev();
    let sd_delays = delays.iter().std_dev();
    if sd_scores == 0.0 || sd_delays == 0.0 {
        return None;
    }

    let r = scores.iter().covariance(delays.iter()) / (sd_scores * sd_delays);
    r.is_finite().then_some(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn orders() -> DataFrame {
        df!(
            "order_id" => ["o1", "o2", "o3", "o4", "o5"],
            "order_purchase_timestamp" => ["2021-01-01"; 5],
            "order_delivered_customer_date" => [
                Some("2021-01-20 10:00:00"),
                Some("2021-01-08 09:00:00"),
                Some("2021-01-15 00:00:00"),
                None,
                Some("2021-01-30 12:00:00"),
            ],
            "order_estimated_delivery_date" => [
                "2021-01-15 00:00:00",
                "2021-01-15 00:00:00",
                "2021-01-15 00:00:00",
                "2021-01-15 00:00:00",
                "2021-01-15 00:00:00",
            ],
        )
        .unwrap()
    }

    fn reviews() -> DataFrame {
        df!(
            "review_id" => ["r1", "r2", "r3", "r4", "r5", "r6"],
            "order_id" => ["o1", "o2", "o3", "o4", "o5", "missing"],
            "review_score" => ["1", "5", "abc", "4", "2", "3"],
        )
        .unwrap()
    }

    fn datasets() -> Datasets {
        Datasets::default()
            .with_table(DatasetKind::Orders, orders())
            .with_table(DatasetKind::Reviews, reviews())
    }

    #[test]
    fn dirty_scores_and_undelivered_orders_are_dropped() {
        let result = delivery_vs_reviews(&datasets());
        let result = result.produced().unwrap();

        let kept: Vec<(&str, f64, i64)> = result
            .observations
            .iter()
            .map(|o| (o.order_id.as_str(), o.review_score, o.delay_days))
            .collect();
        // o3 has score "abc", o4 was never delivered, "missing" has no order.
        assert_eq!(kept, vec![("o1", 1.0, 5), ("o2", 5.0, -7), ("o5", 2.0, 15)]);
    }

    #[test]
    fn late_deliveries_correlate_with_low_scores() {
        let result = delivery_vs_reviews(&datasets());
        let result = result.produced().unwrap();

        assert!(result.correlation.unwrap() < -0.5);
        assert_eq!(
            result.by_score.iter().map(|s| s.score).collect::<Vec<_>>(),
            vec![1, 2, 5]
        );
        assert_eq!(result.by_score[2].median, -7.0);
        assert_eq!(result.by_score[2].count, 1);
    }

    #[test]
    fn duplicated_order_rows_each_yield_an_observation() {
        let orders = df!(
            "order_id" => ["o1", "o1"],
            "order_purchase_timestamp" => ["2021-01-01"; 2],
            "order_delivered_customer_date" => ["2021-01-20 00:00:00", "2021-01-10 00:00:00"],
            "order_estimated_delivery_date" => ["2021-01-15 00:00:00", "2021-01-15 00:00:00"],
        )
        .unwrap();
        let reviews = df!("order_id" => ["o1"], "review_score" => ["3"]).unwrap();
        let datasets = Datasets::default()
            .with_table(DatasetKind::Orders, orders)
            .with_table(DatasetKind::Reviews, reviews);

        let result = delivery_vs_reviews(&datasets);
        let delays: Vec<i64> = result
            .produced()
            .unwrap()
            .observations
            .iter()
            .map(|o| o.delay_days)
            .collect();
        assert_eq!(delays, vec![5, -5]);
    }

    #[test]
    fn skipped_without_reviews() {
        let datasets = Datasets::default().with_table(DatasetKind::Orders, orders());
        assert!(matches!(
            delivery_vs_reviews(&datasets),
            Derivation::Skipped(SkipReason::MissingDataset(DatasetKind::Reviews))
        ));
    }

    #[test]
    fn box_figures_follow_numpy_percentiles() {
        let delays = [-3.0, 0.0, 1.0, 2.0, 40.0];
        assert_eq!(percentile(&delays, 25.0), 0.0);
        assert_eq!(percentile(&delays, 50.0), 1.0);
        assert_eq!(percentile(&delays, 75.0), 2.0);
        assert_eq!(percentile(&[1.0, 2.0], 50.0), 1.5);

        let observations: Vec<ReviewDelay> = delays
            .iter()
            .enumerate()
            .map(|(i, d)| ReviewDelay {
                order_id: format!("o{i}"),
                review_score: 3.0,
                delay_days: *d as i64,
            })
            .collect();
        let summary = &summarize_by_score(&observations)[0];
        assert_eq!(summary.whisker_low, -3.0);
        assert_eq!(summary.whisker_high, 2.0);
        assert_eq!(summary.mean, 8.0);
    }
}
