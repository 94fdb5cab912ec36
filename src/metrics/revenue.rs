//! Monthly revenue, growth and average order value.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;

use super::{Derivation, SkipReason};
use crate::data::columns::{self, MONTH, ORDER_ID, REVENUE};
use crate::data::FactTable;

const ORDERS: &str = "orders";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: NaiveDate,
    pub revenue: f64,
    /// Distinct non-null order ids in the month.
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyValue {
    pub month: NaiveDate,
    pub value: f64,
}

/// Revenue and order counts per month, sorted by month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueTrend {
    pub points: Vec<MonthlyRevenue>,
}

impl RevenueTrend {
    pub fn total_revenue(&self) -> f64 {
        self.points.iter().map(|p| p.revenue).sum()
    }
}

/// Group the fact table by month; rows without a month are dropped.
pub fn revenue_trend(fact: &FactTable) -> Derivation<RevenueTrend> {
    monthly_totals(fact).map(|points| RevenueTrend { points }).into()
}

/// Month-over-month percent change. The first month is 0, as is any month
/// following a month with no revenue.
pub fn revenue_growth(trend: &RevenueTrend) -> Vec<MonthlyValue> {
    let mut growth = Vec::with_capacity(trend.points.len());
    let mut previous: Option<f64> = None;

    for point in &trend.points {
        let value = match previous {
            Some(prev) if prev != 0.0 => (point.revenue - prev) / prev * 100.0,
            _ => 0.0,
        };
        growth.push(MonthlyValue {
            month: point.month,
            value,
        });
        previous = Some(point.revenue);
    }

    growth
}

/// Total revenue divided by distinct orders, per month.
pub fn average_order_value(fact: &FactTable) -> Derivation<Vec<MonthlyValue>> {
    monthly_totals(fact)
        .map(|points| {
            points
                .into_iter()
                .map(|p| MonthlyValue {
                    month: p.month,
                    // A month whose rows all lack an order id carries no revenue.
                    value: p.revenue / p.orders.max(1) as f64,
                })
                .collect()
        })
        .into()
}

fn monthly_totals(fact: &FactTable) -> Result<Vec<MonthlyRevenue>, SkipReason> {
    let grouped = fact
        .frame()
        .clone()
        .lazy()
        .filter(col(MONTH).is_not_null())
        .group_by([col(MONTH)])
        .agg([
            col(REVENUE).sum(),
            col(ORDER_ID).drop_nulls().n_unique().alias(ORDERS),
        ])
        .sort([MONTH], SortMultipleOptions::default())
        .collect()?;

    let months = columns::date_values(&grouped, MONTH)?;
    let revenue = columns::f64_values(&grouped, REVENUE)?;
    let orders = columns::i64_values(&grouped, ORDERS)?;

    let points: Vec<MonthlyRevenue> = months
        .into_iter()
        .zip(revenue)
        .zip(orders)
        .filter_map(|((month, revenue), orders)| {
            Some(MonthlyRevenue {
                month: month?,
                revenue: revenue.unwrap_or(0.0),
                orders: orders.unwrap_or(0).max(0) as u64,
            })
        })
        .collect();

    if points.is_empty() {
        return Err(SkipReason::Empty("dropping orders without a purchase month"));
    }
    Ok(points)
}
