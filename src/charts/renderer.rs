//! Static Chart Renderer
//! Writes one PNG per produced metric into the chart directory.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::plotter::{self, BoxSpec, ChartError, LineSpec, LINE_COLOR, SECONDARY_COLOR};
use crate::data::time::month_label;
use crate::metrics::{
    CohortRetention, DeliveryReview, MetricsReport, MonthlyValue, PaymentDistribution,
    RevenueTrend,
};

/// Every chart the renderer can produce, in deck order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    RevenueTrend,
    RevenueGrowth,
    RevenueOrders,
    AverageOrderValue,
    PaymentMix,
    TopCategories,
    CohortRetention,
    DeliveryVsReviews,
    RevenueByState,
}

impl ChartKind {
    pub const ALL: [ChartKind; 9] = [
        ChartKind::RevenueTrend,
        ChartKind::RevenueGrowth,
        ChartKind::RevenueOrders,
        ChartKind::AverageOrderValue,
        ChartKind::PaymentMix,
        ChartKind::TopCategories,
        ChartKind::CohortRetention,
        ChartKind::DeliveryVsReviews,
        ChartKind::RevenueByState,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::RevenueTrend => "revenue_trend.png",
            ChartKind::RevenueGrowth => "revenue_growth_pct.png",
            ChartKind::RevenueOrders => "revenue_orders_dual.png",
            ChartKind::AverageOrderValue => "aov_trend.png",
            ChartKind::PaymentMix => "payment_distribution.png",
            ChartKind::TopCategories => "top10_categories_revenue.png",
            ChartKind::CohortRetention => "cohort_retention_heatmap.png",
            ChartKind::DeliveryVsReviews => "delivery_delay_vs_reviews.png",
            ChartKind::RevenueByState => "revenue_by_state.png",
        }
    }

    /// File stem, used as the chart's short name in listings.
    pub fn key(self) -> &'static str {
        self.file_name().trim_end_matches(".png")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub kind: ChartKind,
    pub path: PathBuf,
}

/// Renders metric outcomes to PNG files.
pub struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Draw every chart whose metric was produced. Failures are logged and
    /// the chart is left out.
    pub fn render_all(&self, report: &MetricsReport) -> std::io::Result<Vec<RenderedChart>> {
        fs::create_dir_all(&self.output_dir)?;

        let mut rendered = Vec::new();
        for kind in ChartKind::ALL {
            let path = self.output_dir.join(kind.file_name());
            match self.render(kind, report, &path) {
                Some(Ok(())) => {
                    info!(chart = kind.key(), path = %path.display(), "saved chart");
                    rendered.push(RenderedChart { kind, path });
                }
                Some(Err(err)) => {
                    warn!(chart = kind.key(), error = %err, "chart rendering failed");
                }
                None => {}
            }
        }
        Ok(rendered)
    }

    /// `None` when the underlying metric was skipped.
    fn render(
        &self,
        kind: ChartKind,
        report: &MetricsReport,
        path: &Path,
    ) -> Option<Result<(), ChartError>> {
        let result = match kind {
            ChartKind::RevenueTrend => {
                Self::revenue_trend(path, report.revenue_trend.produced()?, false)
            }
            ChartKind::RevenueGrowth => Self::monthly_line(
                path,
                "Monthly Revenue Growth (%)",
                "Growth %",
                report.revenue_growth.produced()?,
                true,
            ),
            ChartKind::RevenueOrders => {
                Self::revenue_trend(path, report.revenue_trend.produced()?, true)
            }
            ChartKind::AverageOrderValue => Self::monthly_line(
                path,
                "Average Order Value (AOV) Over Time",
                "AOV (BRL)",
                report.average_order_value.produced()?,
                false,
            ),
            ChartKind::PaymentMix => {
                Self::payment_mix(path, report.payment_distribution.produced()?)
            }
            ChartKind::TopCategories => {
                let bars: Vec<(String, f64)> = report
                    .category_contribution
                    .produced()?
                    .iter()
                    .map(|c| (c.category.clone(), c.revenue))
                    .collect();
                plotter::horizontal_bar_chart(
                    path,
                    "Top 10 Categories by Revenue",
                    "Revenue (BRL)",
                    &bars,
                    0,
                )
            }
            ChartKind::CohortRetention => {
                Self::cohort_heatmap(path, report.cohort_retention.produced()?)
            }
            ChartKind::DeliveryVsReviews => {
                Self::delivery_boxes(path, report.delivery_vs_reviews.produced()?)
            }
            ChartKind::RevenueByState => {
                let bars: Vec<(String, f64)> = report
                    .revenue_by_state
                    .produced()?
                    .iter()
                    .map(|s| (s.state.clone(), s.revenue))
                    .collect();
                plotter::horizontal_bar_chart(
                    path,
                    "Top 15 States by Revenue",
                    "Revenue (BRL)",
                    &bars,
                    3,
                )
            }
        };
        Some(result)
    }

    fn revenue_trend(
        path: &Path,
        trend: &RevenueTrend,
        with_orders: bool,
    ) -> Result<(), ChartError> {
        let labels: Vec<String> = trend.points.iter().map(|p| month_label(p.month)).collect();
        let revenue: Vec<f64> = trend.points.iter().map(|p| p.revenue).collect();
        let orders: Vec<f64> = trend.points.iter().map(|p| p.orders as f64).collect();

        let primary = LineSpec {
            label: "Revenue (BRL)",
            values: &revenue,
            color: LINE_COLOR,
        };
        if with_orders {
            plotter::line_chart(
                path,
                "Revenue & Unique Orders (Monthly)",
                &labels,
                primary,
                Some(LineSpec {
                    label: "Unique Orders",
                    values: &orders,
                    color: SECONDARY_COLOR,
                }),
                false,
            )
        } else {
            plotter::line_chart(path, "Monthly Revenue (BRL)", &labels, primary, None, false)
        }
    }

    fn monthly_line(
        path: &Path,
        title: &str,
        y_desc: &str,
        series: &[MonthlyValue],
        zero_rule: bool,
    ) -> Result<(), ChartError> {
        let labels: Vec<String> = series.iter().map(|p| month_label(p.month)).collect();
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        plotter::line_chart(
            path,
            title,
            &labels,
            LineSpec {
                label: y_desc,
                values: &values,
                color: LINE_COLOR,
            },
            None,
            zero_rule,
        )
    }

    fn payment_mix(path: &Path, dist: &PaymentDistribution) -> Result<(), ChartError> {
        let slices: Vec<(String, f64)> = dist
            .shares
            .iter()
            .zip(dist.percentages())
            .map(|(s, pct)| (s.payment_type.clone(), pct))
            .collect();
        plotter::pie_chart(path, "Payment Method Distribution", &slices)
    }

    fn cohort_heatmap(path: &Path, cohorts: &CohortRetention) -> Result<(), ChartError> {
        let labels: Vec<String> = cohorts
            .rows
            .iter()
            .map(|r| month_label(r.cohort_month))
            .collect();
        let offsets: Vec<String> = cohorts.offsets.iter().map(|o| o.to_string()).collect();
        let cells: Vec<Vec<f64>> = cohorts.rows.iter().map(|r| r.retention.clone()).collect();
        plotter::heatmap(
            path,
            "Customer Retention by Cohort (% of cohort continuing)",
            "Months since First Purchase",
            "Cohort Month",
            &labels,
            &offsets,
            &cells,
        )
    }

    fn delivery_boxes(path: &Path, review: &DeliveryReview) -> Result<(), ChartError> {
        let boxes: Vec<BoxSpec> = review
            .by_score
            .iter()
            .map(|s| BoxSpec {
                label: s.score.to_string(),
                q1: s.q1,
                median: s.median,
                q3: s.q3,
                whisker_low: s.whisker_low,
                whisker_high: s.whisker_high,
                outliers: review
                    .observations
                    .iter()
                    .filter(|o| o.review_score.round() as i64 == s.score)
                    .map(|o| o.delay_days as f64)
                    .filter(|d| *d < s.whisker_low || *d > s.whisker_high)
                    .collect(),
            })
            .collect();
        plotter::box_plot(
            path,
            "Delivery Delay (days) by Review Score",
            "Review Score (1-5)",
            "Delay (days)",
            &boxes,
        )
    }
}
