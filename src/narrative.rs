//! Strategy deck content: canned consulting text around the rendered charts.

use std::path::PathBuf;

use crate::charts::{ChartKind, RenderedChart};

pub const DECK_TITLE: &str = "Olist E-Commerce: Strategic Analysis";
const DECK_SUBTITLE: &str = "Data-driven recommendations & roadmap";

#[derive(Debug, Clone, PartialEq)]
pub enum Slide {
    Title {
        title: String,
        subtitle: String,
    },
    Bullets {
        title: String,
        lines: Vec<String>,
    },
    ChartInsight {
        title: String,
        image: PathBuf,
        insight: String,
    },
}

impl Slide {
    fn bullets(title: &str, lines: &[&str]) -> Self {
        Slide::Bullets {
            title: title.to_string(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Slide heading and insight paragraph for each chart.
pub fn chart_insight(kind: ChartKind) -> (&'static str, &'static str) {
    match kind {
        ChartKind::RevenueTrend => (
            "Revenue Trend",
            "Revenue shows steady long-term growth with clear seasonal spikes (holiday peaks). \
             Action: Smooth seasonality with off-peak demand programs and subscription offerings.",
        ),
        ChartKind::RevenueGrowth => (
            "Revenue Growth % (MoM)",
            "Growth % is volatile; months of strong growth are followed by shallow months. \
             Action: Focus on retention & continuous promotions to stabilize growth.",
        ),
        ChartKind::RevenueOrders => (
            "Revenue & Orders",
            "Revenue and order counts move together; however, revenue per order can vary. \
             Action: Upsell & cross-sell to increase AOV and revenue resilience.",
        ),
        ChartKind::AverageOrderValue => (
            "Average Order Value (AOV)",
            "AOV is relatively stable. Driving AOV via bundles and recommendations increases \
             short-term revenue without additional CAC.",
        ),
        ChartKind::PaymentMix => (
            "Payment Mix",
            "High dependency on credit: consider PIX, wallets and BNPL to broaden access and \
             reduce single-channel risk.",
        ),
        ChartKind::TopCategories => (
            "Top Categories by Revenue",
            "Top categories account for the majority of revenue. Diversify the category mix and \
             onboard sellers in long-tail categories to reduce concentration risk.",
        ),
        ChartKind::CohortRetention => (
            "Cohort Retention Heatmap",
            "Retention drops quickly after first purchase. Implement onboarding, next-purchase \
             incentives and personalized re-engagement to lift repeat rates.",
        ),
        ChartKind::DeliveryVsReviews => (
            "Delivery Delays vs Customer Ratings",
            "Longer delivery delays heavily skew negative ratings. Invest in last-mile SLAs and \
             shipment tracking to reduce negative reviews and returns.",
        ),
        ChartKind::RevenueByState => (
            "Revenue by State (Top 15)",
            "Revenue concentration by state shows regional strengths. Use targeted logistics & \
             marketing investments in high-potential regions.",
        ),
    }
}

/// Full slide sequence for the consulting deck. Only charts that were
/// actually rendered get a slide.
pub fn strategy_deck(charts: &[RenderedChart]) -> Vec<Slide> {
    let mut slides = vec![
        Slide::Title {
            title: DECK_TITLE.to_string(),
            subtitle: DECK_SUBTITLE.to_string(),
        },
        Slide::bullets(
            "Executive Summary",
            &[
                "Key takeaways:",
                "• Revenue exhibits a strong upward trend, but month-to-month growth is volatile (seasonality & spikes).",
                "• Customer retention declines sharply after the first purchase: high acquisition dependency.",
                "• Top product categories contribute the majority of revenue (concentration risk).",
                "• Delivery delays directly correlate with negative reviews; logistics is the top lever for NPS improvement.",
                "• Payments are dominated by a single method (credit card); diversify payments to improve reach & resilience.",
            ],
        ),
        Slide::bullets(
            "Client Challenge",
            &[
                "Olist seeks sustainable revenue growth while improving customer lifetime value and operational excellence.",
                "Key asks: improve retention, diversify revenue, reduce negative reviews from delivery issues, and expand payment options.",
            ],
        ),
        Slide::bullets(
            "Project Approach (Consulting Methodology)",
            &[
                "1) Data ingestion & validation",
                "2) Descriptive analytics (KPIs, cohorts, categories)",
                "3) Diagnostic analysis (delivery vs satisfaction)",
                "4) Strategic recommendations & implementation roadmap",
            ],
        ),
    ];

    for chart in ChartKind::ALL {
        let Some(rendered) = charts.iter().find(|c| c.kind == chart) else {
            continue;
        };
        let (title, insight) = chart_insight(chart);
        slides.push(Slide::ChartInsight {
            title: title.to_string(),
            image: rendered.path.clone(),
            insight: insight.to_string(),
        });
    }

    slides.push(Slide::bullets(
        "Strategic Recommendations (By Segment)",
        &[
            "Customer: Launch a tiered loyalty program, personalized re-marketing and an onboarding sequence for new customers.",
            "Category: Incentivize seller acquisition in long-tail categories; curated bundles & category-specific promotions.",
            "Logistics: Regional last-mile pilots, SLA-based carrier selection, delivery tracking & customer communication.",
            "Payments: Integrate local payment methods (Pix), wallets and BNPL to increase conversion & cashflow options.",
            "Operations: Improve cancellation & refund workflows; reduce failed deliveries via address validation & pickup points.",
        ],
    ));
    slides.push(Slide::bullets(
        "Implementation Roadmap",
        &[
            "Phase 1 (0-3 months): Retention campaigns, payments integration pilots, delivery KPI dashboard.",
            "Phase 2 (3-6 months): Seller onboarding in priority categories, logistics partner pilots, BNPL pilot.",
            "Phase 3 (6-12 months): Scale category diversification, platform-level loyalty, automated dispute resolution.",
        ],
    ));
    slides.push(Slide::bullets(
        "Projected Impact (Conservative Estimates)",
        &[
            "• Repeat rate +15-20% with targeted retention & loyalty.",
            "• Revenue +10-12% from category diversification and AOV initiatives.",
            "• Negative reviews -30% via delivery SLA improvements.",
            "• Improved conversion via payment diversification (est. +3-5%).",
        ],
    ));

    let mut appendix = vec!["Charts included (see slides):".to_string()];
    appendix.extend(
        ChartKind::ALL
            .iter()
            .filter(|kind| charts.iter().any(|c| c.kind == **kind))
            .map(|kind| format!("• {}", kind.key())),
    );
    slides.push(Slide::Bullets {
        title: "Appendix - Charts".to_string(),
        lines: appendix,
    });

    slides
}
