//! Revenue contribution by product category.

use polars::prelude::*;
use serde::Serialize;

use super::{require_columns, Derivation, SkipReason};
use crate::data::columns::{self, ORDER_ID, PRODUCT_CATEGORY, PRODUCT_ID, REVENUE};
use crate::data::{DatasetKind, Datasets, FactTable};

pub const TOP_CATEGORIES: usize = 10;
pub const UNKNOWN_CATEGORY: &str = "Unknown";

const CATEGORY: &str = "category";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub revenue: f64,
}

/// Attribute each item's order revenue to its product category.
///
/// Revenue is joined per item row, so an order with several items counts its
/// full revenue once for each item.
pub fn category_contribution(
    datasets: &Datasets,
    fact: &FactTable,
) -> Derivation<Vec<CategoryRevenue>> {
    compute(datasets, fact).into()
}

fn compute(datasets: &Datasets, fact: &FactTable) -> Result<Vec<CategoryRevenue>, SkipReason> {
    let items = datasets.require(DatasetKind::Items)?;
    let products = datasets.require(DatasetKind::Products)?;
    require_columns(items, "items", &[ORDER_ID, PRODUCT_ID])?;
    require_columns(products, "products", &[PRODUCT_ID, PRODUCT_CATEGORY])?;

    let products = products.clone().lazy().select([
        col(PRODUCT_ID).cast(DataType::String),
        col(PRODUCT_CATEGORY).cast(DataType::String),
    ]);
    let order_revenue = fact
        .frame()
        .clone()
        .lazy()
        .select([col(ORDER_ID).cast(DataType::String), col(REVENUE)]);

    let ranked = items
        .clone()
        .lazy()
        .select([
            col(ORDER_ID).cast(DataType::String),
            col(PRODUCT_ID).cast(DataType::String),
        ])
        .join(
            products,
            [col(PRODUCT_ID)],
            [col(PRODUCT_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .join(
            order_revenue,
            [col(ORDER_ID)],
            [col(ORDER_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(
            col(PRODUCT_CATEGORY)
                .fill_null(lit(UNKNOWN_CATEGORY))
                .alias(CATEGORY),
        )
        .group_by([col(CATEGORY)])
        .agg([col(REVENUE).sum()])
        .sort(
            [REVENUE, CATEGORY],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .limit(TOP_CATEGORIES as IdxSize)
        .collect()?;

    let result: Vec<CategoryRevenue> = columns::string_values(&ranked, CATEGORY)?
        .into_iter()
        .zip(columns::f64_values(&ranked, REVENUE)?)
        .map(|(category, revenue)| CategoryRevenue {
            category: category.unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
            revenue: revenue.unwrap_or(0.0),
        })
        .collect();

    if result.is_empty() {
        return Err(SkipReason::Empty("joining items to products"));
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FactBuilder;

    fn datasets() -> Datasets {
        let orders = df!(
            "order_id" => ["o1", "o2", "o3"],
            "order_purchase_timestamp" => ["2021-01-01", "2021-01-02", "2021-01-03"],
        )
        .unwrap();
        let payments = df!(
            "order_id" => ["o1", "o2", "o3"],
            "payment_value" => ["100", "40", "15"],
        )
        .unwrap();
        let items = df!(
            "order_id" => ["o1", "o2", "o2", "o3", "o9"],
            "product_id" => ["p1", "p2", "p3", "p4", "p1"],
        )
        .unwrap();
        let products = df!(
            "product_id" => ["p1", "p2", "p3"],
            "product_category_name" => [Some("toys"), None, Some("garden")],
        )
        .unwrap();

        Datasets::default()
            .with_table(DatasetKind::Orders, orders)
            .with_table(DatasetKind::Payments, payments)
            .with_table(DatasetKind::Items, items)
            .with_table(DatasetKind::Products, products)
    }

    #[test]
    fn sums_revenue_per_category_with_unknown_bucket() {
        let datasets = datasets();
        let fact = FactBuilder::build(&datasets).unwrap();

        let cats = category_contribution(&datasets, &fact);
        let cats = cats.produced().unwrap();

        // p2 has a null category and p4 is not in products: both are Unknown.
        assert_eq!(
            cats,
            &vec![
                CategoryRevenue { category: "toys".into(), revenue: 100.0 },
                CategoryRevenue { category: "Unknown".into(), revenue: 55.0 },
                CategoryRevenue { category: "garden".into(), revenue: 40.0 },
            ]
        );
    }

    #[test]
    fn skipped_when_products_missing() {
        let datasets = datasets();
        let fact = FactBuilder::build(&datasets).unwrap();
        let without_products = Datasets::default()
            .with_table(DatasetKind::Items, datasets.get(DatasetKind::Items).unwrap().clone());

        assert!(matches!(
            category_contribution(&without_products, &fact),
            Derivation::Skipped(SkipReason::MissingDataset(DatasetKind::Products))
        ));
    }

    #[test]
    fn never_more_than_ten_categories() {
        let n = 14;
        let ids: Vec<String> = (0..n).map(|i| format!("o{i}")).collect();
        let products: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
        let cats: Vec<String> = (0..n).map(|i| format!("cat{i}")).collect();
        let values: Vec<String> = (0..n).map(|i| format!("{}", i + 1)).collect();
        let stamps: Vec<&str> = vec!["2021-05-05"; n];

        let datasets = Datasets::default()
            .with_table(
                DatasetKind::Orders,
                df!("order_id" => &ids, "order_purchase_timestamp" => stamps).unwrap(),
            )
            .with_table(
                DatasetKind::Payments,
                df!("order_id" => &ids, "payment_value" => values).unwrap(),
            )
            .with_table(
                DatasetKind::Items,
                df!("order_id" => &ids, "product_id" => &products).unwrap(),
            )
            .with_table(
                DatasetKind::Products,
                df!("product_id" => &products, "product_category_name" => cats).unwrap(),
            );
        let fact = FactBuilder::build(&datasets).unwrap();

        let ranked = category_contribution(&datasets, &fact);
        let ranked = ranked.produced().unwrap();

        assert_eq!(ranked.len(), TOP_CATEGORIES);
        assert_eq!(ranked[0].category, "cat13");
        assert!(ranked.windows(2).all(|w| w[0].revenue >= w[1].revenue));
    }
}
