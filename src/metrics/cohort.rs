//! Customer cohort retention by first-purchase month.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use super::{Derivation, SkipReason};
use crate::data::columns::{self, CUSTOMER_ID};
use crate::data::time;
use crate::data::FactTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRow {
    pub cohort_month: NaiveDate,
    /// Distinct customers at each of `CohortRetention::offsets`; the first
    /// entry is the cohort size.
    pub customers: Vec<u64>,
    /// `customers[i] / customers[0] * 100`.
    pub retention: Vec<f64>,
}

impl CohortRow {
    pub fn size(&self) -> u64 {
        self.customers.first().copied().unwrap_or(0)
    }
}

/// Retention matrix, one row per cohort, sorted by cohort month. Columns are
/// the month offsets observed in any cohort, ascending; a cohort with no
/// activity at one of them holds 0 there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRetention {
    pub offsets: Vec<usize>,
    pub rows: Vec<CohortRow>,
}

/// Customers whose orders all lack a month are left out entirely.
pub fn cohort_retention(fact: &FactTable) -> Derivation<CohortRetention> {
    compute(fact).into()
}

fn compute(fact: &FactTable) -> Result<CohortRetention, SkipReason> {
    if !fact.has_column(CUSTOMER_ID) {
        return Err(SkipReason::missing_column("fact", CUSTOMER_ID));
    }

    let customers = columns::string_values(fact.frame(), CUSTOMER_ID)?;
    let months = fact.months()?;

    let activity: Vec<(String, NaiveDate)> = customers
        .into_iter()
        .zip(months)
        .filter_map(|(customer, month)| Some((customer?, month?)))
        .collect();
    if activity.is_empty() {
        return Err(SkipReason::Empty("dropping orders without customer or month"));
    }

    let mut first_month: HashMap<&str, NaiveDate> = HashMap::new();
    for (customer, month) in &activity {
        first_month
            .entry(customer.as_str())
            .and_modify(|first| *first = (*first).min(*month))
            .or_insert(*month);
    }

    // cohort -> offset -> distinct customers
    let mut cells: BTreeMap<NaiveDate, BTreeMap<usize, HashSet<&str>>> = BTreeMap::new();
    let mut observed: BTreeSet<usize> = BTreeSet::new();
    for (customer, month) in &activity {
        let cohort = first_month[customer.as_str()];
        let index = time::months_between(cohort, *month).max(0) as usize;
        observed.insert(index);
        cells
            .entry(cohort)
            .or_default()
            .entry(index)
            .or_default()
            .insert(customer.as_str());
    }

    // Offset 0 is always observed since every customer has a first month.
    let offsets: Vec<usize> = observed.into_iter().collect();
    let rows = cells
        .into_iter()
        .map(|(cohort_month, by_offset)| {
            let counts: Vec<u64> = offsets
                .iter()
                .map(|index| by_offset.get(index).map_or(0, |m| m.len() as u64))
                .collect();
            let size = counts[0].max(1) as f64;
            let retention = counts.iter().map(|&c| c as f64 / size * 100.0).collect();
            CohortRow {
                cohort_month,
                customers: counts,
                retention,
            }
        })
        .collect();

    Ok(CohortRetention { offsets, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DatasetKind, Datasets, FactBuilder};
    use polars::prelude::*;

    fn ym(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).unwrap()
    }

    fn fact(customers: &[Option<&str>], stamps: &[&str]) -> FactTable {
        let ids: Vec<String> = (0..stamps.len()).map(|i| format!("o{i}")).collect();
        let orders = df!(
            "order_id" => ids,
            "customer_id" => customers.to_vec(),
            "order_purchase_timestamp" => stamps.to_vec(),
        )
        .unwrap();
        FactBuilder::build(&Datasets::default().with_table(DatasetKind::Orders, orders)).unwrap()
    }

    #[test]
    fn repeat_purchase_two_months_later() {
        let fact = fact(
            &[Some("alice"), Some("alice")],
            &["2021-01-10 10:00:00", "2021-03-02 10:00:00"],
        );

        let cohorts = cohort_retention(&fact);
        let cohorts = cohorts.produced().unwrap();

        // No purchase one month in, so there is no offset-1 column.
        assert_eq!(cohorts.offsets, vec![0, 2]);
        assert_eq!(cohorts.rows.len(), 1);
        assert_eq!(cohorts.rows[0].cohort_month, ym(2021, 1));
        assert_eq!(cohorts.rows[0].customers, vec![1, 1]);
        assert_eq!(cohorts.rows[0].retention, vec![100.0, 100.0]);
    }

    #[test]
    fn index_zero_is_always_full_retention() {
        let fact = fact(
            &[Some("a"), Some("b"), Some("c"), Some("a"), Some("d"), None, Some("e")],
            &[
                "2021-01-05",
                "2021-01-20",
                "2021-02-11",
                "2021-02-28",
                "2021-04-01",
                "2021-04-01",
                "unparsable",
            ],
        );

        let cohorts = cohort_retention(&fact);
        let cohorts = cohorts.produced().unwrap();

        assert_eq!(
            cohorts.rows.iter().map(|r| r.cohort_month).collect::<Vec<_>>(),
            vec![ym(2021, 1), ym(2021, 2), ym(2021, 4)]
        );
        assert!(cohorts.rows.iter().all(|r| r.retention[0] == 100.0));
        assert_eq!(cohorts.offsets, vec![0, 1]);
        assert_eq!(cohorts.rows[0].customers, vec![2, 1]);
        assert_eq!(cohorts.rows[2].customers, vec![1, 0]);
        assert_eq!(cohorts.rows[0].retention[1], 50.0);
        // "e" only has an unparsable timestamp, so it joins no cohort.
        assert_eq!(cohorts.rows.iter().map(CohortRow::size).sum::<u64>(), 4);
    }

    #[test]
    fn columns_are_shared_across_cohorts() {
        let fact = fact(
            &[Some("a"), Some("a"), Some("b"), Some("b")],
            &["2021-01-05", "2021-04-05", "2021-02-05", "2021-03-05"],
        );

        let cohorts = cohort_retention(&fact);
        let cohorts = cohorts.produced().unwrap();

        assert_eq!(cohorts.offsets, vec![0, 1, 3]);
        assert_eq!(cohorts.rows[0].customers, vec![1, 0, 1]);
        assert_eq!(cohorts.rows[1].customers, vec![1, 1, 0]);
        assert!(cohorts.rows.iter().all(|r| r.retention.len() == 3));
    }

    #[test]
    fn skipped_without_customer_column() {
        let orders = df!(
            "order_id" => ["o1"],
            "order_purchase_timestamp" => ["2021-01-01"],
        )
        .unwrap();
        let fact =
            FactBuilder::build(&Datasets::default().with_table(DatasetKind::Orders, orders))
                .unwrap();

        assert!(matches!(
            cohort_retention(&fact),
            Derivation::Skipped(SkipReason::MissingColumn { column: CUSTOMER_ID, .. })
        ));
    }
}
