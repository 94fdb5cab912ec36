//! Revenue by customer state via zip-prefix geolocation.

use serde::Serialize;
use std::collections::HashMap;

use super::{require_columns, Derivation, SkipReason};
use crate::data::columns::{self, CUSTOMER_ID, CUSTOMER_ZIP, GEO_STATE, GEO_ZIP};
use crate::data::{DatasetKind, Datasets, FactTable};

pub const TOP_STATES: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRevenue {
    pub state: String,
    pub revenue: f64,
}

#[derive(Default)]
struct StateTally {
    // (state, count) in first-seen order
    counts: Vec<(String, usize)>,
}

impl StateTally {
    fn add(&mut self, state: &str) {
        match self.counts.iter_mut().find(|(s, _)| s == state) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((state.to_string(), 1)),
        }
    }

    /// Most frequent state; ties go to the one observed first.
    fn mode(self) -> Option<String> {
        let mut best: Option<(String, usize)> = None;
        for (state, count) in self.counts {
            if best.as_ref().map_or(true, |(_, top)| count > *top) {
                best = Some((state, count));
            }
        }
        best.map(|(state, _)| state)
    }
}

/// Collapse many geolocation rows per zip prefix to a single state.
///
/// Null states are ignored; a prefix whose states are all null maps to `None`.
pub fn collapse_zip_states(
    zips: &[Option<String>],
    states: &[Option<String>],
) -> HashMap<String, Option<String>> {
    let mut tallies: HashMap<&str, StateTally> = HashMap::new();
    for (zip, state) in zips.iter().zip(states) {
        let Some(zip) = zip.as_deref() else {
            continue;
        };
        let tally = tallies.entry(zip).or_default();
        if let Some(state) = state.as_deref() {
            tally.add(state);
        }
    }

    tallies
        .into_iter()
        .map(|(zip, tally)| (zip.to_string(), tally.mode()))
        .collect()
}

pub fn revenue_by_state(datasets: &Datasets, fact: &FactTable) -> Derivation<Vec<StateRevenue>> {
    compute(datasets, fact).into()
}

fn compute(datasets: &Datasets, fact: &FactTable) -> Result<Vec<StateRevenue>, SkipReason> {
    let geolocation = datasets.require(DatasetKind::Geolocation)?;
    let customers = datasets.require(DatasetKind::Customers)?;
    require_columns(geolocation, "geolocation", &[GEO_ZIP, GEO_STATE])?;
    require_columns(customers, "customers", &[CUSTOMER_ID, CUSTOMER_ZIP])?;
    require_columns(fact.frame(), "fact", &[CUSTOMER_ID])?;

    let zip_state = collapse_zip_states(
        &columns::string_values(geolocation, GEO_ZIP)?,
        &columns::string_values(geolocation, GEO_STATE)?,
    );

    // customer_id -> state of each matching customer row
    let mut customer_states: HashMap<String, Vec<Option<String>>> = HashMap::new();
    for (customer, zip) in columns::string_values(customers, CUSTOMER_ID)?
        .into_iter()
        .zip(columns::string_values(customers, CUSTOMER_ZIP)?)
    {
        let Some(customer) = customer else {
            continue;
        };
        let state = zip.and_then(|z| zip_state.get(&z).cloned().flatten());
        customer_states.entry(customer).or_default().push(state);
    }

    let mut revenue_by_customer: HashMap<String, f64> = HashMap::new();
    for (customer, revenue) in columns::string_values(fact.frame(), CUSTOMER_ID)?
        .into_iter()
        .zip(fact.revenue()?)
    {
        if let Some(customer) = customer {
            *revenue_by_customer.entry(customer).or_insert(0.0) += revenue;
        }
    }

    let mut totals: HashMap<String, f64> = HashMap::new();
    for (customer, revenue) in &revenue_by_customer {
        let Some(states) = customer_states.get(customer) else {
            continue;
        };
        for state in states.iter().flatten() {
            *totals.entry(state.clone()).or_insert(0.0) += revenue;
        }
    }

    let mut ranked: Vec<StateRevenue> = totals
        .into_iter()
        .map(|(state, revenue)| StateRevenue { state, revenue })
        .collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.state.cmp(&b.state))
    });
    ranked.truncate(TOP_STATES);

    if ranked.is_empty() {
        return Err(SkipReason::Empty("mapping customers to states"));
    }
    Ok(ranked)
}
