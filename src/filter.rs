use crate::types::{Dataset, LicenseRecord};
use std::collections::HashSet;

/// The seven filter controls: two inclusive numeric ranges and three
/// set memberships. An empty membership set matches nothing; an inverted
/// range is not validated and simply matches nothing.
#[derive(Debug, Clone)]
pub struct FilterParams {
    pub low_freq: f64,
    pub high_freq: f64,
    pub low_days: i64,
    pub high_days: i64,
    pub provinces: HashSet<String>,
    pub municipalities: HashSet<String>,
    pub holders: HashSet<String>,
}

impl FilterParams {
    /// The widest parameters for a dataset: full range bounds and every
    /// known option selected. This is the initial state of the controls.
    pub fn match_all(dataset: &Dataset) -> Self {
        FilterParams {
            low_freq: dataset.min_freq,
            high_freq: dataset.max_freq,
            low_days: dataset.min_days,
            high_days: dataset.max_days,
            provinces: dataset.provinces.iter().cloned().collect(),
            municipalities: dataset.municipalities.iter().cloned().collect(),
            holders: dataset.holders.iter().cloned().collect(),
        }
    }
}

/// Apply the conjunction of all seven predicates, preserving dataset row
/// order. The result borrows from the dataset; nothing is copied or
/// mutated, and identical inputs always yield the identical view.
pub fn filter_records<'a>(dataset: &'a Dataset, params: &FilterParams) -> Vec<&'a LicenseRecord> {
    dataset
        .records
        .iter()
        .filter(|r| {
            r.frequency >= params.low_freq
                && r.frequency <= params.high_freq
                && r.days_remaining >= params.low_days
                && r.days_remaining <= params.high_days
                && params.provinces.contains(&r.province)
                && params.municipalities.contains(&r.municipality)
                && params.holders.contains(&r.holder_name)
        })
        .collect()
}
