use crate::types::{Kpis, LicenseRecord, OwnerRankingRow};
use std::collections::{HashMap, HashSet};

/// Summary KPIs over a filtered view.
///
/// Companies are counted by distinct tax id (two holders with the same
/// display name are distinct companies). The average is rounded with
/// `f64::round` (half away from zero, i.e. half-up for these non-negative
/// values) and defined as 0 for an empty view.
pub fn compute_kpis(view: &[&LicenseRecord]) -> Kpis {
    let record_count = view.len();
    let companies: HashSet<&str> = view.iter().map(|r| r.holder_tax_id.as_str()).collect();
    let company_count = companies.len();
    let avg_per_company = if company_count == 0 {
        0
    } else {
        (record_count as f64 / company_count as f64).round() as i64
    };
    Kpis {
        record_count,
        company_count,
        avg_per_company,
    }
}

/// Top 10 license holders of a filtered view.
///
/// Groups by the (name, tax id) pair, sorts by record count descending with
/// ties broken by tax id then name ascending, and renders each group's share
/// of the whole view as a rounded percentage string. An empty view returns
/// an empty table; the share division only happens against a non-zero total.
pub fn top_owners(view: &[&LicenseRecord]) -> Vec<OwnerRankingRow> {
    let total = view.len();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for r in view {
        *counts
            .entry((r.holder_name.as_str(), r.holder_tax_id.as_str()))
            .or_default() += 1;
    }

    let mut groups: Vec<((&str, &str), usize)> = counts.into_iter().collect();
    groups.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| a.0 .1.cmp(b.0 .1))
            .then_with(|| a.0 .0.cmp(b.0 .0))
    });

    groups
        .into_iter()
        .take(10)
        .enumerate()
        .map(|(idx, ((name, tax_id), count))| {
            let share = (count as f64 / total as f64 * 100.0).round() as i64;
            OwnerRankingRow {
                rank: idx + 1,
                holder_name: name.to_string(),
                holder_tax_id: tax_id.to_string(),
                radio_links: count,
                share: format!("{}%", share),
            }
        })
        .collect()
}
