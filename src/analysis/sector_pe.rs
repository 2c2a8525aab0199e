use std::collections::BTreeMap;

use crate::concurrent_fetcher::SnapshotSet;
use crate::models::{CandidateCompany, SectorStat, SnapshotField};
use crate::utils::positive;

/// Average trailing P/E per sector.
///
/// Only strictly positive, finite P/E values count. Sectors without any
/// qualifying value are left out of the result.
pub fn calculate_sector_averages<'a, I>(entries: I) -> BTreeMap<String, SectorStat>
where
    I: IntoIterator<Item = (&'a str, Option<f64>)>,
{
    let mut totals: BTreeMap<&'a str, (f64, usize)> = BTreeMap::new();
    for (sector, pe) in entries {
        if let Some(pe) = pe.and_then(positive) {
            let entry = totals.entry(sector).or_insert((0.0, 0));
            entry.0 += pe;
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .map(|(sector, (sum, count))| {
            (
                sector.to_string(),
                SectorStat {
                    sector: sector.to_string(),
                    count,
                    average_pe: sum / count as f64,
                },
            )
        })
        .collect()
}

/// Sector averages over the fetched trailing P/E of every company.
pub fn sector_averages(
    companies: &[CandidateCompany],
    snapshots: &SnapshotSet,
) -> BTreeMap<String, SectorStat> {
    calculate_sector_averages(companies.iter().map(|company| {
        let pe = snapshots
            .snapshot(&company.symbol)
            .and_then(|snapshot| snapshot.get(SnapshotField::TrailingPe))
            .map(|reported| reported.value());
        (company.sector.as_str(), pe)
    }))
}
