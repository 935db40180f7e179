// src/process/sector.rs

use std::collections::HashSet;

use tracing::info;

use super::{pivot, PivotTable};
use crate::error::ReshapeError;
use crate::schema::FlatRecord;

/// Pivot one year of per-sector records onto `(sector × fuel)`.
///
/// Rows are the sector descriptions seen for `year`, in first-appearance
/// order. Records for other years are ignored.
pub fn pivot_by_sector(
    records: &[FlatRecord],
    year: i32,
) -> Result<PivotTable<String>, ReshapeError> {
    let sector_of = |r: &FlatRecord| -> Result<Option<String>, ReshapeError> {
        if r.period != year {
            return Ok(None);
        }
        r.sector_description
            .clone()
            .map(Some)
            .ok_or_else(|| ReshapeError::MissingField {
                field: "sectorDescription",
                period: r.period,
                fuel: r.fuel_description.clone(),
            })
    };

    let mut seen = HashSet::new();
    let mut sectors = Vec::new();
    for rec in records {
        if let Some(sector) = sector_of(rec)? {
            if seen.insert(sector.clone()) {
                sectors.push(sector);
            }
        }
    }

    pivot(records, "sector", sectors, sector_of)
}

#[tracing::instrument(level = "info", skip(records), fields(records = records.len()))]
pub fn sector_netgen_table(
    records: &[FlatRecord],
    year: i32,
) -> Result<PivotTable<String>, ReshapeError> {
    let mut table = pivot_by_sector(records, year)?;
    table.sort_columns_by_mean();
    info!(
        sectors = table.rows().len(),
        fuels = table.columns().len(),
        "sector table ready"
    );
    Ok(table)
}

/// Break the longest label onto two lines at the space closest to its
/// middle. Display only; the table keeps the original names.
pub fn wrap_longest_label(labels: &[String]) -> Vec<String> {
    let mut out = labels.to_vec();
    let Some((idx, longest)) = labels
        .iter()
        .enumerate()
        .max_by_key(|(i, l)| (l.chars().count(), std::cmp::Reverse(*i)))
    else {
        return out;
    };

    let mid = longest.len() / 2;
    let split = longest
        .match_indices(' ')
        .map(|(i, _)| i)
        .min_by_key(|&i| i.abs_diff(mid));
    if let Some(at) = split {
        out[idx] = format!("{}\n{}", &longest[..at], &longest[at + 1..]);
    }
    out
}
