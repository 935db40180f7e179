// src/process/state.rs

use std::collections::HashSet;

use tracing::{info, warn};

use super::{
    pivot,
    regions::{canonical_name, is_continental},
    PivotTable,
};
use crate::error::ReshapeError;
use crate::schema::{BoundaryTable, FlatRecord, Region};

/// Boundary regions augmented with one generation column per fuel.
///
/// `regions[i].name == table.rows()[i]`, in the canonical spelling for
/// continental regions.
#[derive(Debug, Clone, PartialEq)]
pub struct StateTable {
    year: i32,
    regions: Vec<Region>,
    table: PivotTable<String>,
}

impl StateTable {
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn table(&self) -> &PivotTable<String> {
        &self.table
    }

    pub fn fuels(&self) -> &[String] {
        self.table.columns()
    }

    /// `(region, value)` pairs for one fuel column, in region order.
    pub fn column<'a>(&'a self, fuel: &str) -> Option<Vec<(&'a Region, Option<f64>)>> {
        let values = self.table.column_values(fuel)?;
        Some(self.regions.iter().zip(values).collect())
    }
}

/// Join one year of per-state records onto the boundary regions, then drop
/// everything outside the continental scope.
#[tracing::instrument(level = "info", skip(records, boundaries), fields(records = records.len(), regions = boundaries.len()))]
pub fn netgen_by_state_table(
    records: &[FlatRecord],
    boundaries: BoundaryTable,
    year: i32,
) -> Result<StateTable, ReshapeError> {
    // regions and records are both keyed on the canonical spelling
    let regions = BoundaryTable::from_regions(boundaries.into_regions().into_iter().map(
        |mut region| {
            region.name = join_key(&region.name);
            region
        },
    ))
    .into_regions();
    let names: Vec<String> = regions.iter().map(|r| r.name.clone()).collect();

    let state_of = |r: &FlatRecord| -> Result<Option<String>, ReshapeError> {
        if r.period != year {
            return Ok(None);
        }
        r.state_description
            .as_deref()
            .map(|s| Some(join_key(s)))
            .ok_or_else(|| ReshapeError::MissingField {
                field: "stateDescription",
                period: r.period,
                fuel: r.fuel_description.clone(),
            })
    };

    let known: HashSet<&str> = names.iter().map(String::as_str).collect();
    let mut unmatched = HashSet::new();
    for rec in records {
        if let Some(state) = state_of(rec)? {
            if !known.contains(state.as_str()) && unmatched.insert(state.clone()) {
                warn!(state = %state, "no boundary polygon for state; dropping its records");
            }
        }
    }

    let mut table = pivot(records, "state", names, state_of)?;
    let keep = table.retain_rows(|name| is_continental(name));
    let dropped = keep.iter().filter(|k| !**k).count();
    let regions: Vec<Region> = regions
        .into_iter()
        .zip(keep)
        .filter_map(|(region, k)| k.then_some(region))
        .collect();
    table.sort_columns_by_mean();

    info!(
        kept = regions.len(),
        dropped,
        fuels = table.columns().len(),
        "state table ready"
    );

    Ok(StateTable {
        year,
        regions,
        table,
    })
}

fn join_key(name: &str) -> String {
    canonical_name(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_string())
}
