// src/process/mod.rs
//! Long-format records → dense pivot tables.
//!
//! Every reshaper shares one strategy: group the records by
//! `(row key, fuel description)` once, then fill the `rows × columns` grid
//! from that index. A cell with no record stays unset; a cell with more
//! than one record aborts the reshape.

pub mod general;
pub mod regions;
pub mod sector;
pub mod state;

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fmt::Display,
    hash::Hash,
};

use tracing::{debug, trace};

use crate::error::ReshapeError;
use crate::schema::FlatRecord;

pub use general::{general_netgen_table, pivot_by_year};
pub use sector::{pivot_by_sector, sector_netgen_table, wrap_longest_label};
pub use state::{netgen_by_state_table, StateTable};

/// A dense table: one row per index key, one column per fuel description.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable<K> {
    index_name: String,
    rows: Vec<K>,
    columns: Vec<String>,
    /// Row-major, `rows.len()` vectors of `columns.len()` cells.
    cells: Vec<Vec<Option<f64>>>,
}

impl<K> PivotTable<K> {
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn rows(&self) -> &[K] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Cell by position.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All cells of `column` in row order, or `None` if there is no such column.
    pub fn column_values(&self, column: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(column)?;
        Some(self.cells.iter().map(|r| r[idx]).collect())
    }

    /// Mean over the set cells of a column; `None` when every cell is unset.
    pub fn column_mean(&self, col: usize) -> Option<f64> {
        let (sum, n) = self
            .cells
            .iter()
            .filter_map(|r| r.get(col).copied().flatten())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        (n > 0).then(|| sum / n as f64)
    }

    /// Reorder columns ascending by mean. Columns without any value go last;
    /// ties keep their current order.
    pub fn sort_columns_by_mean(&mut self) {
        let means: Vec<Option<f64>> = (0..self.columns.len())
            .map(|c| self.column_mean(c))
            .collect();
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by(|&a, &b| match (means[a], means[b]) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        self.columns = order.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.cells {
            *row = order.iter().map(|&i| row[i]).collect();
        }
    }

    /// Drop rows whose key fails `keep`. Returns the keep mask in the old
    /// row order so callers can filter parallel data the same way.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&K) -> bool) -> Vec<bool> {
        let mask: Vec<bool> = self.rows.iter().map(|k| keep(k)).collect();
        let mut flags = mask.iter();
        self.rows.retain(|_| *flags.next().unwrap_or(&false));
        let mut flags = mask.iter();
        self.cells.retain(|_| *flags.next().unwrap_or(&false));
        mask
    }
}

impl<K: PartialEq> PivotTable<K> {
    /// Cell by key, `None` if unset or if the row/column does not exist.
    pub fn cell(&self, row: &K, column: &str) -> Option<f64> {
        let r = self.rows.iter().position(|k| k == row)?;
        let c = self.column_index(column)?;
        self.get(r, c)
    }
}

/// Pivot `records` onto the given row keys.
///
/// `row_key` maps a record to its row; `Ok(None)` skips the record (e.g. a
/// year outside the requested range). Keys not present in `rows` are skipped
/// too. Columns are the distinct fuel descriptions of *all* records, in
/// first-appearance order. `rows` must not contain duplicates.
pub fn pivot<K, F>(
    records: &[FlatRecord],
    index_name: &str,
    rows: Vec<K>,
    row_key: F,
) -> Result<PivotTable<K>, ReshapeError>
where
    K: Eq + Hash + Clone + Display,
    F: Fn(&FlatRecord) -> Result<Option<K>, ReshapeError>,
{
    let columns = distinct_fuels(records);
    let col_pos: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let row_pos: HashMap<&K, usize> = rows.iter().enumerate().map(|(i, k)| (k, i)).collect();

    // (row, col) → (value of the first match, number of matches)
    let mut index: HashMap<(usize, usize), (Option<f64>, usize)> = HashMap::new();
    let mut skipped = 0usize;
    for rec in records {
        let Some(key) = row_key(rec)? else {
            skipped += 1;
            continue;
        };
        let Some(&r) = row_pos.get(&key) else {
            trace!(row = %key, "no pivot row for record");
            skipped += 1;
            continue;
        };
        let c = col_pos[rec.fuel_description.as_str()];
        index
            .entry((r, c))
            .and_modify(|(_, n)| *n += 1)
            .or_insert((rec.generation, 1));
    }

    let mut cells = Vec::with_capacity(rows.len());
    for (r, key) in rows.iter().enumerate() {
        let mut row = Vec::with_capacity(columns.len());
        for (c, column) in columns.iter().enumerate() {
            match index.get(&(r, c)) {
                None => row.push(None),
                Some(&(value, 1)) => row.push(value),
                Some(&(_, count)) => {
                    return Err(ReshapeError::DuplicateKey {
                        row: key.to_string(),
                        column: column.clone(),
                        count,
                    })
                }
            }
        }
        cells.push(row);
    }

    debug!(
        index = index_name,
        rows = rows.len(),
        columns = columns.len(),
        filled = index.len(),
        skipped,
        "pivoted records"
    );

    Ok(PivotTable {
        index_name: index_name.to_string(),
        rows,
        columns,
        cells,
    })
}

/// Distinct fuel descriptions in first-appearance order.
fn distinct_fuels(records: &[FlatRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.fuel_description.as_str()))
        .map(|r| r.fuel_description.clone())
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    pub(crate) fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,eiagen::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    pub(crate) fn rec(period: i32, fuel: &str, value: f64) -> FlatRecord {
        FlatRecord::new(period, fuel.to_uppercase(), fuel, Some(value))
    }

    fn by_year(records: &[FlatRecord], rows: Vec<i32>) -> Result<PivotTable<i32>, ReshapeError> {
        pivot(records, "year", rows, |r| Ok(Some(r.period)))
    }

    #[test]
    fn every_cell_is_unset_or_the_unique_match() -> anyhow::Result<()> {
        init_test_logging();
        let records = vec![
            rec(2019, "coal", 900.0),
            rec(2020, "coal", 800.0),
            rec(2020, "solar", 90.0),
            rec(2021, "nuclear", 780.0),
        ];
        let table = by_year(&records, vec![2019, 2020, 2021])?;

        for (r, year) in table.rows().iter().enumerate() {
            for (c, fuel) in table.columns().iter().enumerate() {
                let matches: Vec<f64> = records
                    .iter()
                    .filter(|x| x.period == *year && &x.fuel_description == fuel)
                    .filter_map(|x| x.generation)
                    .collect();
                assert!(matches.len() <= 1);
                assert_eq!(table.get(r, c), matches.first().copied());
            }
        }
        Ok(())
    }

    #[test]
    fn duplicate_key_fails_loudly() {
        let records = vec![
            rec(2020, "solar", 100.0),
            rec(2020, "wind", 80.0),
            rec(2020, "solar", 101.0),
        ];
        let err = by_year(&records, vec![2020]).unwrap_err();
        assert_eq!(
            err,
            ReshapeError::DuplicateKey {
                row: "2020".into(),
                column: "solar".into(),
                count: 2,
            }
        );
    }

    #[test]
    fn duplicates_outside_the_rows_are_ignored() -> anyhow::Result<()> {
        let records = vec![
            rec(2009, "solar", 1.0),
            rec(2009, "solar", 2.0),
            rec(2010, "solar", 3.0),
        ];
        let table = by_year(&records, vec![2010])?;
        assert_eq!(table.cell(&2010, "solar"), Some(3.0));
        Ok(())
    }

    #[test]
    fn zero_matches_leave_cells_unset() -> anyhow::Result<()> {
        let table = by_year(&[rec(2020, "wind", 0.0)], vec![2020, 2021])?;
        // zero generation is a value, absence is not
        assert_eq!(table.cell(&2020, "wind"), Some(0.0));
        assert_eq!(table.cell(&2021, "wind"), None);

        let empty = by_year(&[], vec![2020])?;
        assert!(empty.columns().is_empty());
        assert!(empty.is_empty());
        Ok(())
    }

    #[test]
    fn sort_by_mean_is_ascending_with_empty_columns_last() -> anyhow::Result<()> {
        let mut records = vec![
            rec(2020, "coal", 500.0),
            rec(2021, "coal", 300.0),
            rec(2020, "solar", 10.0),
            rec(2021, "solar", 30.0),
            rec(2020, "gas", 700.0),
        ];
        records.insert(0, FlatRecord::new(2020, "GEO", "geothermal", None));

        let mut table = by_year(&records, vec![2020, 2021])?;
        assert_eq!(table.columns(), ["geothermal", "coal", "solar", "gas"]);

        table.sort_columns_by_mean();
        assert_eq!(table.columns(), ["solar", "coal", "gas", "geothermal"]);
        let means: Vec<f64> = (0..3).filter_map(|c| table.column_mean(c)).collect();
        assert!(means.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(table.column_mean(3), None);

        // cells moved with their columns
        assert_eq!(table.cell(&2021, "coal"), Some(300.0));
        assert_eq!(table.cell(&2021, "gas"), None);
        Ok(())
    }

    #[test]
    fn retain_rows_keeps_cells_aligned() -> anyhow::Result<()> {
        let records = vec![rec(2020, "wind", 1.0), rec(2021, "wind", 2.0), rec(2022, "wind", 3.0)];
        let mut table = by_year(&records, vec![2020, 2021, 2022])?;
        let mask = table.retain_rows(|y| *y != 2021);

        assert_eq!(mask, vec![true, false, true]);
        assert_eq!(table.rows(), [2020, 2022]);
        assert_eq!(table.column_values("wind"), Some(vec![Some(1.0), Some(3.0)]));
        Ok(())
    }

    #[test]
    fn reshaping_is_idempotent() -> anyhow::Result<()> {
        let records = vec![rec(2020, "solar", 100.0), rec(2021, "wind", 5.0)];
        assert_eq!(
            by_year(&records, vec![2020, 2021])?,
            by_year(&records, vec![2020, 2021])?
        );
        Ok(())
    }
}
