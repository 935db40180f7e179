// src/process/general.rs

use std::ops::RangeInclusive;

use tracing::info;

use super::{pivot, PivotTable};
use crate::error::ReshapeError;
use crate::schema::FlatRecord;

pub const DEFAULT_YEARS: RangeInclusive<i32> = 2010..=2021;

/// Pivot national totals onto `(year × fuel)` over a fixed year range.
/// Records outside `years` are ignored.
pub fn pivot_by_year(
    records: &[FlatRecord],
    years: RangeInclusive<i32>,
) -> Result<PivotTable<i32>, ReshapeError> {
    pivot(records, "year", years.collect(), |r| Ok(Some(r.period)))
}

/// [`pivot_by_year`] with columns ordered smallest-mean first, ready for
/// stacking.
#[tracing::instrument(level = "info", skip(records), fields(records = records.len()))]
pub fn general_netgen_table(
    records: &[FlatRecord],
    years: RangeInclusive<i32>,
) -> Result<PivotTable<i32>, ReshapeError> {
    let mut table = pivot_by_year(records, years)?;
    table.sort_columns_by_mean();
    info!(fuels = table.columns().len(), "general net generation table ready");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::rec;

    #[test]
    fn two_years_two_fuels() -> anyhow::Result<()> {
        let records = vec![
            rec(2020, "Solar", 100.0),
            rec(2021, "Solar", 150.0),
            rec(2020, "Wind", 80.0),
        ];
        let table = pivot_by_year(&records, 2020..=2021)?;

        assert_eq!(table.index_name(), "year");
        assert_eq!(table.rows(), [2020, 2021]);
        assert_eq!(table.columns(), ["Solar", "Wind"]);
        assert_eq!(table.cell(&2020, "Solar"), Some(100.0));
        assert_eq!(table.cell(&2021, "Solar"), Some(150.0));
        assert_eq!(table.cell(&2020, "Wind"), Some(80.0));
        assert_eq!(table.cell(&2021, "Wind"), None);
        Ok(())
    }

    #[test]
    fn range_is_fixed_even_without_data() -> anyhow::Result<()> {
        let records = vec![rec(2015, "coal", 1352.0), rec(2030, "coal", 1.0)];
        let table = general_netgen_table(&records, DEFAULT_YEARS)?;

        assert_eq!(table.rows().len(), 12);
        assert_eq!(table.rows().first(), Some(&2010));
        assert_eq!(table.rows().last(), Some(&2021));
        assert_eq!(table.cell(&2015, "coal"), Some(1352.0));
        assert_eq!(table.column_values("coal").map(|v| v.iter().flatten().count()), Some(1));
        Ok(())
    }

    #[test]
    fn sorted_for_stacking() -> anyhow::Result<()> {
        let records = vec![
            rec(2020, "Solar", 100.0),
            rec(2021, "Solar", 150.0),
            rec(2020, "Wind", 80.0),
        ];
        let table = general_netgen_table(&records, 2020..=2021)?;
        assert_eq!(table.columns(), ["Wind", "Solar"]);
        Ok(())
    }
}
