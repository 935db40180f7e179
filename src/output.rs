// src/output.rs

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::process::PivotTable;
use crate::schema::{to_record_batch, IndexKey};

/// Write `bytes` to `path` atomically: a temp file in the same directory,
/// renamed over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {:?}", dir))?;
    tmp.write_all(bytes)
        .with_context(|| format!("writing temp file for {:?}", path))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming temp file -> {:?}", path))?;

    debug!(path = %path.display(), bytes = bytes.len(), "wrote");
    Ok(())
}

/// Encode a pivot table as a single-row-group Parquet file.
pub fn write_pivot_parquet<K: IndexKey>(table: &PivotTable<K>, path: &Path) -> Result<()> {
    let batch = to_record_batch(table).context("building pivot record batch")?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(Vec::new(), batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(&batch).context("writing pivot batch")?;
    let bytes = writer.into_inner().context("closing Arrow writer")?;

    write_atomic(path, &bytes)
}

/// Read every record batch back out of a Parquet file.
pub fn read_pivot_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {:?}", path))?
        .build()?;
    reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("decoding {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{pivot_by_year, tests::rec};
    use arrow::array::{Array, Float64Array, Int32Array};
    use tempfile::tempdir;

    #[test]
    fn atomic_write_replaces_content() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("chart.svg");

        write_atomic(&path, b"<svg>one</svg>")?;
        write_atomic(&path, b"<svg>two</svg>")?;

        assert_eq!(fs::read_to_string(&path)?, "<svg>two</svg>");
        // no temp files left behind
        assert_eq!(fs::read_dir(path.parent().unwrap())?.count(), 1);
        Ok(())
    }

    #[test]
    fn pivot_survives_parquet() -> Result<()> {
        let table = pivot_by_year(
            &[rec(2020, "wind", 80.0), rec(2021, "solar", 150.0)],
            2020..=2021,
        )?;
        let dir = tempdir()?;
        let path = dir.path().join("general_netgen.parquet");
        write_pivot_parquet(&table, &path)?;

        let batches = read_pivot_batches(&path)?;
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.num_rows(), 2);

        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, ["year", "wind", "solar"]);

        let years = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int32Array>()
            .unwrap();
        assert_eq!(years.values().to_vec(), vec![2020, 2021]);

        let wind = batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(wind.value(0), 80.0);
        assert!(wind.is_null(1));
        Ok(())
    }
}
