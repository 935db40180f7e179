use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use eiagen::output::read_pivot_batches;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{env, fs::File, path::Path, process::exit};

fn main() {
    // Expect exactly one CLI argument: path to an exported pivot.
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <PIVOT_PARQUET_FILE>", args[0]);
        exit(1);
    }
    if let Err(e) = inspect_pivot(Path::new(&args[1])) {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

/// Print file metadata, the Arrow schema and every row of the pivot.
fn inspect_pivot(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
    let reader = SerializedFileReader::new(file)?;
    let meta = reader.metadata();
    let file_meta = meta.file_metadata();

    println!("=== Pivot file: {} ===", path.display());
    println!(
        "Created by:           {}",
        file_meta.created_by().unwrap_or("<unknown>")
    );
    println!("Total rows:           {}", file_meta.num_rows());
    println!("Number of row groups: {}", meta.num_row_groups());
    if meta.num_row_groups() > 0 && meta.row_group(0).num_columns() > 0 {
        println!(
            "Compression:          {:?}",
            meta.row_group(0).column(0).compression()
        );
    }
    println!();

    let batches = read_pivot_batches(path)?;
    let Some(first) = batches.first() else {
        println!("(no record batches)");
        return Ok(());
    };

    // first field is the index, the rest are fuels
    let schema = first.schema();
    println!("=== Columns ===");
    for (i, field) in schema.fields().iter().enumerate() {
        let role = if i == 0 { "index" } else { "fuel" };
        println!(
            "- {:<32} | {:<6} | {:?}{}",
            field.name(),
            role,
            field.data_type(),
            if field.is_nullable() { ", nullable" } else { "" }
        );
    }
    println!();

    println!("=== Rows ===");
    println!("{}", pretty_format_batches(&batches)?);
    Ok(())
}
