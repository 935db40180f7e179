// src/schema/arrow.rs

use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use std::{fmt::Display, hash::Hash, sync::Arc};

use crate::process::PivotTable;

/// A pivot index type that knows its Arrow representation.
pub trait IndexKey: Clone + Eq + Hash + Display {
    fn data_type() -> DataType;
    fn to_array(keys: &[Self]) -> ArrayRef;
}

impl IndexKey for i32 {
    fn data_type() -> DataType {
        DataType::Int32
    }

    fn to_array(keys: &[Self]) -> ArrayRef {
        Arc::new(Int32Array::from(keys.to_vec()))
    }
}

impl IndexKey for String {
    fn data_type() -> DataType {
        DataType::Utf8
    }

    fn to_array(keys: &[Self]) -> ArrayRef {
        Arc::new(StringArray::from(keys.to_vec()))
    }
}

/// Build an ArrowSchema (inside an Arc) for a pivot table:
/// - the index column (non-nullable, named after the index)
/// - one nullable Float64 column per fuel, in table order
pub fn build_arrow_schema<K: IndexKey>(table: &PivotTable<K>) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = std::iter::once(ArrowField::new(
        table.index_name(),
        K::data_type(),
        /* nullable = */ false,
    ))
    .chain(
        table
            .columns()
            .iter()
            .map(|c| ArrowField::new(c, DataType::Float64, /* nullable = */ true)),
    )
    .collect();

    Arc::new(ArrowSchema::new(fields))
}

/// One RecordBatch holding the whole table; unset cells become nulls.
pub fn to_record_batch<K: IndexKey>(table: &PivotTable<K>) -> Result<RecordBatch, ArrowError> {
    let schema = build_arrow_schema(table);
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len() + 1);
    arrays.push(K::to_array(table.rows()));
    for col in 0..table.columns().len() {
        let values: Vec<Option<f64>> = (0..table.rows().len())
            .map(|row| table.get(row, col))
            .collect();
        arrays.push(Arc::new(Float64Array::from(values)));
    }
    RecordBatch::try_new(schema, arrays)
}
