pub mod arrow;
pub mod types;

pub use self::arrow::{build_arrow_schema, to_record_batch, IndexKey};
pub use self::types::{BoundaryTable, FlatRecord, Region};
