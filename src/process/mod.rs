// src/process/mod.rs

//! JSON bytes → normalized, typed [`Table`] → Parquet bytes.
//!
//! The stages run in a fixed order: [`load`], [`normalize`], [`coerce`],
//! [`encode`]. [`convert`] runs all of them without touching any store.

pub mod coerce;
pub mod date_parser;
pub mod encode;
pub mod load;
pub mod normalize;
pub mod table;

pub use coerce::{CoercionRule, CoercionSummary, ColumnTypeSpec};
pub use table::{Column, ColumnData, Table, Value};

use tracing::info;

use crate::error::Result;

/// Output of one conversion.
#[derive(Debug)]
pub struct Converted {
    pub table: Table,
    pub summary: CoercionSummary,
    pub parquet: Vec<u8>,
}

/// Parse, normalize, coerce and encode `bytes`. Fails without partial output
/// on malformed input, colliding column names, or an encoder error.
pub fn convert(bytes: &[u8], spec: &ColumnTypeSpec) -> Result<Converted> {
    let mut table = load::parse_records(bytes)?;
    normalize::normalize_columns(&mut table)?;
    let summary = spec.apply(&mut table);
    let parquet = encode::encode_parquet(&table)?;

    info!(
        rows = table.num_rows(),
        columns = table.num_columns(),
        nulled_cells = summary.total_degraded(),
        parquet_bytes = parquet.len(),
        "converted records"
    );
    Ok(Converted {
        table,
        summary,
        parquet,
    })
}
