//! Source reader: CSV file to typed [`RawRow`]s.

use crate::config::SourceConfig;
use crate::error::EtlError;
use crate::io::csv::read_csv_table;
use crate::records::{ColumnIndex, MEASURE_COLUMNS, REQUIRED_COLUMNS, RawRow};
use crate::schema::{ColumnType, Schema};
use crate::value::Value;
use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A loaded source file.
#[derive(Debug, Clone)]
pub struct SourceData {
    pub path: PathBuf,
    pub schema: Schema,
    pub columns: ColumnIndex,
    pub rows: Vec<RawRow>,
}

/// Read the header and every record, infer column types, and type the cells.
///
/// Rows shorter than the header are padded with nulls; cells past the last
/// header column are ignored.
///
/// # Errors
/// [`EtlError::SchemaMismatch`] when a required column is missing or a header
/// repeats, [`EtlError::EmptyInput`] when there is no data row.
pub fn read_source(cfg: &SourceConfig) -> Result<SourceData> {
    let path = cfg.path.clone();
    if !cfg.delimiter.is_ascii() {
        bail!("delimiter {:?} is not a single-byte character", cfg.delimiter);
    }
    let table = read_csv_table(&path, cfg.delimiter as u8)?;
    if table.records.is_empty() {
        return Err(EtlError::EmptyInput { path }.into());
    }

    let schema = Schema::infer(
        &table.headers,
        &table.records,
        cfg.infer_sample_rows,
        &cfg.null_values,
    );
    debug!(path = %path.display(), "Inferred source schema:\n{schema}");
    schema.require(&REQUIRED_COLUMNS, &path)?;
    let columns = ColumnIndex::resolve(&schema)
        .with_context(|| format!("resolve required columns of {}", path.display()))?;

    for name in MEASURE_COLUMNS {
        if schema.column(name).is_some_and(|c| c.ty == ColumnType::Text) {
            warn!(column = name, "Measure column is not numeric; unparseable values cast to null");
        }
    }

    let width = schema.len();
    let mut short_rows = 0usize;
    let rows: Vec<RawRow> = table
        .records
        .iter()
        .map(|rec| {
            if rec.len() < width {
                short_rows += 1;
            }
            RawRow {
                cells: schema
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(i, col)| {
                        rec.get(i)
                            .map_or(Value::Null, |cell| Value::parse(cell, col.ty, &cfg.null_values))
                    })
                    .collect(),
            }
        })
        .collect();
    if short_rows > 0 {
        warn!(short_rows, "Rows shorter than the header were padded with nulls");
    }

    info!(path = %path.display(), rows = rows.len(), columns = width, "Read source");
    Ok(SourceData {
        path,
        schema,
        columns,
        rows,
    })
}
