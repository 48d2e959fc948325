//! CSV I/O.
//!
//! - **Untyped ingestion**: [`read_csv_table`] returns the header and raw
//!   records of a source file so column types can be inferred afterwards.
//! - **Typed I/O** with Serde: [`read_csv_vec`] and [`write_csv_vec`], used for
//!   warehouse tables stored as CSV.
//!
//! Sources may be compressed; see [`compression`](crate::io::compression).

use crate::io::compression::auto_detect_reader;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, create_dir_all};
use std::io::BufWriter;
use std::path::Path;

/// Header plus raw records of a CSV source.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

/// Read every record of a headed CSV file without interpreting cells.
///
/// Records are read in flexible mode: rows shorter or longer than the header
/// are kept as they are and reconciled by the caller.
///
/// # Errors
/// Returns an error if the file cannot be opened, decompressed, or parsed as CSV.
pub fn read_csv_table(path: impl AsRef<Path>, delimiter: u8) -> Result<CsvTable> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)
        .with_context(|| format!("setup decompression for {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(rdr);

    let headers = rdr
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        records.push(rec.with_context(|| format!("parse CSV record #{} in {}", i + 1, path.display()))?);
    }
    Ok(CsvTable { headers, records })
}

/// Read a CSV file into a typed `Vec<T>`.
///
/// # Errors
/// Returns an error if the file cannot be opened or if any row fails to
/// deserialize into `T`.
pub fn read_csv_vec<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    has_headers: bool,
) -> Result<Vec<T>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(has_headers)
        .from_reader(f);
    let mut out = Vec::<T>::new();
    for (i, rec) in rdr.deserialize::<T>().enumerate() {
        out.push(rec.with_context(|| format!("parse CSV record #{}", i + 1))?);
    }
    Ok(out)
}

/// Write a typed slice to a CSV file, creating parent directories.
///
/// `None` fields are written as empty cells.
///
/// # Returns
/// The number of rows written (i.e., `data.len()`).
///
/// # Errors
/// Returns an error if the file/dirs cannot be created or any row fails to
/// serialize/flush.
pub fn write_csv_vec<T: Serialize>(
    path: impl AsRef<Path>,
    has_headers: bool,
    data: &[T],
) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut wtr = WriterBuilder::new()
        .has_headers(has_headers)
        .from_writer(BufWriter::new(f));
    for (i, row) in data.iter().enumerate() {
        wtr.serialize(row)
            .with_context(|| format!("serialize CSV row #{}", i + 1))?;
    }
    wtr.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(data.len())
}
