//! On-disk layout of one table directory.
//!
//! ```text
//! <table>/
//!   part-00000.<ext>
//!   _metadata.json
//!   _SUCCESS
//! ```
//!
//! `_SUCCESS` is written last; a directory without it is incomplete.

use crate::error::EtlError;
use crate::io::csv::{read_csv_vec, write_csv_vec};
use crate::records::TableSpec;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;
use std::fs;
use std::path::Path;

pub const PART_FILE_STEM: &str = "part-00000";
pub const METADATA_FILE: &str = "_metadata.json";
pub const SUCCESS_MARKER: &str = "_SUCCESS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Parquet,
    Csv,
    Jsonl,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Parquet => "parquet",
            TableFormat::Csv => "csv",
            TableFormat::Jsonl => "jsonl",
        }
    }

    /// Fail with [`EtlError::FormatUnavailable`] if the codec for this format
    /// was compiled out.
    pub fn ensure_available(self) -> Result<(), EtlError> {
        let available = match self {
            TableFormat::Csv => true,
            TableFormat::Jsonl => cfg!(feature = "io-jsonl"),
            TableFormat::Parquet => cfg!(feature = "io-parquet"),
        };
        if available {
            Ok(())
        } else {
            Err(EtlError::FormatUnavailable {
                format: self.to_string(),
            })
        }
    }

    pub fn part_file(self) -> String {
        format!("{PART_FILE_STEM}.{}", self.extension())
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
}

/// Contents of `_metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub table: String,
    pub format: TableFormat,
    pub columns: Vec<ColumnMetadata>,
    pub row_count: usize,
    pub run_id: String,
    pub written_at: DateTime<Utc>,
}

/// Write a complete table directory at `dir`, replacing whatever is there.
pub(crate) fn write_table_dir<T>(
    dir: &Path,
    spec: &TableSpec,
    format: TableFormat,
    run_id: &str,
    rows: &[T],
) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("clear {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("mkdir -p {}", dir.display()))?;

    let part = dir.join(format.part_file());
    match format {
        TableFormat::Csv if rows.is_empty() => write_csv_header(&part, spec)?,
        TableFormat::Csv => {
            write_csv_vec(&part, true, rows)?;
        }
        #[cfg(feature = "io-jsonl")]
        TableFormat::Jsonl => {
            crate::io::jsonl::write_jsonl_vec(&part, rows)?;
        }
        #[cfg(feature = "io-parquet")]
        TableFormat::Parquet => {
            crate::io::parquet::write_parquet_vec(&part, spec.columns, rows)?;
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(EtlError::FormatUnavailable {
                format: other.to_string(),
            }
            .into());
        }
    }

    let meta = TableMetadata {
        table: spec.name.to_string(),
        format,
        columns: spec
            .columns
            .iter()
            .map(|(name, ty)| ColumnMetadata {
                name: (*name).to_string(),
                sql_type: (*ty).to_string(),
            })
            .collect(),
        row_count: rows.len(),
        run_id: run_id.to_string(),
        written_at: Utc::now(),
    };
    let meta_path = dir.join(METADATA_FILE);
    fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)
        .with_context(|| format!("write {}", meta_path.display()))?;
    fs::write(dir.join(SUCCESS_MARKER), b"")
        .with_context(|| format!("write success marker in {}", dir.display()))?;
    Ok(())
}

fn write_csv_header(path: &Path, spec: &TableSpec) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(spec.columns.iter().map(|(name, _)| *name))?;
    wtr.flush()?;
    Ok(())
}

pub(crate) fn read_metadata(dir: &Path) -> Result<TableMetadata> {
    let path = dir.join(METADATA_FILE);
    let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
}

/// Read every row of a committed table directory.
pub(crate) fn read_table_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.join(SUCCESS_MARKER).exists() {
        bail!("{} is not a complete table (no {SUCCESS_MARKER})", dir.display());
    }
    let meta = read_metadata(dir)?;
    let part = dir.join(meta.format.part_file());
    match meta.format {
        TableFormat::Csv => read_csv_vec(&part, true),
        #[cfg(feature = "io-jsonl")]
        TableFormat::Jsonl => crate::io::jsonl::read_jsonl_vec(&part),
        #[cfg(feature = "io-parquet")]
        TableFormat::Parquet => crate::io::parquet::read_parquet_vec(&part),
        #[allow(unreachable_patterns)]
        other => Err(EtlError::FormatUnavailable {
            format: other.to_string(),
        }
        .into()),
    }
}
