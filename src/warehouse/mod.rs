//! Hive-style directory warehouse.
//!
//! A schema is the directory `<root>/<schema>.db`; each table lives in
//! `<root>/<schema>.db/<table>/`. The schema directory must exist before a
//! run unless `create_schema` is set. Tables are only ever fully replaced,
//! through a [`StagedCommit`].

mod commit;
mod format;
mod retry;

pub use commit::{
    CommitJournal, CommitState, CommitSummary, JOURNAL_FILE, JournalEntry, Recovery, STAGING_DIR,
    StagedCommit, SwapPhase, recover,
};
pub use format::{
    ColumnMetadata, METADATA_FILE, PART_FILE_STEM, SUCCESS_MARKER, TableFormat, TableMetadata,
};
pub use retry::RetryPolicy;

use crate::config::WarehouseConfig;
use crate::error::EtlError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone)]
pub struct Warehouse {
    root: PathBuf,
    schema: String,
    format: TableFormat,
    retry: RetryPolicy,
}

impl Warehouse {
    /// Open the configured schema.
    ///
    /// # Errors
    /// [`EtlError::SchemaNotFound`] if the schema directory is missing and
    /// `create_schema` is off; [`EtlError::FormatUnavailable`] if the table
    /// format was compiled out.
    pub fn open(cfg: &WarehouseConfig) -> Result<Warehouse> {
        cfg.format.ensure_available()?;
        let wh = Warehouse {
            root: cfg.root.clone(),
            schema: cfg.schema.clone(),
            format: cfg.format,
            retry: cfg.retry.clone(),
        };
        let dir = wh.schema_dir();
        if !dir.is_dir() {
            if !cfg.create_schema {
                return Err(EtlError::SchemaNotFound {
                    schema: wh.schema.clone(),
                    path: dir,
                }
                .into());
            }
            fs::create_dir_all(&dir).with_context(|| format!("create schema {}", dir.display()))?;
            info!(schema = %wh.schema, path = %dir.display(), "Created warehouse schema");
        }
        Ok(wh)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn format(&self) -> TableFormat {
        self.format
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.root.join(format!("{}.db", self.schema))
    }

    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.schema_dir().join(table)
    }

    /// Start staging tables for `run_id`.
    pub fn begin(&self, run_id: &str) -> Result<StagedCommit<'_>> {
        StagedCommit::begin(self, run_id)
    }

    /// Read every row of a committed table, whatever format it was written in.
    pub fn read_table<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        format::read_table_dir(&self.table_dir(table))
            .with_context(|| format!("read table `{table}`"))
    }

    pub fn table_metadata(&self, table: &str) -> Result<TableMetadata> {
        format::read_metadata(&self.table_dir(table))
    }

    /// Remove the staging root once no run is using it.
    pub fn tidy_staging(&self) -> Result<()> {
        let staging = self.schema_dir().join(STAGING_DIR);
        if staging.is_dir() && fs::read_dir(&staging)?.next().is_none() {
            fs::remove_dir(&staging).with_context(|| format!("remove {}", staging.display()))?;
        }
        Ok(())
    }
}
