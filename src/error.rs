//! Typed failures of the ETL job.
//!
//! Plumbing returns `anyhow::Result`; the conditions a caller may want to
//! match on are raised as [`EtlError`] and can be recovered with
//! `err.downcast_ref::<EtlError>()`.

use crate::validation::ValidationReport;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("source schema mismatch in {path}: {reason}")]
    SchemaMismatch { path: PathBuf, reason: String },

    #[error("source {path} contains no data rows")]
    EmptyInput { path: PathBuf },

    #[error("warehouse schema `{schema}` does not exist at {path}")]
    SchemaNotFound { schema: String, path: PathBuf },

    #[error("validation failed with {} error(s): {}", .0.errors.len(), .0.summary())]
    Validation(ValidationReport),

    #[error("commit of table `{table}` failed (rolled back: {rolled_back}): {message}")]
    Commit {
        table: String,
        message: String,
        rolled_back: bool,
    },

    #[error("writing table `{table}` failed after {attempts} attempt(s): {message}")]
    WriteExhausted {
        table: String,
        attempts: u32,
        message: String,
    },

    #[error("table format `{format}` is not compiled into this build")]
    FormatUnavailable { format: String },
}
