//! Run report.
//!
//! [`RunMetrics`] accumulates the counts a run observes (rows read, dropped,
//! written, unmatched foreign keys) and the final outcome. It is logged at the
//! end of every run, can be printed for humans, and is optionally saved as
//! JSON next to the job.
//!
//! # Example
//!
//! ```no_run
//! use hotel_reviews_etl::metrics::RunMetrics;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut metrics = RunMetrics::new("run-1", "data/hotel_dataset.csv");
//! metrics.input_rows = 515_738;
//! metrics.record_table("dim_hotel", 1_492);
//! metrics.finish_committed();
//! metrics.print();
//! metrics.save_to_file("run-report.json")?;
//! # Ok(())
//! # }
//! ```

use crate::etl::CleanStats;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum RunOutcome {
    Running,
    Committed,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub run_id: String,
    pub source: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_rows: usize,
    pub rows_with_nulls: usize,
    pub duplicate_rows: usize,
    pub clean_rows: usize,
    pub unparsed_dates: usize,
    pub unparsed_days_since_review: usize,
    /// Rows written per table.
    pub table_rows: BTreeMap<String, usize>,
    /// Fact rows left with a null foreign key, per key column.
    pub unmatched_foreign_keys: BTreeMap<String, usize>,
    pub validation_errors: usize,
    pub outcome: RunOutcome,
}

impl RunMetrics {
    #[must_use]
    pub fn new(run_id: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            run_id: run_id.into(),
            source: source.into(),
            started_at: Utc::now(),
            finished_at: None,
            input_rows: 0,
            rows_with_nulls: 0,
            duplicate_rows: 0,
            clean_rows: 0,
            unparsed_dates: 0,
            unparsed_days_since_review: 0,
            table_rows: BTreeMap::new(),
            unmatched_foreign_keys: BTreeMap::new(),
            validation_errors: 0,
            outcome: RunOutcome::Running,
        }
    }

    pub fn record_clean(&mut self, stats: &CleanStats) {
        self.input_rows = stats.input_rows;
        self.rows_with_nulls = stats.rows_with_nulls;
        self.duplicate_rows = stats.duplicate_rows;
        self.clean_rows = stats.clean_rows;
        self.unparsed_dates = stats.unparsed_dates;
        self.unparsed_days_since_review = stats.unparsed_days;
    }

    pub fn record_table(&mut self, table: &str, rows: usize) {
        self.table_rows.insert(table.to_string(), rows);
    }

    pub fn record_unmatched(&mut self, column: &str, rows: usize) {
        self.unmatched_foreign_keys.insert(column.to_string(), rows);
    }

    pub fn finish_committed(&mut self) {
        self.finished_at = Some(Utc::now());
        self.outcome = RunOutcome::Committed;
    }

    pub fn finish_failed(&mut self, error: &anyhow::Error) {
        self.finished_at = Some(Utc::now());
        self.outcome = RunOutcome::Failed {
            error: format!("{error:#}"),
        };
    }

    /// Wall time of the run, once finished.
    #[must_use]
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Emit the report as one structured `info` event.
    pub fn log(&self) {
        info!(
            run_id = %self.run_id,
            input_rows = self.input_rows,
            rows_with_nulls = self.rows_with_nulls,
            duplicate_rows = self.duplicate_rows,
            clean_rows = self.clean_rows,
            unparsed_dates = self.unparsed_dates,
            unparsed_days_since_review = self.unparsed_days_since_review,
            tables = ?self.table_rows,
            unmatched_foreign_keys = ?self.unmatched_foreign_keys,
            elapsed_ms = self.elapsed_ms(),
            outcome = ?self.outcome,
            "Run finished"
        );
    }

    /// Print the report to stdout in a human-readable format.
    pub fn print(&self) {
        println!("\n============ Run Report ============");
        println!("Run:      {}", self.run_id);
        println!("Source:   {}", self.source.display());
        if let Some(ms) = self.elapsed_ms() {
            println!("Elapsed:  {:.3}s", ms as f64 / 1000.0);
        }
        println!("------------------------------------");
        println!("input rows:          {}", self.input_rows);
        println!("rows with nulls:     {}", self.rows_with_nulls);
        println!("duplicate rows:      {}", self.duplicate_rows);
        println!("clean rows:          {}", self.clean_rows);
        println!("unparsed dates:      {}", self.unparsed_dates);
        println!("unparsed day counts: {}", self.unparsed_days_since_review);
        println!("------------------------------------");
        for (table, rows) in &self.table_rows {
            println!("{table}: {rows}");
        }
        for (column, rows) in &self.unmatched_foreign_keys {
            if *rows > 0 {
                println!("unmatched {column}: {rows}");
            }
        }
        match &self.outcome {
            RunOutcome::Running => println!("outcome: running"),
            RunOutcome::Committed => println!("outcome: committed"),
            RunOutcome::Failed { error } => println!("outcome: FAILED ({error})"),
        }
        println!("====================================\n");
    }

    /// Save the report as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written to.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let formatted = serde_json::to_string_pretty(self)?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_runs_carry_the_error_chain() {
        let mut m = RunMetrics::new("r", "in.csv");
        let err = anyhow::anyhow!("disk full").context("stage dim_hotel");
        m.finish_failed(&err);
        assert_eq!(
            m.outcome,
            RunOutcome::Failed {
                error: "stage dim_hotel: disk full".into()
            }
        );
        assert!(m.elapsed_ms().is_some());
    }

    #[test]
    fn report_survives_a_save() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("reports/run.json");
        let mut m = RunMetrics::new("r", "in.csv");
        m.record_table("fact_reviews", 4);
        m.record_unmatched("Hotel_ID", 0);
        m.finish_committed();
        m.save_to_file(&path)?;
        assert_eq!(RunMetrics::load_from_file(&path)?, m);
        Ok(())
    }
}
