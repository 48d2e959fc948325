//! The hotel reviews job.
//!
//! ```text
//! source ─▶ clean ─┬─▶ dim_hotel ───────┐
//!                  ├─▶ dim_reviewer ────┤
//!                  ├─▶ dim_review_text ─┤
//!                  └────────────────────┴─▶ fact_reviews ─▶ validate ─▶ commit
//! ```
//!
//! [`EtlContext`] owns the state of one run: configuration, runner,
//! warehouse and report. It is opened at the start and closed at the
//! end; [`run_job`] does both around [`EtlContext::run`].

mod clean;
mod dimensions;
mod facts;
mod source;

pub use clean::{CleanStats, Cleaned, clean_reviews, extract_days, normalize_date, to_clean_review};
pub use dimensions::{Dimension, build_dimension};
pub use facts::build_facts;
pub use source::{SourceData, read_source};

use crate::config::EtlConfig;
use crate::metrics::RunMetrics;
use crate::records::{
    DIM_HOTEL, DIM_REVIEW_TEXT, DIM_REVIEWER, DimHotel, DimReviewText, DimReviewer, FACT_REVIEWS,
    StarSchema,
};
use crate::runner::Runner;
use crate::validation::{ValidationReport, validate_star_schema};
use crate::warehouse::{CommitSummary, Recovery, Warehouse, recover};
use crate::{Pipeline, from_vec};
use anyhow::{Context, Result};
use tracing::{info, info_span, warn};
use uuid::Uuid;

pub struct EtlContext {
    config: EtlConfig,
    runner: Runner,
    warehouse: Warehouse,
    metrics: RunMetrics,
}

impl EtlContext {
    /// Open the warehouse, repair an interrupted earlier commit, and start a
    /// new run report.
    ///
    /// # Errors
    /// Fails when the warehouse schema does not exist (and may not be
    /// created) or an interrupted commit cannot be repaired.
    pub fn open(config: EtlConfig) -> Result<Self> {
        let warehouse = Warehouse::open(&config.warehouse)?;
        match recover(&warehouse).context("recover warehouse before run")? {
            Recovery::Clean { removed_staging: 0 } => {}
            other => warn!(?other, "Repaired warehouse state left by an earlier run"),
        }
        let run_id = Uuid::new_v4().to_string();
        let runner = config.execution.runner();
        info!(
            run_id = %run_id,
            source = %config.source.path.display(),
            schema_dir = %warehouse.schema_dir().display(),
            format = %warehouse.format(),
            "Opened ETL context"
        );
        let metrics = RunMetrics::new(run_id, config.source.path.clone());
        Ok(Self {
            config,
            runner,
            warehouse,
            metrics,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.metrics.run_id
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    /// Read, clean, and build all four tables in memory.
    pub fn build(&mut self) -> Result<StarSchema> {
        let _span = info_span!("build", run_id = %self.metrics.run_id).entered();
        let strategy = self.config.keys.strategy;

        let source = read_source(&self.config.source)?;
        let p = Pipeline::default();
        let raw = from_vec(&p, source.rows);
        let cleaned = clean_reviews(
            raw,
            source.columns,
            self.config.cleaning.date_order,
            &self.runner,
        )?;
        self.metrics.record_clean(&cleaned.stats);
        let reviews = cleaned.reviews;

        let hotels = build_dimension::<DimHotel>(&reviews, strategy).materialize(&self.runner)?;
        let reviewers =
            build_dimension::<DimReviewer>(&reviews, strategy).materialize(&self.runner)?;
        let review_texts =
            build_dimension::<DimReviewText>(&reviews, strategy).materialize(&self.runner)?;

        let facts = build_facts(&reviews, &hotels, &reviewers, &review_texts, strategy)
            .collect_with(&self.runner)?;

        let star = StarSchema {
            input_rows: cleaned.stats.input_rows,
            clean_rows: cleaned.stats.clean_rows,
            hotels: hotels.collect_with(&self.runner)?,
            reviewers: reviewers.collect_with(&self.runner)?,
            review_texts: review_texts.collect_with(&self.runner)?,
            facts,
        };

        let facts = &star.facts;
        self.metrics
            .record_unmatched("Hotel_ID", facts.iter().filter(|f| f.row.hotel_id.is_none()).count());
        self.metrics.record_unmatched(
            "Reviewer_ID",
            facts.iter().filter(|f| f.row.reviewer_id.is_none()).count(),
        );
        self.metrics.record_unmatched(
            "Review_Text_ID",
            facts.iter().filter(|f| f.row.review_text_id.is_none()).count(),
        );

        info!(
            hotels = star.hotels.len(),
            reviewers = star.reviewers.len(),
            review_texts = star.review_texts.len(),
            facts = star.facts.len(),
            "Built star schema"
        );
        Ok(star)
    }

    /// Check the build; in fail-fast mode a failure stops the run here.
    pub fn validate(&mut self, star: &StarSchema) -> Result<ValidationReport> {
        let report = validate_star_schema(star, &self.config.validation);
        self.metrics.validation_errors = report.errors.len();
        let report = report.enforce(self.config.validation.mode)?;
        info!(checks = report.checks_run, errors = report.errors.len(), "Validated star schema");
        Ok(report)
    }

    /// Stage all four tables, then swap them in as one commit.
    pub fn write(&mut self, star: &StarSchema) -> Result<CommitSummary> {
        let _span = info_span!("write", run_id = %self.metrics.run_id).entered();
        let mut staged = self.warehouse.begin(&self.metrics.run_id)?;

        let hotels = star.dim_hotel_rows();
        staged.stage(&DIM_HOTEL, &hotels)?;
        let reviewers = star.dim_reviewer_rows();
        staged.stage(&DIM_REVIEWER, &reviewers)?;
        let texts = star.dim_review_text_rows();
        staged.stage(&DIM_REVIEW_TEXT, &texts)?;
        let facts = star.fact_rows();
        staged.stage(&FACT_REVIEWS, &facts)?;

        let summary = staged.commit()?;
        self.metrics.record_table(DIM_HOTEL.name, hotels.len());
        self.metrics.record_table(DIM_REVIEWER.name, reviewers.len());
        self.metrics.record_table(DIM_REVIEW_TEXT.name, texts.len());
        self.metrics.record_table(FACT_REVIEWS.name, facts.len());
        Ok(summary)
    }

    /// Build, validate, and commit.
    pub fn run(&mut self) -> Result<CommitSummary> {
        let star = self.build()?;
        self.validate(&star)?;
        self.write(&star)
    }

    /// Remove staging leftovers and finish the run report: log it, save it
    /// when configured, and hand it back. A failed `outcome` is returned as
    /// the error after the report has been written.
    pub fn close<T>(mut self, outcome: Result<T>) -> Result<RunMetrics> {
        match &outcome {
            Ok(_) => self.metrics.finish_committed(),
            Err(e) => self.metrics.finish_failed(e),
        }
        if let Err(e) = self.warehouse.tidy_staging() {
            warn!(error = %format!("{e:#}"), "Could not tidy staging area");
        }
        self.metrics.log();

        let saved = match &self.config.report_path {
            Some(path) => self
                .metrics
                .save_to_file(path)
                .with_context(|| format!("save run report to {}", path.display())),
            None => Ok(()),
        };

        match (outcome, saved) {
            (Err(e), Err(save_err)) => {
                warn!(error = %format!("{save_err:#}"), "Run report not saved");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(_), Err(save_err)) => Err(save_err),
            (Ok(_), Ok(())) => Ok(self.metrics),
        }
    }
}

/// Open a context, run the job, and close it.
///
/// # Errors
/// The first failure of the run; the typed conditions are [`crate::EtlError`]
/// values reachable with `downcast_ref`.
pub fn run_job(config: EtlConfig) -> Result<RunMetrics> {
    let mut ctx = EtlContext::open(config)?;
    let outcome = ctx.run();
    ctx.close(outcome)
}
