// tests/end_to_end.rs
use anyhow::Result;
use hotel_reviews_etl::config::EtlConfig;
use hotel_reviews_etl::etl::run_job;
use hotel_reviews_etl::metrics::{RunMetrics, RunOutcome};
use hotel_reviews_etl::records::{
    DIM_HOTEL, DIM_REVIEW_TEXT, DIM_REVIEWER, DimHotel, DimReviewText, DimReviewer, FACT_REVIEWS,
    FactReview, TABLES,
};
use hotel_reviews_etl::testing::{
    assert_collections_unordered_equal, assert_unique, expected, test_config, write_sample_csv,
};
use hotel_reviews_etl::validation::ValidationMode;
use hotel_reviews_etl::warehouse::{TableFormat, Warehouse};
use hotel_reviews_etl::EtlError;
use std::path::Path;

fn csv_config(dir: &Path) -> Result<EtlConfig> {
    let source = write_sample_csv(dir)?;
    let mut cfg = test_config(dir, &source);
    cfg.warehouse.format = TableFormat::Csv;
    Ok(cfg)
}

fn assert_sample_tables(wh: &Warehouse) -> Result<()> {
    let hotels: Vec<DimHotel> = wh.read_table(DIM_HOTEL.name)?;
    let reviewers: Vec<DimReviewer> = wh.read_table(DIM_REVIEWER.name)?;
    let texts: Vec<DimReviewText> = wh.read_table(DIM_REVIEW_TEXT.name)?;
    let facts: Vec<FactReview> = wh.read_table(FACT_REVIEWS.name)?;

    assert_eq!(hotels.len(), expected::HOTELS);
    assert_eq!(texts.len(), expected::REVIEW_TEXTS);
    assert_eq!(facts.len(), expected::FACTS);

    let nationalities: Vec<String> = reviewers.iter().map(|r| r.reviewer_nationality.clone()).collect();
    assert_collections_unordered_equal(
        &nationalities,
        &[" Russia ", " Ireland ", " United Kingdom ", " Germany "].map(String::from),
    );

    assert_unique(facts.iter().map(|f| f.review_id));
    let hotel_ids: Vec<i64> = hotels.iter().map(|h| h.hotel_id).collect();
    let reviewer_ids: Vec<i64> = reviewers.iter().map(|r| r.reviewer_id).collect();
    let text_ids: Vec<i64> = texts.iter().map(|t| t.review_text_id).collect();
    for fact in &facts {
        assert!(fact.hotel_id.is_some_and(|id| hotel_ids.contains(&id)));
        assert!(fact.reviewer_id.is_some_and(|id| reviewer_ids.contains(&id)));
        assert!(fact.review_text_id.is_some_and(|id| text_ids.contains(&id)));
    }
    Ok(())
}

fn open_warehouse(cfg: &EtlConfig) -> Result<Warehouse> {
    Warehouse::open(&cfg.warehouse)
}

#[test]
fn a_run_commits_the_star_schema() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = csv_config(dir.path())?;
    let metrics = run_job(cfg.clone())?;

    assert_eq!(metrics.outcome, RunOutcome::Committed);
    assert_eq!(metrics.input_rows, expected::INPUT_ROWS);
    assert_eq!(metrics.rows_with_nulls, expected::ROWS_WITH_NULLS);
    assert_eq!(metrics.duplicate_rows, expected::DUPLICATE_ROWS);
    assert_eq!(metrics.clean_rows, expected::CLEAN_ROWS);
    assert_eq!(metrics.unparsed_dates, expected::UNPARSED_DATES);
    assert_eq!(metrics.unparsed_days_since_review, expected::UNPARSED_DAYS);
    assert_eq!(metrics.validation_errors, 0);
    assert_eq!(metrics.table_rows.get("dim_hotel"), Some(&expected::HOTELS));
    assert_eq!(metrics.table_rows.get("fact_reviews"), Some(&expected::FACTS));
    assert!(metrics.unmatched_foreign_keys.values().all(|n| *n == 0));
    assert!(metrics.finished_at.is_some());

    let wh = open_warehouse(&cfg)?;
    assert_sample_tables(&wh)?;
    for table in TABLES {
        assert_eq!(wh.table_metadata(table.name)?.run_id, metrics.run_id);
    }
    assert!(!wh.schema_dir().join("_staging").exists());
    Ok(())
}

#[test]
fn a_second_run_replaces_instead_of_appending() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = csv_config(dir.path())?;
    let first = run_job(cfg.clone())?;
    let second = run_job(cfg.clone())?;

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.table_rows, second.table_rows);

    let wh = open_warehouse(&cfg)?;
    assert_sample_tables(&wh)?;
    assert_eq!(wh.table_metadata(FACT_REVIEWS.name)?.run_id, second.run_id);
    Ok(())
}

#[test]
fn parallel_runs_write_the_same_tables() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = csv_config(dir.path())?;
    cfg.execution.mode = hotel_reviews_etl::config::ExecutionKind::Parallel;
    cfg.execution.threads = Some(2);
    cfg.execution.partitions = Some(4);
    let metrics = run_job(cfg.clone())?;

    assert_eq!(metrics.clean_rows, expected::CLEAN_ROWS);
    assert_sample_tables(&open_warehouse(&cfg)?)
}

#[test]
fn the_report_is_saved_when_configured() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = csv_config(dir.path())?;
    let report = dir.path().join("reports/run.json");
    cfg.report_path = Some(report.clone());

    let metrics = run_job(cfg)?;
    let saved = RunMetrics::load_from_file(&report)?;
    assert_eq!(saved, metrics);
    Ok(())
}

#[test]
fn failed_validation_stops_before_anything_is_written() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = csv_config(dir.path())?;
    // the sample drops 2 of 6 rows
    cfg.validation.max_dropped_ratio = Some(0.1);
    let report = dir.path().join("run.json");
    cfg.report_path = Some(report.clone());

    let err = run_job(cfg.clone()).unwrap_err();
    match err.downcast_ref::<EtlError>() {
        Some(EtlError::Validation(r)) => {
            assert_eq!(r.errors.len(), 1);
            assert_eq!(r.errors[0].check, "dropped-ratio");
        }
        other => panic!("expected Validation error, got {other:?}"),
    }

    let wh = open_warehouse(&cfg)?;
    for table in TABLES {
        assert!(!wh.table_dir(table.name).exists(), "{} was written", table.name);
    }

    let saved = RunMetrics::load_from_file(&report)?;
    assert!(matches!(saved.outcome, RunOutcome::Failed { ref error } if error.contains("dropped-ratio")));
    assert_eq!(saved.validation_errors, 1);
    Ok(())
}

#[test]
fn a_failed_run_keeps_the_previous_tables() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = csv_config(dir.path())?;
    let first = run_job(cfg.clone())?;

    cfg.validation.max_dropped_ratio = Some(0.0);
    assert!(run_job(cfg.clone()).is_err());

    let wh = open_warehouse(&cfg)?;
    for table in TABLES {
        assert_eq!(wh.table_metadata(table.name)?.run_id, first.run_id);
    }
    assert_sample_tables(&wh)
}

#[test]
fn log_and_continue_commits_despite_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = csv_config(dir.path())?;
    cfg.validation.max_dropped_ratio = Some(0.1);
    cfg.validation.mode = ValidationMode::LogAndContinue;

    let metrics = run_job(cfg.clone())?;
    assert_eq!(metrics.outcome, RunOutcome::Committed);
    assert_eq!(metrics.validation_errors, 1);
    assert_sample_tables(&open_warehouse(&cfg)?)
}

#[test]
fn a_missing_schema_fails_without_create() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = csv_config(dir.path())?;
    cfg.warehouse.create_schema = false;

    let err = run_job(cfg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EtlError>(),
        Some(EtlError::SchemaNotFound { .. })
    ));
    Ok(())
}

#[test]
fn a_missing_source_fails_the_run() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut cfg = csv_config(dir.path())?;
    cfg.source.path = dir.path().join("nope.csv");

    let err = run_job(cfg.clone()).unwrap_err();
    assert!(format!("{err:#}").contains("nope.csv"));
    let wh = open_warehouse(&cfg)?;
    assert!(!wh.table_dir(DIM_HOTEL.name).exists());
    Ok(())
}

#[cfg(feature = "io-parquet")]
#[test]
fn parquet_is_the_default_table_format() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let source = write_sample_csv(dir.path())?;
    let cfg = test_config(dir.path(), &source);
    assert_eq!(cfg.warehouse.format, TableFormat::Parquet);

    run_job(cfg.clone())?;
    let wh = open_warehouse(&cfg)?;
    assert!(wh.table_dir(FACT_REVIEWS.name).join("part-00000.parquet").is_file());
    assert_sample_tables(&wh)
}
