// tests/cleaning.rs
use anyhow::Result;
use chrono::NaiveDate;
use hotel_reviews_etl::config::{DateOrder, SourceConfig};
use hotel_reviews_etl::etl::{clean_reviews, read_source};
use hotel_reviews_etl::records::{CleanReview, DAYS_SINCE_REVIEW};
use hotel_reviews_etl::schema::ColumnType;
use hotel_reviews_etl::testing::{SAMPLE_CSV, SAMPLE_HEADER, expected, write_csv, write_sample_csv};
use hotel_reviews_etl::*;

fn source_config(path: &std::path::Path) -> SourceConfig {
    SourceConfig {
        path: path.to_path_buf(),
        ..SourceConfig::default()
    }
}

fn clean_sample(runner: &Runner, order: DateOrder) -> Result<(usize, Vec<CleanReview>)> {
    let dir = tempfile::tempdir()?;
    let path = write_sample_csv(dir.path())?;
    let source = read_source(&source_config(&path))?;
    let p = Pipeline::default();
    let cleaned = clean_reviews(from_vec(&p, source.rows), source.columns, order, runner)?;
    Ok((cleaned.stats.duplicate_rows, cleaned.reviews.collect_seq()?))
}

#[test]
fn source_schema_is_inferred() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_sample_csv(dir.path())?;
    let source = read_source(&source_config(&path))?;

    assert_eq!(source.rows.len(), expected::INPUT_ROWS);
    assert_eq!(source.schema.len(), 17);
    let ty = |name: &str| source.schema.column(name).map(|c| c.ty);
    assert_eq!(ty("Average_Score"), Some(ColumnType::Double));
    assert_eq!(ty("Total_Number_of_Reviews"), Some(ColumnType::Integer));
    assert_eq!(ty("Review_Date"), Some(ColumnType::Text));
    assert_eq!(ty(DAYS_SINCE_REVIEW), Some(ColumnType::Text));
    Ok(())
}

#[test]
fn cleaning_counts_match_the_sample() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_sample_csv(dir.path())?;
    let source = read_source(&source_config(&path))?;
    let p = Pipeline::default();
    let cleaned = clean_reviews(
        from_vec(&p, source.rows),
        source.columns,
        DateOrder::MonthFirst,
        &Runner::new(ExecMode::Sequential),
    )?;

    let stats = cleaned.stats;
    assert_eq!(stats.input_rows, expected::INPUT_ROWS);
    assert_eq!(stats.rows_with_nulls, expected::ROWS_WITH_NULLS);
    assert_eq!(stats.duplicate_rows, expected::DUPLICATE_ROWS);
    assert_eq!(stats.clean_rows, expected::CLEAN_ROWS);
    assert_eq!(stats.unparsed_dates, expected::UNPARSED_DATES);
    assert_eq!(stats.unparsed_days, expected::UNPARSED_DAYS);
    assert_eq!(cleaned.reviews.collect_seq()?.len(), expected::CLEAN_ROWS);
    Ok(())
}

#[test]
fn parallel_cleaning_keeps_the_same_rows() -> Result<()> {
    let (seq_dupes, mut seq) = clean_sample(&Runner::new(ExecMode::Sequential), DateOrder::MonthFirst)?;
    let (par_dupes, mut par) = clean_sample(
        &Runner::new(ExecMode::Parallel {
            threads: Some(2),
            partitions: Some(3),
        }),
        DateOrder::MonthFirst,
    )?;
    let by_text = |r: &CleanReview| (r.reviewer_nationality.clone(), r.negative_review.clone());
    seq.sort_by_key(by_text);
    par.sort_by_key(by_text);
    assert_eq!(seq, par);
    assert_eq!(seq_dupes, par_dupes);
    Ok(())
}

#[test]
fn the_row_with_an_empty_cell_is_dropped() -> Result<()> {
    let (_, reviews) = clean_sample(&Runner::default(), DateOrder::MonthFirst)?;
    assert!(reviews.iter().all(|r| r.reviewer_nationality != " France "));
    assert!(reviews.iter().all(|r| !r.negative_review.is_empty()));
    Ok(())
}

#[test]
fn derived_columns_are_parsed() -> Result<()> {
    let (_, reviews) = clean_sample(&Runner::new(ExecMode::Sequential), DateOrder::MonthFirst)?;
    let find = |nationality: &str| {
        reviews
            .iter()
            .find(|r| r.reviewer_nationality == nationality)
            .cloned()
    };

    let uk = find(" United Kingdom ").expect("uk review");
    assert_eq!(uk.review_date, NaiveDate::from_ymd_opt(2017, 8, 3));
    assert_eq!(uk.days_since_review, Some(25));
    assert_eq!(uk.reviewer_score, Value::Double(ordered_float::OrderedFloat(9.2)));
    assert_eq!(uk.total_number_of_reviews, Value::Int(900));

    let ireland = find(" Ireland ").expect("ireland review");
    assert_eq!(ireland.review_date, NaiveDate::from_ymd_opt(2017, 7, 31));
    assert_eq!(ireland.days_since_review, Some(3));

    // 31/12/2016 is not a valid month-first date; the row stays.
    let germany = find(" Germany ").expect("germany review");
    assert_eq!(germany.review_date, None);
    assert_eq!(germany.days_since_review, None);
    Ok(())
}

#[test]
fn day_first_order_reads_the_same_text_differently() -> Result<()> {
    let (_, reviews) = clean_sample(&Runner::new(ExecMode::Sequential), DateOrder::DayFirst)?;
    let date_of = |nationality: &str| {
        reviews
            .iter()
            .find(|r| r.reviewer_nationality == nationality)
            .and_then(|r| r.review_date)
    };
    assert_eq!(date_of(" United Kingdom "), NaiveDate::from_ymd_opt(2017, 3, 8));
    assert_eq!(date_of(" Germany "), NaiveDate::from_ymd_opt(2016, 12, 31));
    assert_eq!(date_of(" Ireland "), None);
    Ok(())
}

#[test]
fn short_rows_are_padded_with_nulls() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first_row = SAMPLE_CSV.lines().nth(1).expect("data row");
    // drop lat and lng
    let truncated: Vec<&str> = first_row.rsplitn(3, ',').collect();
    let contents = format!("{SAMPLE_HEADER}\n{}\n{first_row}\n", truncated[2]);
    let path = write_csv(dir.path(), "short.csv", &contents)?;

    let source = read_source(&source_config(&path))?;
    assert_eq!(source.rows.len(), 2);
    assert_eq!(source.rows[0].cells.len(), 17);
    assert!(source.rows[0].has_null());
    assert!(!source.rows[1].has_null());

    let p = Pipeline::default();
    let cleaned = clean_reviews(
        from_vec(&p, source.rows),
        source.columns,
        DateOrder::MonthFirst,
        &Runner::default(),
    )?;
    assert_eq!(cleaned.stats.rows_with_nulls, 1);
    assert_eq!(cleaned.stats.clean_rows, 1);
    Ok(())
}

#[test]
fn missing_required_column_is_a_schema_mismatch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_csv(dir.path(), "narrow.csv", "Hotel_Name,Hotel_Address\nA,B\n")?;
    let err = read_source(&source_config(&path)).unwrap_err();
    match err.downcast_ref::<EtlError>() {
        Some(EtlError::SchemaMismatch { reason, .. }) => {
            assert!(reason.contains("Reviewer_Nationality"), "{reason}");
            assert!(!reason.contains("Hotel_Name"), "{reason}");
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
    Ok(())
}

#[test]
fn header_only_input_is_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_csv(dir.path(), "empty.csv", &format!("{SAMPLE_HEADER}\n"))?;
    let err = read_source(&source_config(&path)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<EtlError>(),
        Some(EtlError::EmptyInput { .. })
    ));
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_sources_are_decompressed() -> Result<()> {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("hotel_dataset.csv.gz");
    let mut enc = GzEncoder::new(std::fs::File::create(&path)?, Compression::default());
    enc.write_all(SAMPLE_CSV.as_bytes())?;
    enc.finish()?;

    let source = read_source(&source_config(&path))?;
    assert_eq!(source.rows.len(), expected::INPUT_ROWS);
    Ok(())
}
