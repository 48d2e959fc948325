//! Fixtures and assertions for testing the job.
//!
//! [`SAMPLE_CSV`] is a six-row extract in the column order of the public
//! hotel reviews dataset. It contains:
//!
//! - one exact duplicate row,
//! - one row with an empty cell,
//! - two distinct hotels, one of them reviewed three times,
//! - one row whose date and day count cannot be parsed.
//!
//! The [`expected`] constants hold what a run over it must produce.
//!
//! ```no_run
//! use hotel_reviews_etl::etl::run_job;
//! use hotel_reviews_etl::testing::{expected, test_config, write_sample_csv};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let source = write_sample_csv(dir.path())?;
//! let metrics = run_job(test_config(dir.path(), &source))?;
//! assert_eq!(metrics.clean_rows, expected::CLEAN_ROWS);
//! # Ok(())
//! # }
//! ```

use crate::config::{EtlConfig, ExecutionKind};
use crate::warehouse::RetryPolicy;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fmt::Debug;
use std::fs;
use std::hash::Hash;
use std::path::{Path, PathBuf};

pub const SAMPLE_HEADER: &str = "Hotel_Address,Additional_Number_of_Scoring,Review_Date,Average_Score,Hotel_Name,Reviewer_Nationality,Negative_Review,Review_Total_Negative_Word_Counts,Total_Number_of_Reviews,Positive_Review,Review_Total_Positive_Word_Counts,Total_Number_of_Reviews_Reviewer_Has_Given,Reviewer_Score,Tags,days_since_review,lat,lng";

pub const SAMPLE_CSV: &str = "\
Hotel_Address,Additional_Number_of_Scoring,Review_Date,Average_Score,Hotel_Name,Reviewer_Nationality,Negative_Review,Review_Total_Negative_Word_Counts,Total_Number_of_Reviews,Positive_Review,Review_Total_Positive_Word_Counts,Total_Number_of_Reviews_Reviewer_Has_Given,Reviewer_Score,Tags,days_since_review,lat,lng
s Gravesandestraat 55 Oost 1092 AA Amsterdam Netherlands,194,8/3/2017,7.7,Hotel Arena, Russia , I am so angry that i made this post available ,397,1403, Only the park outside of the hotel was beautiful ,11,7,2.9,\"[' Leisure trip ', ' Couple ', ' Duplex Double Room ']\",0 days,52.3605759,4.9159683
s Gravesandestraat 55 Oost 1092 AA Amsterdam Netherlands,194,7/31/2017,7.7,Hotel Arena, Ireland ,No Negative,0,1403, No real complaints the hotel was great ,105,7,7.5,\"[' Leisure trip ', ' Couple ']\",3 days,52.3605759,4.9159683
s Gravesandestraat 55 Oost 1092 AA Amsterdam Netherlands,194,8/3/2017,7.7,Hotel Arena, Russia , I am so angry that i made this post available ,397,1403, Only the park outside of the hotel was beautiful ,11,7,2.9,\"[' Leisure trip ', ' Couple ', ' Duplex Double Room ']\",0 days,52.3605759,4.9159683
1 Example Street London United Kingdom,50,8/3/2017,8.4,Hotel X, United Kingdom , Small room ,3,900, Great staff ,3,2,9.2,\"[' Business trip ', ' Solo traveler ']\",25 days,51.5072,-0.1276
1 Example Street London United Kingdom,50,8/1/2017,8.4,Hotel X, France ,,0,900, Lovely breakfast ,2,1,8.8,\"[' Leisure trip ']\",27 days,51.5072,-0.1276
1 Example Street London United Kingdom,50,31/12/2016,8.4,Hotel X, Germany , Noisy street ,2,900, Close to the tube ,4,12,6.3,\"[' Business trip ']\",recently,51.5072,-0.1276
";

/// What a run over [`SAMPLE_CSV`] produces.
pub mod expected {
    pub const INPUT_ROWS: usize = 6;
    pub const ROWS_WITH_NULLS: usize = 1;
    pub const DUPLICATE_ROWS: usize = 1;
    pub const CLEAN_ROWS: usize = 4;
    pub const HOTELS: usize = 2;
    pub const REVIEWERS: usize = 4;
    pub const REVIEW_TEXTS: usize = 4;
    pub const FACTS: usize = 4;
    pub const UNPARSED_DATES: usize = 1;
    pub const UNPARSED_DAYS: usize = 1;
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_csv(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

/// Write [`SAMPLE_CSV`] as `dir/hotel_dataset.csv`.
pub fn write_sample_csv(dir: &Path) -> Result<PathBuf> {
    write_csv(dir, "hotel_dataset.csv", SAMPLE_CSV)
}

/// Sequential, retry-without-sleep configuration reading `source` and
/// writing to `dir/warehouse`, creating the schema on first use.
#[must_use]
pub fn test_config(dir: &Path, source: &Path) -> EtlConfig {
    let mut cfg = EtlConfig::default();
    cfg.source.path = source.to_path_buf();
    cfg.warehouse.root = dir.join("warehouse");
    cfg.warehouse.create_schema = true;
    cfg.warehouse.retry = RetryPolicy {
        initial_backoff_ms: 0,
        ..RetryPolicy::default()
    };
    cfg.execution.mode = ExecutionKind::Sequential;
    cfg
}

/// Assert that two collections contain the same elements, ignoring order.
///
/// # Panics
///
/// Panics if the collections differ in length or content.
pub fn assert_collections_unordered_equal<T: Debug + Eq + Hash>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    let actual_set: HashSet<_> = actual.iter().collect();
    let expected_set: HashSet<_> = expected.iter().collect();
    if actual_set != expected_set {
        let missing: Vec<_> = expected_set.difference(&actual_set).collect();
        let extra: Vec<_> = actual_set.difference(&expected_set).collect();
        panic!("Collection content mismatch:\n  Missing elements: {missing:?}\n  Extra elements: {extra:?}");
    }
}

/// Assert that no value occurs twice.
///
/// # Panics
///
/// Panics naming the first repeated value.
pub fn assert_unique<T: Debug + Eq + Hash>(values: impl IntoIterator<Item = T>) {
    let mut seen = HashSet::new();
    for v in values {
        if seen.contains(&v) {
            panic!("value {v:?} occurs more than once");
        }
        seen.insert(v);
    }
}
