//! Cleaner: null filtering, exact deduplication, and date / day parsing.

use crate::config::DateOrder;
use crate::keys::content_digest;
use crate::records::{CleanReview, ColumnIndex, RawRow};
use crate::runner::Runner;
use crate::{PCollection, from_vec};
use anyhow::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]{1,2})-([0-9]{1,2})-([0-9]{4})$").expect("date pattern"));
static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit pattern"));

/// Parse review date text after replacing every `/` with `-`.
///
/// Month and day take one or two digits, the year four; the whole cell must
/// match and the date must exist. Anything else is `None`.
pub fn normalize_date(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let text = text.replace('/', "-");
    let caps = DATE_PATTERN.captures(&text)?;
    let first: u32 = caps[1].parse().ok()?;
    let second: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    let (month, day) = match order {
        DateOrder::MonthFirst => (first, second),
        DateOrder::DayFirst => (second, first),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// First run of ASCII digits in `text` as an `i32`; `None` when there is no
/// digit or the number overflows.
pub fn extract_days(text: &str) -> Option<i32> {
    DIGIT_RUN.find(text)?.as_str().parse().ok()
}

/// Typed projection of a raw row that has no null cell.
pub fn to_clean_review(row: &RawRow, cols: &ColumnIndex, order: DateOrder) -> Result<CleanReview> {
    let text = |idx: usize| row.get(idx).as_text().unwrap_or_default();
    Ok(CleanReview {
        source_digest: content_digest(row)?,
        hotel_name: text(cols.hotel_name),
        hotel_address: text(cols.hotel_address),
        average_score: row.get(cols.average_score).clone(),
        reviewer_nationality: text(cols.reviewer_nationality),
        negative_review: text(cols.negative_review),
        positive_review: text(cols.positive_review),
        tags: text(cols.tags),
        review_date: normalize_date(&text(cols.review_date), order),
        reviewer_score: row.get(cols.reviewer_score).clone(),
        review_total_negative_word_counts: row.get(cols.review_total_negative_word_counts).clone(),
        review_total_positive_word_counts: row.get(cols.review_total_positive_word_counts).clone(),
        total_number_of_reviews_reviewer_has_given: row
            .get(cols.total_number_of_reviews_reviewer_has_given)
            .clone(),
        total_number_of_reviews: row.get(cols.total_number_of_reviews).clone(),
        additional_number_of_scoring: row.get(cols.additional_number_of_scoring).clone(),
        days_since_review: extract_days(&text(cols.days_since_review)),
    })
}

/// Row counts observed while cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub input_rows: usize,
    pub rows_with_nulls: usize,
    pub duplicate_rows: usize,
    pub clean_rows: usize,
    pub unparsed_dates: usize,
    pub unparsed_days: usize,
}

pub struct Cleaned {
    pub reviews: PCollection<CleanReview>,
    pub stats: CleanStats,
}

/// Drop rows with a null, then exact duplicates, then parse the derived
/// columns. Malformed dates and day counts become nulls; no row is rejected
/// for them.
///
/// The result is materialized: it feeds all four tables.
pub fn clean_reviews(
    raw: PCollection<RawRow>,
    cols: ColumnIndex,
    order: DateOrder,
    runner: &Runner,
) -> Result<Cleaned> {
    let p = raw.pipeline().clone();
    let input = raw.collect_with(runner)?;
    let input_rows = input.len();

    let non_null = from_vec(&p, input)
        .filter(|r: &RawRow| !r.has_null())
        .collect_with(runner)?;
    let rows_with_nulls = input_rows - non_null.len();
    let non_null_rows = non_null.len();

    let reviews = from_vec(&p, non_null)
        .distinct()
        .try_map(move |r: &RawRow| to_clean_review(r, &cols, order))
        .collect_with(runner)?;

    let stats = CleanStats {
        input_rows,
        rows_with_nulls,
        duplicate_rows: non_null_rows - reviews.len(),
        clean_rows: reviews.len(),
        unparsed_dates: reviews.iter().filter(|r| r.review_date.is_none()).count(),
        unparsed_days: reviews.iter().filter(|r| r.days_since_review.is_none()).count(),
    };
    if stats.unparsed_dates > 0 || stats.unparsed_days > 0 {
        warn!(
            unparsed_dates = stats.unparsed_dates,
            unparsed_days = stats.unparsed_days,
            "Some derived values could not be parsed and were set to null"
        );
    }
    info!(
        input = stats.input_rows,
        with_nulls = stats.rows_with_nulls,
        duplicates = stats.duplicate_rows,
        clean = stats.clean_rows,
        "Cleaned source rows"
    );

    Ok(Cleaned {
        reviews: from_vec(&p, reviews),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn slash_dates_read_month_first_by_default() {
        assert_eq!(normalize_date("8/3/2017", DateOrder::MonthFirst), ymd(2017, 8, 3));
        assert_eq!(normalize_date("12-31-2016", DateOrder::MonthFirst), ymd(2016, 12, 31));
        assert_eq!(normalize_date("8/3/2017", DateOrder::DayFirst), ymd(2017, 3, 8));
    }

    #[test]
    fn malformed_dates_are_none() {
        assert_eq!(normalize_date("31/12/2016", DateOrder::MonthFirst), None);
        assert_eq!(normalize_date("2/30/2017", DateOrder::MonthFirst), None);
        assert_eq!(normalize_date("2017-08-03", DateOrder::MonthFirst), None);
        assert_eq!(normalize_date("8/3/17", DateOrder::MonthFirst), None);
        assert_eq!(normalize_date("yesterday", DateOrder::MonthFirst), None);
        assert_eq!(normalize_date("", DateOrder::MonthFirst), None);
    }

    #[test]
    fn first_digit_run_is_the_day_count() {
        assert_eq!(extract_days("25 days"), Some(25));
        assert_eq!(extract_days("0 day"), Some(0));
        assert_eq!(extract_days("about 3 or 4 days"), Some(3));
        assert_eq!(extract_days("recently"), None);
        assert_eq!(extract_days("99999999999 days"), None);
    }
}
