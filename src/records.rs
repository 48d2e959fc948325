//! Row types of the job: raw source rows, cleaned reviews, natural keys, and
//! the four warehouse tables.

use crate::schema::Schema;
use crate::value::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const HOTEL_ADDRESS: &str = "Hotel_Address";
pub const ADDITIONAL_NUMBER_OF_SCORING: &str = "Additional_Number_of_Scoring";
pub const REVIEW_DATE: &str = "Review_Date";
pub const AVERAGE_SCORE: &str = "Average_Score";
pub const HOTEL_NAME: &str = "Hotel_Name";
pub const REVIEWER_NATIONALITY: &str = "Reviewer_Nationality";
pub const NEGATIVE_REVIEW: &str = "Negative_Review";
pub const REVIEW_TOTAL_NEGATIVE_WORD_COUNTS: &str = "Review_Total_Negative_Word_Counts";
pub const TOTAL_NUMBER_OF_REVIEWS: &str = "Total_Number_of_Reviews";
pub const POSITIVE_REVIEW: &str = "Positive_Review";
pub const REVIEW_TOTAL_POSITIVE_WORD_COUNTS: &str = "Review_Total_Positive_Word_Counts";
pub const TOTAL_NUMBER_OF_REVIEWS_REVIEWER_HAS_GIVEN: &str =
    "Total_Number_of_Reviews_Reviewer_Has_Given";
pub const REVIEWER_SCORE: &str = "Reviewer_Score";
pub const TAGS: &str = "Tags";
pub const DAYS_SINCE_REVIEW: &str = "days_since_review";

/// Columns the source must provide.
pub const REQUIRED_COLUMNS: [&str; 15] = [
    HOTEL_ADDRESS,
    ADDITIONAL_NUMBER_OF_SCORING,
    REVIEW_DATE,
    AVERAGE_SCORE,
    HOTEL_NAME,
    REVIEWER_NATIONALITY,
    NEGATIVE_REVIEW,
    REVIEW_TOTAL_NEGATIVE_WORD_COUNTS,
    TOTAL_NUMBER_OF_REVIEWS,
    POSITIVE_REVIEW,
    REVIEW_TOTAL_POSITIVE_WORD_COUNTS,
    TOTAL_NUMBER_OF_REVIEWS_REVIEWER_HAS_GIVEN,
    REVIEWER_SCORE,
    TAGS,
    DAYS_SINCE_REVIEW,
];

/// Measure columns; a non-numeric inferred type means every cast will be null.
pub const MEASURE_COLUMNS: [&str; 7] = [
    AVERAGE_SCORE,
    REVIEWER_SCORE,
    REVIEW_TOTAL_NEGATIVE_WORD_COUNTS,
    REVIEW_TOTAL_POSITIVE_WORD_COUNTS,
    TOTAL_NUMBER_OF_REVIEWS_REVIEWER_HAS_GIVEN,
    TOTAL_NUMBER_OF_REVIEWS,
    ADDITIONAL_NUMBER_OF_SCORING,
];

/// One source row, one typed cell per header column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRow {
    pub cells: Vec<Value>,
}

impl RawRow {
    pub fn has_null(&self) -> bool {
        self.cells.iter().any(Value::is_null)
    }

    pub fn get(&self, idx: usize) -> &Value {
        self.cells.get(idx).unwrap_or(&Value::Null)
    }
}

/// Positions of the required columns within a [`Schema`].
#[derive(Clone, Copy, Debug)]
pub struct ColumnIndex {
    pub hotel_address: usize,
    pub additional_number_of_scoring: usize,
    pub review_date: usize,
    pub average_score: usize,
    pub hotel_name: usize,
    pub reviewer_nationality: usize,
    pub negative_review: usize,
    pub review_total_negative_word_counts: usize,
    pub total_number_of_reviews: usize,
    pub positive_review: usize,
    pub review_total_positive_word_counts: usize,
    pub total_number_of_reviews_reviewer_has_given: usize,
    pub reviewer_score: usize,
    pub tags: usize,
    pub days_since_review: usize,
}

impl ColumnIndex {
    /// Resolve every required column; `None` if any is missing.
    pub fn resolve(schema: &Schema) -> Option<ColumnIndex> {
        let at = |name: &str| schema.index_of(name);
        Some(ColumnIndex {
            hotel_address: at(HOTEL_ADDRESS)?,
            additional_number_of_scoring: at(ADDITIONAL_NUMBER_OF_SCORING)?,
            review_date: at(REVIEW_DATE)?,
            average_score: at(AVERAGE_SCORE)?,
            hotel_name: at(HOTEL_NAME)?,
            reviewer_nationality: at(REVIEWER_NATIONALITY)?,
            negative_review: at(NEGATIVE_REVIEW)?,
            review_total_negative_word_counts: at(REVIEW_TOTAL_NEGATIVE_WORD_COUNTS)?,
            total_number_of_reviews: at(TOTAL_NUMBER_OF_REVIEWS)?,
            positive_review: at(POSITIVE_REVIEW)?,
            review_total_positive_word_counts: at(REVIEW_TOTAL_POSITIVE_WORD_COUNTS)?,
            total_number_of_reviews_reviewer_has_given: at(
                TOTAL_NUMBER_OF_REVIEWS_REVIEWER_HAS_GIVEN,
            )?,
            reviewer_score: at(REVIEWER_SCORE)?,
            tags: at(TAGS)?,
            days_since_review: at(DAYS_SINCE_REVIEW)?,
        })
    }
}

/// A cleaned review: no null source cell, derived date and day count parsed.
///
/// `source_digest` hashes the whole source row, including columns the star
/// schema does not keep, so two distinct source rows stay distinct here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CleanReview {
    pub source_digest: [u8; 32],
    pub hotel_name: String,
    pub hotel_address: String,
    pub average_score: Value,
    pub reviewer_nationality: String,
    pub negative_review: String,
    pub positive_review: String,
    pub tags: String,
    pub review_date: Option<NaiveDate>,
    pub reviewer_score: Value,
    pub review_total_negative_word_counts: Value,
    pub review_total_positive_word_counts: Value,
    pub total_number_of_reviews_reviewer_has_given: Value,
    pub total_number_of_reviews: Value,
    pub additional_number_of_scoring: Value,
    pub days_since_review: Option<i32>,
}

impl CleanReview {
    pub fn hotel_key(&self) -> HotelKey {
        HotelKey {
            hotel_name: self.hotel_name.clone(),
            hotel_address: self.hotel_address.clone(),
            average_score: self.average_score.clone(),
        }
    }

    pub fn reviewer_key(&self) -> ReviewerKey {
        ReviewerKey {
            reviewer_nationality: self.reviewer_nationality.clone(),
        }
    }

    pub fn review_text_key(&self) -> ReviewTextKey {
        ReviewTextKey {
            negative_review: self.negative_review.clone(),
            positive_review: self.positive_review.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HotelKey {
    pub hotel_name: String,
    pub hotel_address: String,
    pub average_score: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewerKey {
    pub reviewer_nationality: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewTextKey {
    pub negative_review: String,
    pub positive_review: String,
    pub tags: String,
}

// ---- warehouse tables ----

/// Column layout of a warehouse table, as (name, SQL type) pairs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
}

pub const DIM_HOTEL: TableSpec = TableSpec {
    name: "dim_hotel",
    columns: &[
        ("Hotel_ID", "BIGINT"),
        ("Hotel_Name", "STRING"),
        ("Hotel_Address", "STRING"),
        ("Average_Score", "FLOAT"),
    ],
};

pub const DIM_REVIEWER: TableSpec = TableSpec {
    name: "dim_reviewer",
    columns: &[("Reviewer_ID", "BIGINT"), ("Reviewer_Nationality", "STRING")],
};

pub const DIM_REVIEW_TEXT: TableSpec = TableSpec {
    name: "dim_review_text",
    columns: &[
        ("Review_Text_ID", "BIGINT"),
        ("Negative_Review", "STRING"),
        ("Positive_Review", "STRING"),
        ("Tags", "STRING"),
    ],
};

pub const FACT_REVIEWS: TableSpec = TableSpec {
    name: "fact_reviews",
    columns: &[
        ("Review_ID", "BIGINT"),
        ("Hotel_ID", "BIGINT"),
        ("Reviewer_ID", "BIGINT"),
        ("Review_Text_ID", "BIGINT"),
        ("Review_Date", "DATE"),
        ("Reviewer_Score", "FLOAT"),
        ("Review_Total_Negative_Word_Counts", "INT"),
        ("Review_Total_Positive_Word_Counts", "INT"),
        ("Total_Number_of_Reviews_Reviewer_Has_Given", "INT"),
        ("Total_Number_of_Reviews", "INT"),
        ("Additional_Number_of_Scoring", "INT"),
        ("days_since_review", "INT"),
    ],
};

/// Every table the job replaces, in commit order.
pub const TABLES: [TableSpec; 4] = [DIM_HOTEL, DIM_REVIEWER, DIM_REVIEW_TEXT, FACT_REVIEWS];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimHotel {
    #[serde(rename = "Hotel_ID")]
    pub hotel_id: i64,
    #[serde(rename = "Hotel_Name")]
    pub hotel_name: String,
    #[serde(rename = "Hotel_Address")]
    pub hotel_address: String,
    #[serde(rename = "Average_Score")]
    pub average_score: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimReviewer {
    #[serde(rename = "Reviewer_ID")]
    pub reviewer_id: i64,
    #[serde(rename = "Reviewer_Nationality")]
    pub reviewer_nationality: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DimReviewText {
    #[serde(rename = "Review_Text_ID")]
    pub review_text_id: i64,
    #[serde(rename = "Negative_Review")]
    pub negative_review: String,
    #[serde(rename = "Positive_Review")]
    pub positive_review: String,
    #[serde(rename = "Tags")]
    pub tags: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactReview {
    #[serde(rename = "Review_ID")]
    pub review_id: i64,
    #[serde(rename = "Hotel_ID")]
    pub hotel_id: Option<i64>,
    #[serde(rename = "Reviewer_ID")]
    pub reviewer_id: Option<i64>,
    #[serde(rename = "Review_Text_ID")]
    pub review_text_id: Option<i64>,
    #[serde(rename = "Review_Date")]
    pub review_date: Option<NaiveDate>,
    #[serde(rename = "Reviewer_Score")]
    pub reviewer_score: Option<f32>,
    #[serde(rename = "Review_Total_Negative_Word_Counts")]
    pub review_total_negative_word_counts: Option<i32>,
    #[serde(rename = "Review_Total_Positive_Word_Counts")]
    pub review_total_positive_word_counts: Option<i32>,
    #[serde(rename = "Total_Number_of_Reviews_Reviewer_Has_Given")]
    pub total_number_of_reviews_reviewer_has_given: Option<i32>,
    #[serde(rename = "Total_Number_of_Reviews")]
    pub total_number_of_reviews: Option<i32>,
    #[serde(rename = "Additional_Number_of_Scoring")]
    pub additional_number_of_scoring: Option<i32>,
    #[serde(rename = "days_since_review")]
    pub days_since_review: Option<i32>,
}

/// A fact row together with the natural keys it was joined on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkedFact {
    pub hotel: HotelKey,
    pub reviewer: ReviewerKey,
    pub review_text: ReviewTextKey,
    pub row: FactReview,
}

/// Everything one run builds, before it is written.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StarSchema {
    pub input_rows: usize,
    pub clean_rows: usize,
    pub hotels: Vec<(HotelKey, DimHotel)>,
    pub reviewers: Vec<(ReviewerKey, DimReviewer)>,
    pub review_texts: Vec<(ReviewTextKey, DimReviewText)>,
    pub facts: Vec<LinkedFact>,
}

impl StarSchema {
    pub fn dim_hotel_rows(&self) -> Vec<DimHotel> {
        self.hotels.iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn dim_reviewer_rows(&self) -> Vec<DimReviewer> {
        self.reviewers.iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn dim_review_text_rows(&self) -> Vec<DimReviewText> {
        self.review_texts.iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn fact_rows(&self) -> Vec<FactReview> {
        self.facts.iter().map(|f| f.row.clone()).collect()
    }
}
