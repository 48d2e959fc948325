//! Dimension builders.
//!
//! Each dimension projects its natural-key columns from the cleaned reviews,
//! keeps the distinct combinations, and gives each one a surrogate key from
//! the table's own generator. The output keeps the natural key next to the
//! row so the fact builder can join on it.

use crate::keys::KeyStrategy;
use crate::records::{
    CleanReview, DIM_HOTEL, DIM_REVIEW_TEXT, DIM_REVIEWER, DimHotel, DimReviewText, DimReviewer,
    HotelKey, ReviewTextKey, ReviewerKey, TableSpec,
};
use crate::{Element, PCollection};
use std::hash::Hash;

pub trait Dimension: Element {
    type Key: Element + Eq + Hash;

    const TABLE: TableSpec;

    fn natural_key(review: &CleanReview) -> Self::Key;

    fn from_key(id: i64, key: &Self::Key) -> Self;

    fn surrogate_key(&self) -> i64;
}

impl Dimension for DimHotel {
    type Key = HotelKey;

    const TABLE: TableSpec = DIM_HOTEL;

    fn natural_key(review: &CleanReview) -> HotelKey {
        review.hotel_key()
    }

    fn from_key(id: i64, key: &HotelKey) -> Self {
        DimHotel {
            hotel_id: id,
            hotel_name: key.hotel_name.clone(),
            hotel_address: key.hotel_address.clone(),
            average_score: key.average_score.to_f32(),
        }
    }

    fn surrogate_key(&self) -> i64 {
        self.hotel_id
    }
}

impl Dimension for DimReviewer {
    type Key = ReviewerKey;

    const TABLE: TableSpec = DIM_REVIEWER;

    fn natural_key(review: &CleanReview) -> ReviewerKey {
        review.reviewer_key()
    }

    fn from_key(id: i64, key: &ReviewerKey) -> Self {
        DimReviewer {
            reviewer_id: id,
            reviewer_nationality: key.reviewer_nationality.clone(),
        }
    }

    fn surrogate_key(&self) -> i64 {
        self.reviewer_id
    }
}

impl Dimension for DimReviewText {
    type Key = ReviewTextKey;

    const TABLE: TableSpec = DIM_REVIEW_TEXT;

    fn natural_key(review: &CleanReview) -> ReviewTextKey {
        review.review_text_key()
    }

    fn from_key(id: i64, key: &ReviewTextKey) -> Self {
        DimReviewText {
            review_text_id: id,
            negative_review: key.negative_review.clone(),
            positive_review: key.positive_review.clone(),
            tags: key.tags.clone(),
        }
    }

    fn surrogate_key(&self) -> i64 {
        self.review_text_id
    }
}

/// Distinct natural keys of `D`, each paired with its new dimension row.
///
/// Sequence keys are handed out when the plan runs, so materialize the result
/// before using it more than once.
#[must_use]
pub fn build_dimension<D: Dimension>(
    reviews: &PCollection<CleanReview>,
    strategy: KeyStrategy,
) -> PCollection<(D::Key, D)> {
    reviews
        .clone()
        .map(D::natural_key)
        .distinct()
        .assign_keys(strategy.generator::<D::Key>(), |id, key: &D::Key| {
            (key.clone(), D::from_key(id, key))
        })
}
