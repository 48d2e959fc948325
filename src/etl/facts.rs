//! Fact builder.
//!
//! Cleaned reviews are left-joined to each dimension on its natural key (a
//! miss leaves the foreign key null), then every row gets its own surrogate
//! key and the measures are cast. Joins compare the natural key values
//! before any cast, so the `FLOAT` narrowing of `Average_Score` in
//! `dim_hotel` cannot lose a match.

use crate::keys::KeyStrategy;
use crate::records::{
    CleanReview, DimHotel, DimReviewText, DimReviewer, FactReview, HotelKey, LinkedFact,
    ReviewTextKey, ReviewerKey,
};
use crate::PCollection;
use serde::{Deserialize, Serialize};

/// A review with its resolved foreign keys, waiting for its own key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct JoinedReview {
    review: CleanReview,
    hotel_id: Option<i64>,
    reviewer_id: Option<i64>,
    review_text_id: Option<i64>,
}

impl JoinedReview {
    fn to_fact(&self, review_id: i64) -> LinkedFact {
        let r = &self.review;
        LinkedFact {
            hotel: r.hotel_key(),
            reviewer: r.reviewer_key(),
            review_text: r.review_text_key(),
            row: FactReview {
                review_id,
                hotel_id: self.hotel_id,
                reviewer_id: self.reviewer_id,
                review_text_id: self.review_text_id,
                review_date: r.review_date,
                reviewer_score: r.reviewer_score.to_f32(),
                review_total_negative_word_counts: r.review_total_negative_word_counts.to_i32(),
                review_total_positive_word_counts: r.review_total_positive_word_counts.to_i32(),
                total_number_of_reviews_reviewer_has_given: r
                    .total_number_of_reviews_reviewer_has_given
                    .to_i32(),
                total_number_of_reviews: r.total_number_of_reviews.to_i32(),
                additional_number_of_scoring: r.additional_number_of_scoring.to_i32(),
                days_since_review: r.days_since_review,
            },
        }
    }
}

/// One fact per cleaned review.
///
/// The dimension collections must already be materialized; they are read
/// once per join.
#[must_use]
pub fn build_facts(
    reviews: &PCollection<CleanReview>,
    hotels: &PCollection<(HotelKey, DimHotel)>,
    reviewers: &PCollection<(ReviewerKey, DimReviewer)>,
    review_texts: &PCollection<(ReviewTextKey, DimReviewText)>,
    strategy: KeyStrategy,
) -> PCollection<LinkedFact> {
    let hotel_ids = hotels.clone().map_values(|d: &DimHotel| d.hotel_id);
    let reviewer_ids = reviewers.clone().map_values(|d: &DimReviewer| d.reviewer_id);
    let text_ids = review_texts
        .clone()
        .map_values(|d: &DimReviewText| d.review_text_id);

    let with_hotel = reviews
        .clone()
        .key_by(CleanReview::hotel_key)
        .join_left(&hotel_ids)
        .map(|(_, (r, hotel))| (r.reviewer_key(), (r.clone(), *hotel)));

    let with_reviewer = with_hotel
        .join_left(&reviewer_ids)
        .map(|(_, ((r, hotel), reviewer))| (r.review_text_key(), (r.clone(), *hotel, *reviewer)));

    with_reviewer
        .join_left(&text_ids)
        .map(|(_, ((r, hotel, reviewer), text))| JoinedReview {
            review: r.clone(),
            hotel_id: *hotel,
            reviewer_id: *reviewer,
            review_text_id: *text,
        })
        .assign_keys(strategy.generator::<JoinedReview>(), |id, j: &JoinedReview| {
            j.to_fact(id)
        })
}
