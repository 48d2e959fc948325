//! Data quality checks run between the build and the commit.
//!
//! [`validate_star_schema`] looks at everything a run produced and reports
//! every broken rule at once. What happens next depends on the
//! [`ValidationMode`]: fail fast (nothing is replaced) or log and continue.

use crate::config::ValidationConfig;
use crate::error::EtlError;
use crate::records::{StarSchema, TableSpec, DIM_HOTEL, DIM_REVIEW_TEXT, DIM_REVIEWER, FACT_REVIEWS};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use tracing::warn;

/// Sample ids quoted per failed check.
const MAX_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationMode {
    /// Abort before any table is replaced.
    #[default]
    FailFast,
    /// Log every failure and commit anyway.
    LogAndContinue,
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Short name of the rule, e.g. `unique-keys`.
    pub check: String,
    pub message: String,
}

impl ValidationError {
    pub fn new<C: Into<String>, M: Into<String>>(check: C, message: M) -> Self {
        Self {
            check: check.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.check, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    /// Number of checks evaluated.
    pub checks_run: usize,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// One line naming every failure.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn check(&mut self, outcome: Option<ValidationError>) {
        self.checks_run += 1;
        if let Some(e) = outcome {
            self.errors.push(e);
        }
    }

    /// Apply `mode` to the report.
    ///
    /// # Errors
    /// [`EtlError::Validation`] in fail-fast mode when any check failed.
    pub fn enforce(self, mode: ValidationMode) -> Result<ValidationReport, EtlError> {
        if self.is_ok() {
            return Ok(self);
        }
        match mode {
            ValidationMode::FailFast => Err(EtlError::Validation(self)),
            ValidationMode::LogAndContinue => {
                for e in &self.errors {
                    warn!(check = %e.check, "Validation failed: {}", e.message);
                }
                Ok(self)
            }
        }
    }
}

/// Evaluate every rule against a built star schema.
pub fn validate_star_schema(star: &StarSchema, cfg: &ValidationConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    report.check((star.clean_rows > star.input_rows).then(|| {
        ValidationError::new(
            "row-counts",
            format!(
                "cleaning produced {} rows from {} input rows",
                star.clean_rows, star.input_rows
            ),
        )
    }));

    report.check((star.input_rows > 0 && star.clean_rows == 0).then(|| {
        ValidationError::new(
            "non-empty",
            format!("all {} input rows were dropped by cleaning", star.input_rows),
        )
    }));

    if let Some(max) = cfg.max_dropped_ratio
        && star.input_rows > 0
    {
        let dropped = star.input_rows.saturating_sub(star.clean_rows);
        let ratio = dropped as f64 / star.input_rows as f64;
        report.check((ratio > max).then(|| {
            ValidationError::new(
                "dropped-ratio",
                format!("cleaning dropped {dropped} of {} rows ({ratio:.3} > {max})", star.input_rows),
            )
        }));
    }

    report.check(unique_keys(&DIM_HOTEL, star.hotels.iter().map(|(_, d)| d.hotel_id)));
    report.check(unique_keys(&DIM_REVIEWER, star.reviewers.iter().map(|(_, d)| d.reviewer_id)));
    report.check(unique_keys(
        &DIM_REVIEW_TEXT,
        star.review_texts.iter().map(|(_, d)| d.review_text_id),
    ));
    report.check(unique_keys(&FACT_REVIEWS, star.facts.iter().map(|f| f.row.review_id)));

    report.check((star.facts.len() != star.clean_rows).then(|| {
        ValidationError::new(
            "fact-count",
            format!(
                "{} fact rows for {} clean rows",
                star.facts.len(),
                star.clean_rows
            ),
        )
    }));

    let hotels: HashMap<i64, _> = star.hotels.iter().map(|(k, d)| (d.hotel_id, k)).collect();
    report.check(foreign_keys(
        "Hotel_ID",
        &hotels,
        star.facts.iter().map(|f| (f.row.hotel_id, &f.hotel)),
    ));
    let reviewers: HashMap<i64, _> = star.reviewers.iter().map(|(k, d)| (d.reviewer_id, k)).collect();
    report.check(foreign_keys(
        "Reviewer_ID",
        &reviewers,
        star.facts.iter().map(|f| (f.row.reviewer_id, &f.reviewer)),
    ));
    let texts: HashMap<i64, _> = star
        .review_texts
        .iter()
        .map(|(k, d)| (d.review_text_id, k))
        .collect();
    report.check(foreign_keys(
        "Review_Text_ID",
        &texts,
        star.facts.iter().map(|f| (f.row.review_text_id, &f.review_text)),
    ));

    report
}

fn unique_keys(table: &TableSpec, ids: impl Iterator<Item = i64>) -> Option<ValidationError> {
    let mut seen = HashSet::new();
    let mut dupes: Vec<i64> = ids.filter(|id| !seen.insert(*id)).collect();
    if dupes.is_empty() {
        return None;
    }
    dupes.sort_unstable();
    dupes.dedup();
    Some(ValidationError::new(
        "unique-keys",
        format!(
            "{} repeats surrogate key(s) {}",
            table.name,
            samples(&dupes)
        ),
    ))
}

/// Every non-null foreign key must point at a dimension row with the same
/// natural key.
fn foreign_keys<'a, K: Eq + Hash + 'a>(
    column: &str,
    dim: &HashMap<i64, &K>,
    facts: impl Iterator<Item = (Option<i64>, &'a K)>,
) -> Option<ValidationError> {
    let mut dangling = Vec::new();
    let mut mismatched = Vec::new();
    for (fk, natural) in facts {
        let Some(fk) = fk else { continue };
        match dim.get(&fk) {
            None => dangling.push(fk),
            Some(k) if *k != natural => mismatched.push(fk),
            Some(_) => {}
        }
    }
    if dangling.is_empty() && mismatched.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !dangling.is_empty() {
        parts.push(format!("{} dangling ({})", dangling.len(), samples(&dangling)));
    }
    if !mismatched.is_empty() {
        parts.push(format!(
            "{} resolving to a different natural key ({})",
            mismatched.len(),
            samples(&mismatched)
        ));
    }
    Some(ValidationError::new(
        "foreign-keys",
        format!("{column}: {}", parts.join(", ")),
    ))
}

fn samples(ids: &[i64]) -> String {
    let shown: Vec<String> = ids.iter().take(MAX_SAMPLES).map(ToString::to_string).collect();
    if ids.len() > MAX_SAMPLES {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{DimReviewer, ReviewerKey};

    fn reviewer(id: i64, nat: &str) -> (ReviewerKey, DimReviewer) {
        (
            ReviewerKey {
                reviewer_nationality: nat.into(),
            },
            DimReviewer {
                reviewer_id: id,
                reviewer_nationality: nat.into(),
            },
        )
    }

    #[test]
    fn empty_build_passes() {
        let report = validate_star_schema(&StarSchema::default(), &ValidationConfig::default());
        assert!(report.is_ok(), "{}", report.summary());
        assert!(report.checks_run >= 7);
    }

    #[test]
    fn duplicate_keys_and_dropped_everything_are_reported() {
        let star = StarSchema {
            input_rows: 4,
            clean_rows: 0,
            reviewers: vec![reviewer(1, " Spain "), reviewer(1, " Italy ")],
            ..Default::default()
        };
        let report = validate_star_schema(&star, &ValidationConfig::default());
        let checks: Vec<&str> = report.errors.iter().map(|e| e.check.as_str()).collect();
        assert_eq!(checks, vec!["non-empty", "unique-keys"]);
        assert!(report.summary().contains("dim_reviewer repeats surrogate key(s) 1"));
    }

    #[test]
    fn dropped_ratio_is_optional() {
        let star = StarSchema {
            input_rows: 10,
            clean_rows: 0,
            ..Default::default()
        };
        let strict = ValidationConfig {
            max_dropped_ratio: Some(0.5),
            ..Default::default()
        };
        let report = validate_star_schema(&star, &strict);
        assert!(report.errors.iter().any(|e| e.check == "dropped-ratio"));
    }

    #[test]
    fn enforce_honours_mode() {
        let report = ValidationReport {
            errors: vec![ValidationError::new("fact-count", "3 fact rows for 4 clean rows")],
            checks_run: 1,
        };
        assert!(report.clone().enforce(ValidationMode::LogAndContinue).is_ok());
        let err = report.enforce(ValidationMode::FailFast).unwrap_err();
        assert!(err.to_string().contains("fact-count"));
    }
}
