//! Rating aggregation: score bounds and the canonical recomputation of a
//! user's public rating.
//!
//! The public rating is always recomputed as the plain average of every
//! score the user has received on completed exchanges, rounded to two
//! decimals. Incremental weighted updates are deliberately not supported;
//! they drift from the full history over time.

use crate::error::CoreError;

/// Lowest permitted score.
pub const MIN_SCORE: i16 = 1;

/// Highest permitted score.
pub const MAX_SCORE: i16 = 5;

/// Maximum length of an optional review text.
pub const MAX_REVIEW_LENGTH: usize = 500;

/// Validate a rating score.
pub fn validate_score(score: i16) -> Result<(), CoreError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Rating score must be between {MIN_SCORE} and {MAX_SCORE} (got {score})"
        )))
    }
}

/// Validate an optional review text.
pub fn validate_review(review: Option<&str>) -> Result<(), CoreError> {
    if let Some(text) = review {
        if text.chars().count() > MAX_REVIEW_LENGTH {
            return Err(CoreError::Validation(format!(
                "Review exceeds maximum length of {MAX_REVIEW_LENGTH} characters"
            )));
        }
    }
    Ok(())
}

/// Recompute a public rating from the full history of received scores.
///
/// Returns `None` when the user has no received scores yet, in which case
/// their stored rating is left untouched.
pub fn aggregate(scores: &[i16]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let sum: i64 = scores.iter().map(|&s| s as i64).sum();
    let mean = sum as f64 / scores.len() as f64;
    Some((mean * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_outside_bounds_rejected() {
        assert!(validate_score(1).is_ok());
        assert!(validate_score(5).is_ok());
        assert!(matches!(validate_score(0), Err(CoreError::Validation(_))));
        assert!(matches!(validate_score(6), Err(CoreError::Validation(_))));
    }

    #[test]
    fn over_long_review_rejected() {
        let long = "x".repeat(MAX_REVIEW_LENGTH + 1);
        assert!(validate_review(None).is_ok());
        assert!(validate_review(Some("great trade")).is_ok());
        assert!(matches!(
            validate_review(Some(&long)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn aggregate_is_mean_rounded_to_two_decimals() {
        assert_eq!(aggregate(&[]), None);
        assert_eq!(aggregate(&[4]), Some(4.0));
        assert_eq!(aggregate(&[5, 4]), Some(4.5));
        assert_eq!(aggregate(&[5, 4, 4]), Some(4.33));
        assert_eq!(aggregate(&[1, 1, 1, 1, 1]), Some(1.0));
    }
}
