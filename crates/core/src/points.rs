//! Eco-points rules: the completion award formula, ledger validation, and
//! the balance-to-level mapping.
//!
//! The completion-duration formula below is the canonical point schedule;
//! every other point-earning event goes through the generic award operation
//! with a caller-chosen amount.

use chrono::Duration;
use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Completion award
// ---------------------------------------------------------------------------

/// Base points the giver earns for a completed exchange.
pub const BASE_COMPLETION_POINTS: i32 = 100;

/// Bonus added when the exchange completes within the quick window.
pub const QUICK_COMPLETION_BONUS: i32 = 25;

/// Quick-completion window, in fractional days from request to completion.
pub const QUICK_COMPLETION_WINDOW_DAYS: f64 = 3.0;

/// Ledger reason recorded for the giver's completion award.
pub const COMPLETION_REASON_GIVER: &str = "Exchange completed: item given";

/// Ledger reason recorded for the receiver's completion award.
pub const COMPLETION_REASON_RECEIVER: &str = "Exchange completed: item received";

/// Points awarded to each side of a completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionAward {
    pub giver_points: i32,
    pub receiver_points: i32,
}

/// Compute the completion award.
///
/// The giver earns [`BASE_COMPLETION_POINTS`], plus
/// [`QUICK_COMPLETION_BONUS`] when the exchange completed within
/// [`QUICK_COMPLETION_WINDOW_DAYS`] fractional days of its creation. An
/// explicit `override_points` amount replaces the computed giver amount
/// (bonus included). The receiver always earns half the giver amount,
/// rounded down.
pub fn completion_award(duration: Duration, override_points: Option<i32>) -> CompletionAward {
    let giver_points = match override_points {
        Some(points) => points,
        None => {
            let days = duration.num_seconds() as f64 / 86_400.0;
            if days <= QUICK_COMPLETION_WINDOW_DAYS {
                BASE_COMPLETION_POINTS + QUICK_COMPLETION_BONUS
            } else {
                BASE_COMPLETION_POINTS
            }
        }
    };
    CompletionAward {
        giver_points,
        receiver_points: giver_points / 2,
    }
}

// ---------------------------------------------------------------------------
// Ledger validation
// ---------------------------------------------------------------------------

/// Validate a ledger award: points must be positive and the reason non-empty.
pub fn validate_award(points: i32, reason: &str) -> Result<(), CoreError> {
    if points <= 0 {
        return Err(CoreError::Validation(format!(
            "Awarded points must be positive (got {points})"
        )));
    }
    if reason.trim().is_empty() {
        return Err(CoreError::Validation(
            "Award reason must not be empty".to_string(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Levels
// ---------------------------------------------------------------------------

/// Named tier derived from an eco-points balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    Newcomer,
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Champion,
}

impl Level {
    /// Map a balance to its tier.
    ///
    /// Tier lower bounds: Newcomer 0, Beginner 100, Intermediate 500,
    /// Advanced 2000, Expert 5000, Champion 10000.
    pub fn for_balance(balance: i64) -> Level {
        match balance {
            b if b >= 10_000 => Level::Champion,
            b if b >= 5_000 => Level::Expert,
            b if b >= 2_000 => Level::Advanced,
            b if b >= 500 => Level::Intermediate,
            b if b >= 100 => Level::Beginner,
            _ => Level::Newcomer,
        }
    }

    /// Display name of the tier.
    pub fn name(self) -> &'static str {
        match self {
            Level::Newcomer => "Newcomer",
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Advanced => "Advanced",
            Level::Expert => "Expert",
            Level::Champion => "Champion",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
