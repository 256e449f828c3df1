//! Badge eligibility rules: requirement types, the user-stats snapshot they
//! are evaluated against, and partial-progress math.

use serde::Serialize;

use crate::error::CoreError;

/// Ledger reason recorded when a badge's reward is paid out.
pub fn unlock_reason(badge_name: &str) -> String {
    format!("Unlocked badge: {badge_name}")
}

// ---------------------------------------------------------------------------
// Requirement types
// ---------------------------------------------------------------------------

/// What a badge's threshold is compared against.
///
/// `Custom` badges are managed outside this engine and are never
/// auto-unlocked or auto-progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementType {
    EcoPoints,
    Exchanges,
    ItemsPosted,
    Rating,
    Custom,
}

impl RequirementType {
    /// The value as stored in the `badges.requirement_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            RequirementType::EcoPoints => "eco_points",
            RequirementType::Exchanges => "exchanges",
            RequirementType::ItemsPosted => "items_posted",
            RequirementType::Rating => "rating",
            RequirementType::Custom => "custom",
        }
    }

    /// Parse a stored requirement type.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "eco_points" => Ok(RequirementType::EcoPoints),
            "exchanges" => Ok(RequirementType::Exchanges),
            "items_posted" => Ok(RequirementType::ItemsPosted),
            "rating" => Ok(RequirementType::Rating),
            "custom" => Ok(RequirementType::Custom),
            other => Err(CoreError::Validation(format!(
                "Unknown badge requirement type '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Stats snapshot and eligibility
// ---------------------------------------------------------------------------

/// Snapshot of the per-user counters badges are evaluated against.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UserStats {
    pub eco_points: i64,
    pub total_exchanges: i64,
    pub items_posted: i64,
    pub rating: f64,
}

/// The snapshot value a requirement compares against, or `None` for
/// `custom` requirements.
pub fn current_value(requirement: RequirementType, stats: &UserStats) -> Option<f64> {
    match requirement {
        RequirementType::EcoPoints => Some(stats.eco_points as f64),
        RequirementType::Exchanges => Some(stats.total_exchanges as f64),
        RequirementType::ItemsPosted => Some(stats.items_posted as f64),
        RequirementType::Rating => Some(stats.rating),
        RequirementType::Custom => None,
    }
}

/// Whether the snapshot satisfies a threshold requirement.
///
/// Always false for `custom` badges.
pub fn requirement_met(requirement: RequirementType, threshold: f64, stats: &UserStats) -> bool {
    match current_value(requirement, stats) {
        Some(value) => value >= threshold,
        None => false,
    }
}

/// Partial progress toward a threshold, as a percentage capped at 100.
///
/// Returns `None` for `custom` badges and for non-positive thresholds
/// (which would otherwise divide by zero).
pub fn progress_toward(
    requirement: RequirementType,
    threshold: f64,
    stats: &UserStats,
) -> Option<f32> {
    if threshold <= 0.0 {
        return None;
    }
    let value = current_value(requirement, stats)?;
    Some((value / threshold * 100.0).min(100.0) as f32)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
