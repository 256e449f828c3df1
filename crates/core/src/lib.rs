//! Reloop domain core: pure business rules for the exchange lifecycle and
//! the eco-points economy.
//!
//! This crate performs no I/O. The db and service crates depend on it for
//! the error taxonomy, state-machine rules, points math, badge eligibility,
//! and rating aggregation.

pub mod badges;
pub mod error;
pub mod exchange;
pub mod points;
pub mod rating;
pub mod types;
