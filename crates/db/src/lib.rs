//! Data access layer: sqlx models and repositories for the exchange
//! lifecycle engine and the eco-points economy.
//!
//! Migrations live at `db/migrations` in the workspace root.

pub mod models;
pub mod repositories;
