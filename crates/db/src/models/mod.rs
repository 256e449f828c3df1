//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where the table is created
//!   through this crate

pub mod achievement;
pub mod badge;
pub mod exchange;
pub mod item;
pub mod ledger;
pub mod user;
