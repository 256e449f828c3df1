//! Application-level orchestrators for the exchange lifecycle and the
//! eco-points economy.
//!
//! [`ExchangeService`] sequences state-machine transitions with item-status
//! synchronization, completion awards, badge checks, and best-effort
//! notification. [`EconomyService`] owns the ledger, badge eligibility, and
//! leaderboard queries. Both are plain structs over a `PgPool`, built once
//! at startup and shared; an HTTP layer consuming them is out of scope.

pub mod economy;
pub mod error;
pub mod exchanges;

pub use economy::{AwardOutcome, EconomyService};
pub use error::{ServiceError, ServiceResult};
pub use exchanges::{ExchangeService, HandoffResult, InitiateExchange};
