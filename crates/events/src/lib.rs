//! Best-effort notification delivery for exchange lifecycle events.
//!
//! - [`ExchangeEvent`]: the canonical event envelope for the four
//!   participant-facing moments of an exchange (requested, accepted,
//!   completed, cancelled).
//! - [`EmailDelivery`]: SMTP delivery via `lettre`, configured from
//!   environment variables.
//! - [`Notifier`]: the injected facade the orchestrator calls; delivery
//!   failures are logged and never surfaced to the caller.

pub mod delivery;
pub mod event;
pub mod notifier;

pub use delivery::{EmailConfig, EmailDelivery};
pub use event::{ExchangeEvent, ExchangeEventKind};
pub use notifier::Notifier;
