//! The best-effort notification facade injected into the orchestrators.

use crate::delivery::{EmailConfig, EmailDelivery};
use crate::event::ExchangeEvent;

/// Fires exchange notifications without ever failing the caller.
///
/// Delivery problems are logged at WARN and swallowed; a notifier built in
/// an environment without SMTP configuration silently drops every event.
pub struct Notifier {
    delivery: Option<EmailDelivery>,
}

impl Notifier {
    /// Build a notifier from environment configuration. Returns a disabled
    /// notifier when `SMTP_HOST` is not set.
    pub fn from_env() -> Self {
        match EmailConfig::from_env() {
            Some(config) => Self {
                delivery: Some(EmailDelivery::new(config)),
            },
            None => {
                tracing::info!("SMTP not configured; exchange notifications disabled");
                Self { delivery: None }
            }
        }
    }

    /// A notifier that drops every event. Used in tests and in deployments
    /// without email.
    pub fn disabled() -> Self {
        Self { delivery: None }
    }

    /// Deliver an event to each recipient, best-effort.
    pub async fn notify(&self, event: &ExchangeEvent, recipients: &[&str]) {
        let Some(delivery) = &self.delivery else {
            return;
        };
        for to in recipients {
            if let Err(err) = delivery.deliver(to, event).await {
                tracing::warn!(
                    error = %err,
                    exchange_id = event.exchange_id,
                    kind = event.kind.as_str(),
                    recipient = to,
                    "Failed to deliver exchange notification"
                );
            }
        }
    }
}
