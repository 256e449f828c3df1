//! The exchange event envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reloop_core::types::DbId;

/// The four participant-facing moments of an exchange lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeEventKind {
    Requested,
    Accepted,
    Completed,
    Cancelled,
}

impl ExchangeEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeEventKind::Requested => "requested",
            ExchangeEventKind::Accepted => "accepted",
            ExchangeEventKind::Completed => "completed",
            ExchangeEventKind::Cancelled => "cancelled",
        }
    }
}

/// A lifecycle event for one exchange.
///
/// Constructed via [`ExchangeEvent::new`] and enriched with the builder
/// methods [`with_actor`](ExchangeEvent::with_actor) and
/// [`with_detail`](ExchangeEvent::with_detail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeEvent {
    pub kind: ExchangeEventKind,
    pub exchange_id: DbId,
    /// Title of the item being exchanged, for human-readable messages.
    pub item_title: String,
    /// The user whose action produced the event.
    pub actor_user_id: Option<DbId>,
    /// Extra context, e.g. a cancellation reason.
    pub detail: Option<String>,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ExchangeEvent {
    /// Create a new event with the required fields.
    pub fn new(kind: ExchangeEventKind, exchange_id: DbId, item_title: impl Into<String>) -> Self {
        Self {
            kind,
            exchange_id,
            item_title: item_title.into(),
            actor_user_id: None,
            detail: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the acting user to the event.
    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    /// Attach extra context to the event.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Subject line for notification emails.
    pub fn subject(&self) -> String {
        let headline = match self.kind {
            ExchangeEventKind::Requested => "New exchange request",
            ExchangeEventKind::Accepted => "Exchange accepted",
            ExchangeEventKind::Completed => "Exchange completed",
            ExchangeEventKind::Cancelled => "Exchange cancelled",
        };
        format!("[Reloop] {headline}: {}", self.item_title)
    }

    /// Plain-text body for notification emails.
    pub fn body(&self) -> String {
        let mut body = format!(
            "Your exchange for \"{}\" is now {}.\nExchange #{}\nTime: {}",
            self.item_title,
            self.kind.as_str(),
            self.exchange_id,
            self.timestamp,
        );
        if let Some(detail) = &self.detail {
            body.push_str("\nDetails: ");
            body.push_str(detail);
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_and_body_include_item_and_kind() {
        let event = ExchangeEvent::new(ExchangeEventKind::Cancelled, 7, "Bike")
            .with_actor(3)
            .with_detail("No longer needed");
        assert_eq!(event.subject(), "[Reloop] Exchange cancelled: Bike");
        let body = event.body();
        assert!(body.contains("Exchange #7"));
        assert!(body.contains("cancelled"));
        assert!(body.contains("No longer needed"));
    }
}
