//! Domain event publishing over NATS.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::events::DomainEvent;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    event_id: Uuid,
    occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a DomainEvent,
}

/// Publishes committed domain events. Without a NATS client it only logs.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Best effort: failures are logged, never returned.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let Some(client) = &self.nats else {
                tracing::debug!(subject = event.subject(), "no event bus configured, dropping event");
                continue;
            };
            let envelope = Envelope { event_id: Uuid::now_v7(), occurred_at: Utc::now(), event: &event };
            let payload = match serde_json::to_vec(&envelope) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(subject = event.subject(), error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
                tracing::error!(subject = event.subject(), error = %e, "failed to publish event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{OrderEvent, RestockedLine};

    #[test]
    fn test_envelope_flattens_event() {
        let event = DomainEvent::Order(OrderEvent::Cancelled {
            order_id: 42, user_id: 7, store_id: 1, restocked: vec![RestockedLine { product_id: 9, qty: 1 }],
        });
        let envelope = Envelope { event_id: Uuid::now_v7(), occurred_at: Utc::now(), event: &event };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "cancelled");
        assert_eq!(json["orderId"], 42);
        assert!(json["eventId"].is_string());
    }

    #[tokio::test]
    async fn test_disabled_publisher_is_noop() {
        let event = DomainEvent::Order(OrderEvent::Cancelled { order_id: 1, user_id: 1, store_id: 1, restocked: vec![] });
        EventPublisher::disabled().publish(vec![event]).await;
    }
}
