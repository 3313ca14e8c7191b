//! Domain events
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Order(OrderEvent),
    Stock(StockEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderEvent {
    #[serde(rename_all = "camelCase")]
    Cancelled { order_id: i64, user_id: i64, store_id: i64, restocked: Vec<RestockedLine> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StockEvent {
    #[serde(rename_all = "camelCase")]
    Transferred { from_store_id: i64, to_store_id: i64, lines: Vec<RestockedLine> },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockedLine { pub product_id: i64, pub qty: i32 }

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Cancelled { .. }) => "ecommerce.order.cancelled",
            Self::Stock(StockEvent::Transferred { .. }) => "ecommerce.stock.transferred",
        }
    }
}
