//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::aggregates::stock::{NewStockJournal, Restock};
use crate::domain::events::{DomainEvent, OrderEvent, RestockedLine};
use crate::domain::value_objects::Quantity;
use crate::EcommerceError;

#[derive(Clone, Debug)]
pub struct Order {
    id: i64,
    user_id: i64,
    store_id: i64,
    status: OrderStatus,
    total: Decimal,
    payment: Option<Payment>,
    items: Vec<OrderItem>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq)] pub struct OrderItem { pub id: i64, pub product_id: i64, pub qty: Quantity }
#[derive(Clone, Debug, PartialEq, Eq)] pub struct Payment { pub id: i64, pub status: PaymentStatus }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus { #[default] WaitingForPayment, WaitingConfirmationPayment, OrderProcessed, OrderShipped, OrderReceived, OrderCancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus { #[default] Pending, Paid, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForPayment => "WAITING_FOR_PAYMENT",
            Self::WaitingConfirmationPayment => "WAITING_CONFIRMATION_PAYMENT",
            Self::OrderProcessed => "ORDER_PROCESSED",
            Self::OrderShipped => "ORDER_SHIPPED",
            Self::OrderReceived => "ORDER_RECEIVED",
            Self::OrderCancelled => "ORDER_CANCELLED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING_FOR_PAYMENT" => Ok(Self::WaitingForPayment),
            "WAITING_CONFIRMATION_PAYMENT" => Ok(Self::WaitingConfirmationPayment),
            "ORDER_PROCESSED" => Ok(Self::OrderProcessed),
            "ORDER_SHIPPED" => Ok(Self::OrderShipped),
            "ORDER_RECEIVED" => Ok(Self::OrderReceived),
            "ORDER_CANCELLED" => Ok(Self::OrderCancelled),
            other => Err(EcommerceError::StorageError(format!("unknown order status {other}"))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "PENDING", Self::Paid => "PAID", Self::Cancelled => "CANCELLED" }
    }
}

impl FromStr for PaymentStatus {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(EcommerceError::StorageError(format!("unknown payment status {other}"))),
        }
    }
}

/// Writes needed to cancel one order, applied as a single unit of work.
#[derive(Clone, Debug, PartialEq)]
pub struct Cancellation {
    pub order_id: i64,
    pub user_id: i64,
    pub store_id: i64,
    /// Status the order was read in; the write only lands if it is unchanged.
    pub previous_status: OrderStatus,
    pub payment_id: i64,
    pub journals: Vec<NewStockJournal>,
    pub restocks: Vec<Restock>,
}

impl Order {
    pub fn new(id: i64, user_id: i64, store_id: i64, status: OrderStatus, total: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id, user_id, store_id, status, total, payment: None, items: vec![],
            created_at: now, updated_at: now, events: vec![],
        }
    }

    pub fn with_payment(mut self, payment: Payment) -> Self { self.payment = Some(payment); self }
    pub fn with_items(mut self, items: Vec<OrderItem>) -> Self { self.items = items; self }
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self { self.created_at = at; self.updated_at = at; self }

    pub fn id(&self) -> i64 { self.id }
    pub fn user_id(&self) -> i64 { self.user_id }
    pub fn store_id(&self) -> i64 { self.store_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn total(&self) -> Decimal { self.total }
    pub fn payment(&self) -> Option<&Payment> { self.payment.as_ref() }
    pub fn items(&self) -> &[OrderItem] { &self.items }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn is_owned_by(&self, user_id: i64) -> bool { self.user_id == user_id }

    /// Moves the order and its payment to cancelled and plans the refund
    /// journal plus restock for every line.
    pub fn cancel(&mut self) -> Result<Cancellation, EcommerceError> {
        match self.status {
            OrderStatus::OrderCancelled => return Err(EcommerceError::AlreadyCancelled(self.id)),
            OrderStatus::OrderShipped | OrderStatus::OrderReceived => {
                return Err(EcommerceError::CannotCancel { order_id: self.id, status: self.status });
            }
            _ => {}
        }
        let payment = self.payment.as_mut().ok_or(EcommerceError::PaymentNotFound(self.id))?;
        payment.status = PaymentStatus::Cancelled;
        let payment_id = payment.id;

        let previous_status = self.status;
        self.status = OrderStatus::OrderCancelled;
        self.touch();

        let journals = self.items.iter().map(|i| NewStockJournal::refund(self.store_id, i.product_id, i.qty)).collect();
        let restocks: Vec<Restock> = self.items.iter()
            .map(|i| Restock { store_id: self.store_id, product_id: i.product_id, qty: i.qty })
            .collect();
        let restocked = restocks.iter().map(|r| RestockedLine { product_id: r.product_id, qty: r.qty.value() }).collect();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled {
            order_id: self.id, user_id: self.user_id, store_id: self.store_id, restocked,
        }));

        Ok(Cancellation {
            order_id: self.id, user_id: self.user_id, store_id: self.store_id,
            previous_status, payment_id, journals, restocks,
        })
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::stock::{JournalStatus, JournalType};

    fn qty(n: i32) -> Quantity { Quantity::new(n).unwrap() }

    fn order_42(status: OrderStatus) -> Order {
        Order::new(42, 7, 1, status, Decimal::new(150_000, 2))
            .with_payment(Payment { id: 420, status: PaymentStatus::Pending })
            .with_items(vec![
                OrderItem { id: 1, product_id: 5, qty: qty(3) },
                OrderItem { id: 2, product_id: 9, qty: qty(1) },
            ])
    }

    #[test]
    fn test_cancel_plans_refund_and_restock() {
        let mut order = order_42(OrderStatus::WaitingForPayment);
        let plan = order.cancel().unwrap();

        assert_eq!(order.status(), OrderStatus::OrderCancelled);
        assert_eq!(order.payment().unwrap().status, PaymentStatus::Cancelled);
        assert_eq!(plan.previous_status, OrderStatus::WaitingForPayment);
        assert_eq!(plan.payment_id, 420);
        assert_eq!(plan.journals.len(), 2);
        assert!(plan.journals.iter().all(|j| j.journal_type == JournalType::Refund && j.status == JournalStatus::Automated));
        assert!(plan.journals.iter().all(|j| j.store_id == 1 && j.to_store_id == 1));
        assert_eq!(plan.restocks, vec![
            Restock { store_id: 1, product_id: 5, qty: qty(3) },
            Restock { store_id: 1, product_id: 9, qty: qty(1) },
        ]);
    }

    #[test]
    fn test_cancel_raises_event_once() {
        let mut order = order_42(OrderStatus::OrderProcessed);
        order.cancel().unwrap();
        let events = order.take_events();
        assert_eq!(events.len(), 1);
        assert!(order.take_events().is_empty());
    }

    #[test]
    fn test_cancel_rejects_shipped_and_cancelled() {
        let mut shipped = order_42(OrderStatus::OrderShipped);
        assert!(matches!(shipped.cancel(), Err(EcommerceError::CannotCancel { order_id: 42, .. })));
        assert_eq!(shipped.status(), OrderStatus::OrderShipped);

        let mut cancelled = order_42(OrderStatus::OrderCancelled);
        assert!(matches!(cancelled.cancel(), Err(EcommerceError::AlreadyCancelled(42))));
    }

    #[test]
    fn test_cancel_requires_payment() {
        let mut order = Order::new(3, 7, 1, OrderStatus::WaitingForPayment, Decimal::ZERO);
        assert!(matches!(order.cancel(), Err(EcommerceError::PaymentNotFound(3))));
        assert_eq!(order.status(), OrderStatus::WaitingForPayment);
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [OrderStatus::WaitingForPayment, OrderStatus::OrderReceived, OrderStatus::OrderCancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
        assert_eq!("CANCELLED".parse::<PaymentStatus>().unwrap(), PaymentStatus::Cancelled);
    }
}
