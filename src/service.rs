//! Order and inventory use cases.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::aggregates::{MutationLine, StockJournal, StockMutation};
use crate::domain::value_objects::Paginated;
use crate::publisher::EventPublisher;
use crate::repository::{CommerceRepository, JournalFilter};
use crate::{EcommerceError, Result};

pub const ORDER_CANCELLED_MESSAGE: &str = "Order has been cancelled";

const MONTH_LABELS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelOrderResponse { pub message: String }

/// One bar of the revenue chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint { pub label: &'static str, pub amount: Decimal }

pub struct CommerceService {
    repository: Arc<dyn CommerceRepository>,
    publisher: EventPublisher,
}

impl CommerceService {
    pub fn new(repository: Arc<dyn CommerceRepository>, publisher: EventPublisher) -> Self {
        Self { repository, publisher }
    }

    /// Cancels a user's order: reverses the payment, journals a refund per
    /// line and puts the quantities back into the order's store.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: i64, order_id: i64) -> Result<CancelOrderResponse> {
        self.repository.find_user(user_id).await?.ok_or(EcommerceError::UserNotFound)?;

        let mut order = self.repository.find_order(order_id).await?.ok_or(EcommerceError::OrderNotFound)?;
        if !order.is_owned_by(user_id) {
            warn!(owner = order.user_id(), "order belongs to another user");
            return Err(EcommerceError::OrderNotFound);
        }

        let cancellation = order.cancel()?;
        self.repository.apply_cancellation(&cancellation).await?;
        info!(
            store_id = cancellation.store_id,
            previous_status = %cancellation.previous_status,
            lines = cancellation.restocks.len(),
            "order cancelled and restocked"
        );

        self.publisher.publish(order.take_events()).await;
        Ok(CancelOrderResponse { message: ORDER_CANCELLED_MESSAGE.to_string() })
    }

    /// Transfers stock from `from_store_id` to `to_store_id`.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn transfer_stock(&self, from_store_id: i64, to_store_id: i64, lines: Vec<MutationLine>) -> Result<Vec<StockJournal>> {
        let mut mutation = StockMutation::create(from_store_id, to_store_id, lines)?;
        let journals = self.repository.apply_mutation(&mutation).await?;
        info!(journals = journals.len(), "stock transferred");

        self.publisher.publish(mutation.take_events()).await;
        Ok(journals)
    }

    pub async fn list_stock_journals(&self, filter: JournalFilter) -> Result<Paginated<StockJournal>> {
        let (journals, total) = self.repository.list_stock_journals(&filter).await?;
        Ok(Paginated::new(journals, filter.page, total))
    }

    /// Monthly revenue for `year` (defaults to the current year).
    pub async fn revenue_report(&self, year: Option<i32>, store_id: Option<i64>) -> Result<Vec<ChartPoint>> {
        let year = year.unwrap_or_else(|| Utc::now().year());
        let months = self.repository.monthly_revenue(year, store_id).await?;
        Ok(MONTH_LABELS.into_iter().zip(months).map(|(label, amount)| ChartPoint { label, amount }).collect())
    }
}
