//! Persistence port for the commerce services.
//!
//! Every write method is a single unit of work: it either applies all of its
//! changes or none of them.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::aggregates::{Cancellation, Order, StockJournal, StockMutation, User};
use crate::domain::value_objects::PageRequest;
use crate::Result;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Filter for the stock journal listing.
#[derive(Clone, Debug, Default)]
pub struct JournalFilter {
    /// Matches journals whose source or destination is this store.
    pub store_id: Option<i64>,
    /// Case-insensitive product name substring.
    pub search: Option<String>,
    pub page: PageRequest,
}

#[async_trait]
pub trait CommerceRepository: Send + Sync + 'static {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    /// Loads the order with its payment and items.
    async fn find_order(&self, order_id: i64) -> Result<Option<Order>>;

    /// Applies a cancellation atomically. Fails with `ConcurrentModification`
    /// when the order is no longer in `previous_status` or owned by the user.
    async fn apply_cancellation(&self, cancellation: &Cancellation) -> Result<()>;

    /// Moves stock between stores and returns the appended journals.
    async fn apply_mutation(&self, mutation: &StockMutation) -> Result<Vec<StockJournal>>;

    /// Returns one page of journals, newest first, and the total match count.
    async fn list_stock_journals(&self, filter: &JournalFilter) -> Result<(Vec<StockJournal>, i64)>;

    /// Revenue of non-cancelled orders per calendar month (index 0 = January).
    async fn monthly_revenue(&self, year: i32, store_id: Option<i64>) -> Result<[Decimal; 12]>;
}
