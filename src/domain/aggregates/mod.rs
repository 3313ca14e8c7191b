//! Aggregates module
pub mod order;
pub mod stock;
pub mod user;

pub use order::{Cancellation, Order, OrderItem, OrderStatus, Payment, PaymentStatus};
pub use stock::{JournalDetail, JournalStatus, JournalType, MutationLine, NewStockJournal, Restock, StockJournal, StockMutation, StoreProduct};
pub use user::User;
