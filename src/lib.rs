//! Multi-store Commerce Backend
//!
//! Order lifecycle and inventory services for a storefront that sells
//! out of several physical stores.
//!
//! ## Features
//! - Order cancellation with payment reversal and restock
//! - Stock transfers between stores
//! - Append-only stock journal with paginated filtering
//! - Monthly revenue reporting

pub mod api;
pub mod config;
pub mod domain;
pub mod publisher;
pub mod repository;
pub mod service;

use thiserror::Error;

use crate::domain::aggregates::OrderStatus;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("User not found")]
    UserNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Payment not found for order: {0}")]
    PaymentNotFound(i64),

    #[error("Store not found: {0}")]
    StoreNotFound(i64),

    #[error("StoreProduct not found for storeId: {store_id} and productId: {product_id}")]
    StoreProductNotFound { store_id: i64, product_id: i64 },

    #[error("Order {order_id} cannot be cancelled while {status}")]
    CannotCancel { order_id: i64, status: OrderStatus },

    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(i64),

    #[error("Order {0} was modified by another request")]
    ConcurrentModification(i64),

    #[error("Insufficient stock for productId: {product_id} in storeId: {store_id} (available {available}, requested {requested})")]
    InsufficientStock { store_id: i64, product_id: i64, available: i32, requested: i32 },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<sqlx::Error> for EcommerceError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
