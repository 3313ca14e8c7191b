//! Value Objects for inventory and listings

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::EcommerceError;

/// Strictly positive unit count moved by an order line or a journal entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i32) -> Result<Self, EcommerceError> {
        if value <= 0 { return Err(EcommerceError::InvalidQuantity(value)); }
        Ok(Self(value))
    }
    pub fn value(&self) -> i32 { self.0 }
}

impl TryFrom<i32> for Quantity {
    type Error = EcommerceError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for i32 {
    fn from(qty: Quantity) -> Self { qty.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Page selection for list endpoints, 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest { page: u32, take: u32 }

impl PageRequest {
    pub const DEFAULT_TAKE: u32 = 10;
    pub const MAX_TAKE: u32 = 100;

    pub fn new(page: Option<u32>, take: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            take: take.unwrap_or(Self::DEFAULT_TAKE).clamp(1, Self::MAX_TAKE),
        }
    }
    pub fn page(&self) -> u32 { self.page }
    pub fn take(&self) -> u32 { self.take }
    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.take) }
    pub fn limit(&self) -> i64 { i64::from(self.take) }
}

impl Default for PageRequest {
    fn default() -> Self { Self::new(None, None) }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageMeta { pub page: u32, pub take: u32, pub total: i64 }

/// List payload shape consumed by the admin tables.
#[derive(Clone, Debug, Serialize)]
pub struct Paginated<T> { pub data: Vec<T>, pub meta: PageMeta }

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: PageRequest, total: i64) -> Self {
        Self { data, meta: PageMeta { page: page.page(), take: page.take(), total } }
    }
}
