//! Stock Aggregates: per-store stock, the stock journal and inter-store transfers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

use crate::domain::events::{DomainEvent, RestockedLine, StockEvent};
use crate::domain::value_objects::Quantity;
use crate::EcommerceError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProduct { pub id: i64, pub store_id: i64, pub product_id: i64, pub qty: i32 }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalType { Refund, Mutation }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalStatus { Automated, Manual }

impl JournalType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Refund => "REFUND", Self::Mutation => "MUTATION" }
    }
}

impl FromStr for JournalType {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REFUND" => Ok(Self::Refund),
            "MUTATION" => Ok(Self::Mutation),
            other => Err(EcommerceError::StorageError(format!("unknown journal type {other}"))),
        }
    }
}

impl JournalStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Automated => "AUTOMATED", Self::Manual => "MANUAL" }
    }
}

impl FromStr for JournalStatus {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTOMATED" => Ok(Self::Automated),
            "MANUAL" => Ok(Self::Manual),
            other => Err(EcommerceError::StorageError(format!("unknown journal status {other}"))),
        }
    }
}

/// Ledger entry as stored. Never updated after insert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockJournal {
    pub id: i64,
    pub product_id: i64,
    pub store_id: i64,
    pub to_store_id: i64,
    pub qty: Quantity,
    #[serde(rename = "type")]
    pub journal_type: JournalType,
    pub status: JournalStatus,
    pub created_at: DateTime<Utc>,
    pub journal_detail: JournalDetail,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalDetail { pub id: i64, pub to_store_id: i64 }

/// Journal entry to append; ids and timestamps come from the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStockJournal {
    pub product_id: i64,
    pub store_id: i64,
    pub to_store_id: i64,
    pub qty: Quantity,
    pub journal_type: JournalType,
    pub status: JournalStatus,
}

impl NewStockJournal {
    /// Stock returned to the store an order was placed in.
    pub fn refund(store_id: i64, product_id: i64, qty: Quantity) -> Self {
        Self { product_id, store_id, to_store_id: store_id, qty, journal_type: JournalType::Refund, status: JournalStatus::Automated }
    }

    pub fn mutation(from_store_id: i64, to_store_id: i64, product_id: i64, qty: Quantity) -> Self {
        Self { product_id, store_id: from_store_id, to_store_id, qty, journal_type: JournalType::Mutation, status: JournalStatus::Manual }
    }
}

/// In-place increment of `StoreProduct(store_id, product_id)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Restock { pub store_id: i64, pub product_id: i64, pub qty: Quantity }

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationLine { pub product_id: i64, pub qty: Quantity }

/// Admin transfer of stock from one store to another.
#[derive(Clone, Debug)]
pub struct StockMutation {
    from_store_id: i64,
    to_store_id: i64,
    lines: Vec<MutationLine>,
    events: Vec<DomainEvent>,
}

impl StockMutation {
    /// Lines are kept ordered by product id so every writer locks rows in
    /// the same order.
    pub fn create(from_store_id: i64, to_store_id: i64, mut lines: Vec<MutationLine>) -> Result<Self, EcommerceError> {
        if from_store_id == to_store_id {
            return Err(EcommerceError::Validation("destination store must differ from the source store".into()));
        }
        if lines.is_empty() {
            return Err(EcommerceError::Validation("at least one stock line is required".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = lines.iter().find(|l| !seen.insert(l.product_id)) {
            return Err(EcommerceError::Validation(format!("productId {} listed more than once", dup.product_id)));
        }
        lines.sort_by_key(|l| l.product_id);
        let moved = lines.iter().map(|l| RestockedLine { product_id: l.product_id, qty: l.qty.value() }).collect();
        Ok(Self {
            from_store_id, to_store_id, lines,
            events: vec![DomainEvent::Stock(StockEvent::Transferred { from_store_id, to_store_id, lines: moved })],
        })
    }

    pub fn from_store_id(&self) -> i64 { self.from_store_id }
    pub fn to_store_id(&self) -> i64 { self.to_store_id }
    pub fn lines(&self) -> &[MutationLine] { &self.lines }

    pub fn journals(&self) -> impl Iterator<Item = NewStockJournal> + '_ {
        self.lines.iter().map(|l| NewStockJournal::mutation(self.from_store_id, self.to_store_id, l.product_id, l.qty))
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: i64, n: i32) -> MutationLine { MutationLine { product_id, qty: Quantity::new(n).unwrap() } }

    #[test]
    fn test_refund_journal_stays_in_store() {
        let j = NewStockJournal::refund(4, 11, Quantity::new(2).unwrap());
        assert_eq!((j.store_id, j.to_store_id), (4, 4));
        assert_eq!(j.journal_type, JournalType::Refund);
        assert_eq!(j.status, JournalStatus::Automated);
    }

    #[test]
    fn test_mutation_plans_manual_journals() {
        let mut m = StockMutation::create(1, 2, vec![line(5, 3), line(6, 1)]).unwrap();
        let journals: Vec<_> = m.journals().collect();
        assert_eq!(journals.len(), 2);
        assert!(journals.iter().all(|j| j.store_id == 1 && j.to_store_id == 2 && j.journal_type == JournalType::Mutation));
        assert_eq!(m.take_events().len(), 1);
    }

    #[test]
    fn test_mutation_orders_lines_by_product() {
        let m = StockMutation::create(1, 2, vec![line(9, 1), line(5, 2), line(7, 3)]).unwrap();
        let products: Vec<i64> = m.lines().iter().map(|l| l.product_id).collect();
        assert_eq!(products, vec![5, 7, 9]);
        let journal_products: Vec<i64> = m.journals().map(|j| j.product_id).collect();
        assert_eq!(journal_products, vec![5, 7, 9]);
    }

    #[test]
    fn test_mutation_rejects_bad_requests() {
        assert!(matches!(StockMutation::create(1, 1, vec![line(5, 1)]), Err(EcommerceError::Validation(_))));
        assert!(matches!(StockMutation::create(1, 2, vec![]), Err(EcommerceError::Validation(_))));
        assert!(matches!(StockMutation::create(1, 2, vec![line(5, 1), line(5, 2)]), Err(EcommerceError::Validation(_))));
    }

    #[test]
    fn test_journal_json_uses_type_key() {
        let journal = StockJournal {
            id: 1, product_id: 5, store_id: 1, to_store_id: 1, qty: Quantity::new(3).unwrap(),
            journal_type: JournalType::Refund, status: JournalStatus::Automated,
            created_at: Utc::now(), journal_detail: JournalDetail { id: 1, to_store_id: 1 },
        };
        let json = serde_json::to_value(&journal).unwrap();
        assert_eq!(json["type"], "REFUND");
        assert_eq!(json["status"], "AUTOMATED");
        assert_eq!(json["journalDetail"]["toStoreId"], 1);
        assert_eq!(json["qty"], 3);
    }
}
