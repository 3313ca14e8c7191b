//! In-memory CommerceRepository for tests and embedding.
//!
//! Each write works on a copy of the state and swaps it in only when every
//! step succeeded, giving the same all-or-nothing behavior as a database
//! transaction.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::domain::aggregates::{
    Cancellation, JournalDetail, NewStockJournal, Order, OrderStatus, StockJournal, StockMutation, StoreProduct, User,
};
use crate::repository::{CommerceRepository, JournalFilter};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Default)]
struct State {
    users: HashMap<i64, User>,
    orders: HashMap<i64, Order>,
    stores: HashSet<i64>,
    products: HashMap<i64, String>,
    store_products: HashMap<(i64, i64), StoreProduct>,
    journals: Vec<StockJournal>,
    next_id: i64,
    order_lookups: usize,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn append_journal(&mut self, journal: &NewStockJournal) -> StockJournal {
        let id = self.next_id();
        let detail_id = self.next_id();
        let stored = StockJournal {
            id,
            product_id: journal.product_id,
            store_id: journal.store_id,
            to_store_id: journal.to_store_id,
            qty: journal.qty,
            journal_type: journal.journal_type,
            status: journal.status,
            created_at: Utc::now(),
            journal_detail: JournalDetail { id: detail_id, to_store_id: journal.to_store_id },
        };
        self.journals.push(stored.clone());
        stored
    }
}

fn add_stock(sp: &mut StoreProduct, qty: i32) -> Result<()> {
    sp.qty = sp.qty.checked_add(qty).ok_or_else(|| {
        EcommerceError::StorageError(format!(
            "stock quantity out of range for storeId: {} and productId: {}",
            sp.store_id, sp.product_id
        ))
    })?;
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_store(&self, store_id: i64) {
        self.state.lock().await.stores.insert(store_id);
    }

    pub async fn insert_product(&self, product_id: i64, name: impl Into<String>) {
        self.state.lock().await.products.insert(product_id, name.into());
    }

    pub async fn insert_order(&self, order: Order) {
        self.state.lock().await.orders.insert(order.id(), order);
    }

    pub async fn set_stock(&self, store_id: i64, product_id: i64, qty: i32) {
        let mut state = self.state.lock().await;
        let id = state.next_id();
        state.stores.insert(store_id);
        state.store_products.insert((store_id, product_id), StoreProduct { id, store_id, product_id, qty });
    }

    pub async fn order(&self, order_id: i64) -> Option<Order> {
        self.state.lock().await.orders.get(&order_id).cloned()
    }

    pub async fn stock(&self, store_id: i64, product_id: i64) -> Option<i32> {
        self.state.lock().await.store_products.get(&(store_id, product_id)).map(|sp| sp.qty)
    }

    pub async fn journals(&self) -> Vec<StockJournal> {
        self.state.lock().await.journals.clone()
    }

    /// Number of `find_order` calls served so far.
    pub async fn order_lookups(&self) -> usize {
        self.state.lock().await.order_lookups
    }
}

#[async_trait]
impl CommerceRepository for MemoryRepository {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn find_order(&self, order_id: i64) -> Result<Option<Order>> {
        let mut state = self.state.lock().await;
        state.order_lookups += 1;
        Ok(state.orders.get(&order_id).cloned())
    }

    async fn apply_cancellation(&self, c: &Cancellation) -> Result<()> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();

        let order = next.orders.get_mut(&c.order_id)
            .filter(|o| o.user_id() == c.user_id && o.status() == c.previous_status)
            .ok_or(EcommerceError::ConcurrentModification(c.order_id))?;
        order.cancel()?;
        order.take_events();

        for journal in &c.journals {
            next.append_journal(journal);
        }
        for restock in &c.restocks {
            let sp = next.store_products.get_mut(&(restock.store_id, restock.product_id))
                .ok_or(EcommerceError::StoreProductNotFound { store_id: restock.store_id, product_id: restock.product_id })?;
            add_stock(sp, restock.qty.value())?;
        }

        *guard = next;
        Ok(())
    }

    async fn apply_mutation(&self, mutation: &StockMutation) -> Result<Vec<StockJournal>> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let from = mutation.from_store_id();
        let to = mutation.to_store_id();
        if !next.stores.contains(&to) {
            return Err(EcommerceError::StoreNotFound(to));
        }
        let mut journals = Vec::with_capacity(mutation.lines().len());

        for (line, journal) in mutation.lines().iter().zip(mutation.journals()) {
            let requested = line.qty.value();
            let source = next.store_products.get_mut(&(from, line.product_id))
                .ok_or(EcommerceError::StoreProductNotFound { store_id: from, product_id: line.product_id })?;
            if source.qty < requested {
                return Err(EcommerceError::InsufficientStock { store_id: from, product_id: line.product_id, available: source.qty, requested });
            }
            source.qty -= requested;

            match next.store_products.get_mut(&(to, line.product_id)) {
                Some(dest) => add_stock(dest, requested)?,
                None => {
                    let id = next.next_id();
                    next.store_products.insert((to, line.product_id), StoreProduct { id, store_id: to, product_id: line.product_id, qty: requested });
                }
            }
            journals.push(next.append_journal(&journal));
        }

        *guard = next;
        Ok(journals)
    }

    async fn list_stock_journals(&self, filter: &JournalFilter) -> Result<(Vec<StockJournal>, i64)> {
        let state = self.state.lock().await;
        let needle = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_lowercase);

        let mut matched: Vec<&StockJournal> = state.journals.iter()
            .filter(|j| filter.store_id.map_or(true, |s| j.store_id == s || j.to_store_id == s))
            .filter(|j| match &needle {
                Some(n) => state.products.get(&j.product_id).is_some_and(|name| name.to_lowercase().contains(n)),
                None => true,
            })
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = i64::try_from(matched.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(filter.page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(filter.page.limit()).unwrap_or(0);
        let page = matched.into_iter().skip(offset).take(take).cloned().collect();
        Ok((page, total))
    }

    async fn monthly_revenue(&self, year: i32, store_id: Option<i64>) -> Result<[Decimal; 12]> {
        let state = self.state.lock().await;
        let mut months = [Decimal::ZERO; 12];
        let sales = state.orders.values()
            .filter(|o| o.status() != OrderStatus::OrderCancelled)
            .filter(|o| o.created_at().year() == year)
            .filter(|o| store_id.map_or(true, |s| o.store_id() == s));
        for order in sales {
            if let Some(slot) = usize::try_from(order.created_at().month0()).ok().and_then(|i| months.get_mut(i)) {
                *slot += order.total();
            }
        }
        Ok(months)
    }
}
