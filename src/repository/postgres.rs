//! Postgres implementation of CommerceRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::domain::aggregates::{
    Cancellation, JournalDetail, NewStockJournal, Order, OrderItem, OrderStatus, Payment, PaymentStatus, StockJournal,
    StockMutation, User,
};
use crate::domain::value_objects::Quantity;
use crate::repository::{CommerceRepository, JournalFilter};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommerceRepository for PostgresRepository {
    async fn find_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| User { id: r.id, email: r.email, name: r.name }))
    }

    async fn find_order(&self, order_id: i64) -> Result<Option<Order>> {
        let Some(row) = sqlx::query_as::<_, OrderRow>(
            "SELECT id, user_id, store_id, status, total, created_at FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let payment = sqlx::query_as::<_, PaymentRow>("SELECT id, payment_status FROM payments WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, product_id, qty FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut order = Order::new(row.id, row.user_id, row.store_id, row.status.parse()?, row.total)
            .with_created_at(row.created_at)
            .with_items(items.into_iter().map(OrderItemRow::into_domain).collect::<Result<_>>()?);
        if let Some(p) = payment {
            order = order.with_payment(Payment { id: p.id, status: p.payment_status.parse::<PaymentStatus>()? });
        }
        Ok(Some(order))
    }

    async fn apply_cancellation(&self, c: &Cancellation) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 AND user_id = $3 AND status = $4",
        )
        .bind(OrderStatus::OrderCancelled.as_str())
        .bind(c.order_id)
        .bind(c.user_id)
        .bind(c.previous_status.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(EcommerceError::ConcurrentModification(c.order_id));
        }

        sqlx::query("UPDATE payments SET payment_status = $1, updated_at = NOW() WHERE id = $2")
            .bind(PaymentStatus::Cancelled.as_str())
            .bind(c.payment_id)
            .execute(&mut *tx)
            .await?;

        for journal in &c.journals {
            insert_journal(&mut tx, journal).await?;
        }

        for restock in &c.restocks {
            let result = sqlx::query(
                "UPDATE store_products SET qty = qty + $3, updated_at = NOW() WHERE store_id = $1 AND product_id = $2",
            )
            .bind(restock.store_id)
            .bind(restock.product_id)
            .bind(restock.qty.value())
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(EcommerceError::StoreProductNotFound { store_id: restock.store_id, product_id: restock.product_id });
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn apply_mutation(&self, mutation: &StockMutation) -> Result<Vec<StockJournal>> {
        let mut tx = self.pool.begin().await?;
        let from = mutation.from_store_id();
        let to = mutation.to_store_id();

        let destination = sqlx::query_scalar::<_, i32>("SELECT 1 FROM stores WHERE id = $1")
            .bind(to)
            .fetch_optional(&mut *tx)
            .await?;
        if destination.is_none() {
            return Err(EcommerceError::StoreNotFound(to));
        }

        // Lines arrive sorted by product and both store rows are locked in
        // store id order, so opposite transfers cannot deadlock.
        let mut journals = Vec::with_capacity(mutation.lines().len());
        for (line, journal) in mutation.lines().iter().zip(mutation.journals()) {
            let locked = sqlx::query_as::<_, (i64, i32)>(
                r#"
                SELECT store_id, qty FROM store_products
                WHERE product_id = $1 AND store_id IN ($2, $3)
                ORDER BY store_id
                FOR UPDATE
                "#,
            )
            .bind(line.product_id)
            .bind(from)
            .bind(to)
            .fetch_all(&mut *tx)
            .await?;
            let available = locked.iter()
                .find(|(store_id, _)| *store_id == from)
                .map(|(_, qty)| *qty)
                .ok_or(EcommerceError::StoreProductNotFound { store_id: from, product_id: line.product_id })?;
            if available < line.qty.value() {
                return Err(EcommerceError::InsufficientStock {
                    store_id: from, product_id: line.product_id, available, requested: line.qty.value(),
                });
            }

            sqlx::query("UPDATE store_products SET qty = qty - $3, updated_at = NOW() WHERE store_id = $1 AND product_id = $2")
                .bind(from)
                .bind(line.product_id)
                .bind(line.qty.value())
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                r#"
                INSERT INTO store_products (store_id, product_id, qty) VALUES ($1, $2, $3)
                ON CONFLICT (store_id, product_id)
                DO UPDATE SET qty = store_products.qty + EXCLUDED.qty, updated_at = NOW()
                "#,
            )
            .bind(to)
            .bind(line.product_id)
            .bind(line.qty.value())
            .execute(&mut *tx)
            .await?;

            journals.push(insert_journal(&mut tx, &journal).await?);
        }

        tx.commit().await?;
        Ok(journals)
    }

    async fn list_stock_journals(&self, filter: &JournalFilter) -> Result<(Vec<StockJournal>, i64)> {
        const WHERE: &str = r#"
            WHERE ($1::BIGINT IS NULL OR j.store_id = $1 OR j.to_store_id = $1)
              AND ($2::TEXT IS NULL OR p.name ILIKE '%' || $2 || '%' ESCAPE '\')
        "#;
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(escape_like);

        let rows = sqlx::query_as::<_, StockJournalRow>(&format!(
            r#"
            SELECT j.id, j.product_id, j.store_id, j.to_store_id, j.qty, j.journal_type, j.status, j.created_at,
                   d.id AS detail_id, d.to_store_id AS detail_to_store_id
            FROM stock_journals j
            JOIN journal_details d ON d.stock_journal_id = j.id
            JOIN products p ON p.id = j.product_id
            {WHERE}
            ORDER BY j.created_at DESC, j.id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.store_id)
        .bind(search.as_deref())
        .bind(filter.page.limit())
        .bind(filter.page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM stock_journals j JOIN products p ON p.id = j.product_id {WHERE}"
        ))
        .bind(filter.store_id)
        .bind(search.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let journals = rows.into_iter().map(StockJournalRow::into_domain).collect::<Result<Vec<_>>>()?;
        Ok((journals, total.0))
    }

    async fn monthly_revenue(&self, year: i32, store_id: Option<i64>) -> Result<[Decimal; 12]> {
        let rows = sqlx::query_as::<_, (i32, Decimal)>(
            r#"
            SELECT EXTRACT(MONTH FROM created_at)::INT AS month, COALESCE(SUM(total), 0) AS amount
            FROM orders
            WHERE EXTRACT(YEAR FROM created_at)::INT = $1
              AND status <> $2
              AND ($3::BIGINT IS NULL OR store_id = $3)
            GROUP BY 1
            "#,
        )
        .bind(year)
        .bind(OrderStatus::OrderCancelled.as_str())
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut months = [Decimal::ZERO; 12];
        for (month, amount) in rows {
            if let Some(slot) = usize::try_from(month - 1).ok().and_then(|i| months.get_mut(i)) {
                *slot = amount;
            }
        }
        Ok(months)
    }
}

/// Escapes LIKE metacharacters so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn insert_journal(conn: &mut PgConnection, journal: &NewStockJournal) -> Result<StockJournal> {
    let (id, created_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
        r#"
        INSERT INTO stock_journals (product_id, store_id, to_store_id, qty, journal_type, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, created_at
        "#,
    )
    .bind(journal.product_id)
    .bind(journal.store_id)
    .bind(journal.to_store_id)
    .bind(journal.qty.value())
    .bind(journal.journal_type.as_str())
    .bind(journal.status.as_str())
    .fetch_one(&mut *conn)
    .await?;

    let detail_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO journal_details (stock_journal_id, to_store_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(id)
    .bind(journal.to_store_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(StockJournal {
        id,
        product_id: journal.product_id,
        store_id: journal.store_id,
        to_store_id: journal.to_store_id,
        qty: journal.qty,
        journal_type: journal.journal_type,
        status: journal.status,
        created_at,
        journal_detail: JournalDetail { id: detail_id, to_store_id: journal.to_store_id },
    })
}

// Row types for SQLx. Not exposed outside the adapter.

#[derive(Debug, sqlx::FromRow)]
struct UserRow { id: i64, email: String, name: String }

#[derive(Debug, sqlx::FromRow)]
struct OrderRow { id: i64, user_id: i64, store_id: i64, status: String, total: Decimal, created_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow { id: i64, payment_status: String }

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow { id: i64, product_id: i64, qty: i32 }

impl OrderItemRow {
    fn into_domain(self) -> Result<OrderItem> {
        Ok(OrderItem { id: self.id, product_id: self.product_id, qty: Quantity::new(self.qty)? })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StockJournalRow {
    id: i64,
    product_id: i64,
    store_id: i64,
    to_store_id: i64,
    qty: i32,
    journal_type: String,
    status: String,
    created_at: DateTime<Utc>,
    detail_id: i64,
    detail_to_store_id: i64,
}

impl StockJournalRow {
    fn into_domain(self) -> Result<StockJournal> {
        Ok(StockJournal {
            id: self.id,
            product_id: self.product_id,
            store_id: self.store_id,
            to_store_id: self.to_store_id,
            qty: Quantity::new(self.qty)?,
            journal_type: self.journal_type.parse()?,
            status: self.status.parse()?,
            created_at: self.created_at,
            journal_detail: JournalDetail { id: self.detail_id, to_store_id: self.detail_to_store_id },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_quotes_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("dark_roast"), "dark\\_roast");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("beans"), "beans");
    }
}
