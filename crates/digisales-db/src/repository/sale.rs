//! # Sale Repository
//!
//! Database operations for synchronized sales.
//!
//! ## Insert Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    insert_if_absent(sale)                               │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │    INSERT INTO sales ...                                                │
//! │       │                                                                 │
//! │       ├── ok                      → COMMIT   → InsertOutcome::Inserted  │
//! │       ├── UNIQUE(invoice_id)      → ROLLBACK → InsertOutcome::Skipped   │
//! │       └── any other error         → ROLLBACK → Err(DbError)             │
//! │                                                                         │
//! │  Existing rows are never updated.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use digisales_core::{NewSale, Sale};

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// A row with the same invoice id already existed; nothing changed.
    Skipped,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

/// Constraint name SQLite reports when an invoice id is already stored.
const INVOICE_ID_KEY: &str = "sales.invoice_id";

const SALE_COLUMNS: &str = "id, invoice_id, product_id, product_name, product_entry, \
     date_put, date_pay, email, amount_in, amount_out, currency, payment_method, \
     aggregator, ip, partner_id, lang, created_at";

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Inserts a sale unless its invoice id is already stored.
    ///
    /// Runs in its own transaction so a failed row never affects others.
    pub async fn insert_if_absent(&self, sale: &NewSale) -> DbResult<InsertOutcome> {
        let id = Uuid::new_v4().to_string();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_id, product_id, product_name, product_entry,
                date_put, date_pay, email, amount_in, amount_out,
                currency, payment_method, aggregator, ip, partner_id,
                lang, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15,
                ?16, ?17
            )
            "#,
        )
        .bind(&id)
        .bind(&sale.invoice_id)
        .bind(sale.product_id)
        .bind(&sale.product_name)
        .bind(&sale.product_entry)
        .bind(sale.date_put.with_timezone(&Utc))
        .bind(sale.date_pay.map(|d| d.with_timezone(&Utc)))
        .bind(&sale.email)
        .bind(sale.amount_in)
        .bind(sale.amount_out)
        .bind(&sale.currency)
        .bind(&sale.payment_method)
        .bind(&sale.aggregator)
        .bind(&sale.ip)
        .bind(sale.partner_id)
        .bind(&sale.lang)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => {
                tx.commit()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                debug!(invoice_id = %sale.invoice_id, id = %id, "Sale inserted");
                Ok(InsertOutcome::Inserted)
            }
            Err(DbError::UniqueViolation { field, .. }) if field == INVOICE_ID_KEY => {
                tx.rollback()
                    .await
                    .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
                debug!(invoice_id = %sale.invoice_id, "Sale already stored, skipped");
                Ok(InsertOutcome::Skipped)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed insert also failed");
                }
                Err(err)
            }
        }
    }

    /// Highest stored payment time, if any sale has one.
    pub async fn latest_payment_time(&self) -> DbResult<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT MAX(date_pay) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(latest)
    }

    /// Highest stored order creation time, if any sale exists.
    pub async fn latest_order_time(&self) -> DbResult<Option<DateTime<Utc>>> {
        let latest: Option<DateTime<Utc>> = sqlx::query_scalar("SELECT MAX(date_put) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(latest)
    }

    /// Gets a sale by its remote invoice id.
    pub async fn get_by_invoice_id(&self, invoice_id: &str) -> DbResult<Option<Sale>> {
        let row = sqlx::query(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE invoice_id = ?1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::map_row).transpose()
    }

    /// Case-insensitive substring search over invoice id, product name,
    /// product entry, email and ip. Newest payments first.
    ///
    /// An empty term returns the most recent sales. SQLite `LIKE` folds
    /// ASCII case only.
    pub async fn search(&self, term: &str, limit: u32) -> DbResult<Vec<Sale>> {
        let pattern = format!("%{}%", escape_like(term.trim()));

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE invoice_id LIKE ?1 ESCAPE '\'
               OR product_name LIKE ?1 ESCAPE '\'
               OR product_entry LIKE ?1 ESCAPE '\'
               OR email LIKE ?1 ESCAPE '\'
               OR ip LIKE ?1 ESCAPE '\'
            ORDER BY date_pay DESC, date_put DESC
            LIMIT ?2
            "#
        ))
        .bind(pattern)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::map_row).collect()
    }

    /// Counts stored sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    fn map_row(row: SqliteRow) -> DbResult<Sale> {
        Ok(Sale {
            id: row.try_get("id")?,
            invoice_id: row.try_get("invoice_id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("product_name")?,
            product_entry: row.try_get("product_entry")?,
            date_put: row.try_get("date_put")?,
            date_pay: row.try_get("date_pay")?,
            email: row.try_get("email")?,
            amount_in: row.try_get("amount_in")?,
            amount_out: row.try_get("amount_out")?,
            currency: row.try_get("currency")?,
            payment_method: row.try_get("payment_method")?,
            aggregator: row.try_get("aggregator")?,
            ip: row.try_get("ip")?,
            partner_id: row.try_get("partner_id")?,
            lang: row.try_get("lang")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Escapes `LIKE` wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================
