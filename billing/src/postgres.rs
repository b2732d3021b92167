//! PostgreSQL billing repository.
//!
//! # Example
//!
//! ```no_run
//! use car_rental_billing::PostgresBillingRepository;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/car_rental").await?;
//! let repo = PostgresBillingRepository::new(pool);
//! repo.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::records::{BillingRecord, BillingRepository, BillingStatus, NewBillingRecord};
use async_trait::async_trait;
use car_rental_core::{BookingError, DateTime, ReservationId, Result, UserId, Utc};
use sqlx::PgPool;

const BILLING_COLUMNS: &str = "bill_id, user_id, reservation_id, promo_id, amount, status, created_at";

type BillingRow = (i64, i64, i64, Option<i64>, f64, String, DateTime<Utc>);

fn db_error(action: &str, e: &sqlx::Error) -> BookingError {
    tracing::error!(error = %e, action, "Billing database operation failed");
    BookingError::DependencyFailure(format!("failed to {action}"))
}

fn record_from_row(row: BillingRow) -> Result<BillingRecord> {
    let (bill_id, user_id, reservation_id, promo_id, amount, status, created_at) = row;
    let status = BillingStatus::parse(&status)
        .ok_or_else(|| BookingError::DependencyFailure(format!("unknown billing status {status}")))?;
    Ok(BillingRecord {
        bill_id,
        user_id: UserId::new(user_id),
        reservation_id: ReservationId::new(reservation_id),
        promo_id,
        amount,
        status,
        created_at,
    })
}

/// Billing records in the `billing_records` table.
#[derive(Clone)]
pub struct PostgresBillingRepository {
    pool: PgPool,
}

impl PostgresBillingRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations");
        // Identity and fleet migrations share the table.
        migrator.set_ignore_missing(true);
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| BookingError::DependencyFailure(format!("migration failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl BillingRepository for PostgresBillingRepository {
    async fn insert(&self, record: NewBillingRecord) -> Result<BillingRecord> {
        record.validate()?;

        let row: BillingRow = sqlx::query_as(&format!(
            r"
            INSERT INTO billing_records (user_id, reservation_id, promo_id, amount, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BILLING_COLUMNS}
            "
        ))
        .bind(record.user_id.get())
        .bind(record.reservation_id.get())
        .bind(record.promo_id)
        .bind(record.amount)
        .bind(record.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("insert billing record", &e))?;

        record_from_row(row)
    }

    async fn records_for_user(&self, user_id: UserId) -> Result<Vec<BillingRecord>> {
        let rows: Vec<BillingRow> = sqlx::query_as(&format!(
            "SELECT {BILLING_COLUMNS} FROM billing_records WHERE user_id = $1 \
             ORDER BY created_at DESC, bill_id DESC"
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list billing records", &e))?;

        rows.into_iter().map(record_from_row).collect()
    }
}
