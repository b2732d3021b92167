//! Billing records.
//!
//! A billing record is what the customer was charged for a reservation. The
//! billing service only appends them; nothing here edits or deletes a record.

use async_trait::async_trait;
use car_rental_core::environment::Clock;
use car_rental_core::{BookingError, DateTime, ReservationId, Result, UserId, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// Payment state of a billing record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BillingStatus {
    /// Charged but not settled
    Pending,
    /// Settled
    Paid,
    /// Returned to the customer
    Refunded,
}

impl BillingStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Refunded => "Refunded",
        }
    }

    /// Parse the storage representation
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(Self::Pending),
            "Paid" => Some(Self::Paid),
            "Refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A charge to be recorded
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewBillingRecord {
    /// Customer charged
    pub user_id: UserId,
    /// Reservation the charge is for
    pub reservation_id: ReservationId,
    /// Promotion applied, if any
    #[serde(default)]
    pub promo_id: Option<i64>,
    /// Amount charged
    pub amount: f64,
    /// Payment state
    pub status: BillingStatus,
}

impl NewBillingRecord {
    /// Check identifiers and amount before anything is stored.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a non-positive id or an amount that is not a
    /// positive finite number.
    pub fn validate(&self) -> Result<()> {
        if !self.user_id.is_valid() {
            return Err(BookingError::Validation("user_id must be positive".to_string()));
        }
        if !self.reservation_id.is_valid() {
            return Err(BookingError::Validation("reservation_id must be positive".to_string()));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(BookingError::Validation(format!("invalid amount {}", self.amount)));
        }
        Ok(())
    }
}

/// A stored billing record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Store-assigned id
    pub bill_id: i64,
    /// Customer charged
    pub user_id: UserId,
    /// Reservation the charge is for
    pub reservation_id: ReservationId,
    /// Promotion applied, if any
    pub promo_id: Option<i64>,
    /// Amount charged
    pub amount: f64,
    /// Payment state
    pub status: BillingStatus,
    /// When the record was stored
    pub created_at: DateTime<Utc>,
}

/// Append-only store of billing records.
#[async_trait]
pub trait BillingRepository: Send + Sync {
    /// Validate and store a record.
    ///
    /// # Errors
    ///
    /// - `Validation` when [`NewBillingRecord::validate`] fails
    /// - `DependencyFailure` when the store fails
    async fn insert(&self, record: NewBillingRecord) -> Result<BillingRecord>;

    /// A user's billing records, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DependencyFailure` when the store fails.
    async fn records_for_user(&self, user_id: UserId) -> Result<Vec<BillingRecord>>;
}

/// Billing records kept in process memory.
#[derive(Clone)]
pub struct InMemoryBillingRepository {
    records: Arc<Mutex<Vec<BillingRecord>>>,
    next_id: Arc<AtomicI64>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBillingRepository {
    /// Create an empty repository stamping records with `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicI64::new(0)),
            clock,
        }
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, Vec<BillingRecord>>> {
        self.records
            .lock()
            .map_err(|_| BookingError::DependencyFailure("billing store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BillingRepository for InMemoryBillingRepository {
    async fn insert(&self, record: NewBillingRecord) -> Result<BillingRecord> {
        record.validate()?;

        let stored = BillingRecord {
            bill_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id: record.user_id,
            reservation_id: record.reservation_id,
            promo_id: record.promo_id,
            amount: record.amount,
            status: record.status,
            created_at: self.clock.now(),
        };
        self.records()?.push(stored.clone());
        Ok(stored)
    }

    async fn records_for_user(&self, user_id: UserId) -> Result<Vec<BillingRecord>> {
        let mut records: Vec<BillingRecord> = self
            .records()?
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.bill_id)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use car_rental_testing::{manual_clock, test_clock};
    use chrono::Duration;

    fn charge(user: i64, reservation: i64, amount: f64) -> NewBillingRecord {
        NewBillingRecord {
            user_id: UserId::new(user),
            reservation_id: ReservationId::new(reservation),
            promo_id: None,
            amount,
            status: BillingStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_timestamp() {
        let clock = test_clock();
        let repo = InMemoryBillingRepository::new(Arc::new(clock.clone()));

        let first = repo.insert(charge(1, 10, 45.0)).await.unwrap();
        let second = repo.insert(charge(1, 11, 12.5)).await.unwrap();

        assert_eq!(first.bill_id, 1);
        assert_eq!(second.bill_id, 2);
        assert_eq!(first.created_at, clock.now());
        assert_eq!(first.status, BillingStatus::Pending);
    }

    #[tokio::test]
    async fn test_invalid_records_are_not_stored() {
        let repo = InMemoryBillingRepository::new(Arc::new(test_clock()));

        for bad in [charge(0, 10, 5.0), charge(1, -3, 5.0), charge(1, 10, 0.0), charge(1, 10, f64::INFINITY)] {
            assert!(matches!(repo.insert(bad).await, Err(BookingError::Validation(_))));
        }
        assert!(repo.records_for_user(UserId::new(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_for_user_newest_first() {
        let clock = manual_clock();
        let repo = InMemoryBillingRepository::new(Arc::new(clock.clone()));

        let older = repo.insert(charge(1, 10, 20.0)).await.unwrap();
        clock.advance(Duration::minutes(1));
        repo.insert(charge(2, 11, 30.0)).await.unwrap();
        let newer = repo.insert(charge(1, 12, 40.0)).await.unwrap();

        assert_eq!(repo.records_for_user(UserId::new(1)).await.unwrap(), vec![newer, older]);
    }

    #[test]
    fn test_status_round_trips_storage_form() {
        for status in [BillingStatus::Pending, BillingStatus::Paid, BillingStatus::Refunded] {
            assert_eq!(BillingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BillingStatus::parse("Overdue"), None);
    }
}
