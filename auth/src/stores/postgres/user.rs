//! PostgreSQL user repository implementation.
//!
//! # Example
//!
//! ```no_run
//! use car_rental_auth::stores::postgres::PostgresUserRepository;
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgresql://localhost/car_rental").await?;
//! let repo = PostgresUserRepository::new(pool);
//! repo.migrate().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::UserRepository;
use crate::state::{Membership, NewUserRecord, StoredUser, User, UserChanges};
use async_trait::async_trait;
use car_rental_core::UserId;
use chrono::NaiveDate;
use sqlx::PgPool;

type UserRow = (i64, String, String, String, NaiveDate, String);

fn user_from_row((user_id, name, email, phone_no, dob, membership_tier): UserRow) -> User {
    User {
        user_id: UserId::new(user_id),
        name,
        email,
        phone_no,
        dob,
        membership_tier,
    }
}

fn map_write_error(action: &str, e: &sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = e {
        if db_err.is_unique_violation() {
            return AuthError::DuplicateUser;
        }
    }
    AuthError::DatabaseError(format!("Failed to {action}: {e}"))
}

/// PostgreSQL user repository.
#[derive(Clone)]
pub struct PostgresUserRepository {
    /// PostgreSQL connection pool.
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new PostgreSQL user repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("./migrations");
        // The fleet schema shares the migrations table.
        migrator.set_ignore_missing(true);
        migrator
            .run(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, user: NewUserRecord) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO users (name, email, phone_no, password_hash, dob)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING user_id, name, email, phone_no, dob, membership_tier
            ",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone_no)
        .bind(&user.password_hash)
        .bind(user.dob)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error("create user", &e))?;

        let created = user_from_row(row);
        tracing::info!(user_id = %created.user_id, "Registered user");
        Ok(created)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let row: Option<(i64, String, String, String, NaiveDate, String, String)> = sqlx::query_as(
            r"
            SELECT user_id, name, email, phone_no, dob, membership_tier, password_hash
            FROM users
            WHERE LOWER(email) = LOWER($1)
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to get user: {e}")))?;

        Ok(row.map(|(user_id, name, email, phone_no, dob, tier, password_hash)| StoredUser {
            user: user_from_row((user_id, name, email, phone_no, dob, tier)),
            password_hash,
        }))
    }

    async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT user_id, name, email, phone_no, dob, membership_tier
            FROM users
            WHERE user_id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to get user: {e}")))?;

        Ok(row.map(user_from_row))
    }

    async fn update_user(&self, user_id: UserId, changes: UserChanges) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone_no = COALESCE($4, phone_no),
                dob = COALESCE($5, dob),
                password_hash = COALESCE($6, password_hash)
            WHERE user_id = $1
            RETURNING user_id, name, email, phone_no, dob, membership_tier
            ",
        )
        .bind(user_id.get())
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.phone_no)
        .bind(changes.dob)
        .bind(changes.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error("update user", &e))?;

        row.map(user_from_row).ok_or(AuthError::UserNotFound)
    }

    async fn get_membership(&self, user_id: UserId) -> Result<Membership> {
        let row: Option<(String, f64, bool, i32)> = sqlx::query_as(
            r"
            SELECT m.membership_tier, m.hourly_rate_discount, m.priority_access, m.booking_limit
            FROM memberships m
            INNER JOIN users u ON u.membership_tier = m.membership_tier
            WHERE u.user_id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(format!("Failed to get membership: {e}")))?;

        let (tier, hourly_rate_discount, priority_access, booking_limit) =
            row.ok_or(AuthError::UserNotFound)?;

        Ok(Membership {
            tier,
            hourly_rate_discount,
            priority_access,
            booking_limit,
        })
    }
}
