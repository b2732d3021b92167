//! User repository trait.

use crate::error::Result;
use crate::state::{Membership, NewUserRecord, StoredUser, User, UserChanges};
use async_trait::async_trait;
use car_rental_core::UserId;

/// User repository.
///
/// This trait abstracts over account storage (in memory or PostgreSQL).
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account in the default membership tier.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Email or phone number is taken → `AuthError::DuplicateUser`
    /// - Database query fails
    async fn create_user(&self, user: NewUserRecord) -> Result<User>;

    /// Get an account (with its hash) by login email.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn get_user_by_email(&self, email: &str) -> Result<Option<StoredUser>>;

    /// Get an account by id.
    ///
    /// # Errors
    ///
    /// Returns error if the database query fails.
    async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - User not found → `AuthError::UserNotFound`
    /// - New email or phone number is taken → `AuthError::DuplicateUser`
    /// - Database query fails
    async fn update_user(&self, user_id: UserId, changes: UserChanges) -> Result<User>;

    /// Membership tier details of a user.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - User not found → `AuthError::UserNotFound`
    /// - Database query fails
    async fn get_membership(&self, user_id: UserId) -> Result<Membership>;
}
