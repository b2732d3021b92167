//! Account operations exposed by the user service.
//!
//! Registration, login, logout, and profile management on top of a
//! [`UserRepository`], a [`CredentialHasher`], and the session provider.

use crate::error::{AuthError, Result};
use crate::identity::SessionIdentityProvider;
use crate::providers::{CredentialHasher, UserRepository};
use crate::session::SessionToken;
use crate::state::{Membership, NewUser, NewUserRecord, ProfileUpdate, User, UserChanges};
use crate::utils::{require_fields, validate_email, validate_password};
use car_rental_core::UserId;
use std::sync::Arc;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The authenticated user
    pub user: User,
    /// Token for the new session
    pub token: SessionToken,
}

/// Identity service facade.
#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    hasher: Arc<dyn CredentialHasher>,
    sessions: SessionIdentityProvider,
}

impl IdentityService {
    /// Assemble the service from its dependencies.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        hasher: Arc<dyn CredentialHasher>,
        sessions: SessionIdentityProvider,
    ) -> Self {
        Self { users, hasher, sessions }
    }

    /// The session provider, for token resolution.
    #[must_use]
    pub const fn sessions(&self) -> &SessionIdentityProvider {
        &self.sessions
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank fields, a malformed email, or a short password
    /// - `DuplicateUser` when the email or phone number is taken
    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        require_fields(&[
            ("name", new_user.name.as_str()),
            ("email", new_user.email.as_str()),
            ("phone_no", new_user.phone_no.as_str()),
            ("password", new_user.password.as_str()),
        ])?;
        validate_email(&new_user.email)?;
        validate_password(&new_user.password)?;

        let password_hash = self.hash_password(new_user.password).await?;
        let user = self
            .users
            .create_user(NewUserRecord {
                name: new_user.name.trim().to_string(),
                email: new_user.email.trim().to_string(),
                phone_no: new_user.phone_no.trim().to_string(),
                password_hash,
                dob: new_user.dob,
            })
            .await?;

        tracing::info!(user_id = %user.user_id, "User registered");
        Ok(user)
    }

    /// Verify credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email or a wrong password.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let Some(stored) = self.users.get_user_by_email(email.trim()).await? else {
            tracing::warn!("Login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.verify_password(password.to_string(), stored.password_hash).await? {
            tracing::warn!(user_id = %stored.user.user_id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.sessions.create_session(stored.user.user_id).await?;
        tracing::info!(user_id = %stored.user.user_id, "User logged in");

        Ok(LoginOutcome {
            user: stored.user,
            token,
        })
    }

    /// End the caller's session. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns error only if the session store is unreachable.
    pub async fn logout(&self, raw_token: &str) -> Result<()> {
        self.sessions.invalidate(raw_token).await
    }

    /// Resolve a session token to its user id.
    ///
    /// # Errors
    ///
    /// Returns `Unauthenticated` for a missing, malformed, or expired session.
    pub async fn current_user(&self, raw_token: &str) -> Result<UserId> {
        self.sessions.resolve(raw_token).await
    }

    /// Public profile of a user.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown id.
    pub async fn profile(&self, user_id: UserId) -> Result<User> {
        self.users
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Apply a partial profile update; a new password is re-hashed.
    ///
    /// # Errors
    ///
    /// - `Validation` for blank values, a malformed email, or a short password
    /// - `DuplicateUser` when the new email or phone number is taken
    /// - `UserNotFound` for an unknown id
    pub async fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> Result<User> {
        let mut present = Vec::new();
        if let Some(name) = &update.name {
            present.push(("name", name.as_str()));
        }
        if let Some(phone_no) = &update.phone_no {
            present.push(("phone_no", phone_no.as_str()));
        }
        require_fields(&present)?;
        if let Some(email) = &update.email {
            validate_email(email)?;
        }

        let password_hash = match update.password {
            Some(password) => {
                validate_password(&password)?;
                Some(self.hash_password(password).await?)
            },
            None => None,
        };

        let user = self
            .users
            .update_user(
                user_id,
                UserChanges {
                    name: update.name.map(|s| s.trim().to_string()),
                    email: update.email.map(|s| s.trim().to_string()),
                    phone_no: update.phone_no.map(|s| s.trim().to_string()),
                    dob: update.dob,
                    password_hash,
                },
            )
            .await?;

        tracing::info!(user_id = %user_id, "Profile updated");
        Ok(user)
    }

    /// Membership tier details of a user.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown id.
    pub async fn membership(&self, user_id: UserId) -> Result<Membership> {
        self.users.get_membership(user_id).await
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::InternalError(format!("hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: String, hash: String) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::InternalError(format!("verification task failed: {e}")))?
    }
}
