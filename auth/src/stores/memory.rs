//! In-memory stores.
//!
//! Used by tests and by binaries started without `REDIS_URL` /
//! `DATABASE_URL`. State lives behind `Arc<Mutex<_>>` so clones share it.

use crate::error::{AuthError, Result};
use crate::providers::{SessionStore, UserRepository};
use crate::session::Session;
use crate::state::{
    DEFAULT_MEMBERSHIP_TIER, Membership, NewUserRecord, StoredUser, User, UserChanges,
};
use async_trait::async_trait;
use car_rental_core::UserId;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
}

// ═══════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get count of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(lock(&self.sessions)?.len())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self, session: &Session, _ttl: Duration) -> Result<()> {
        let mut sessions = lock(&self.sessions)?;
        if sessions.contains_key(&session.token_digest) {
            return Err(AuthError::DatabaseError("Session already exists".to_string()));
        }
        sessions.insert(session.token_digest.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, digest: &str) -> Result<Option<Session>> {
        Ok(lock(&self.sessions)?.get(digest).cloned())
    }

    async fn update_session(&self, session: &Session, _ttl: Duration) -> Result<bool> {
        match lock(&self.sessions)?.get_mut(&session.token_digest) {
            Some(stored) => {
                *stored = session.clone();
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn delete_session(&self, digest: &str) -> Result<()> {
        lock(&self.sessions)?.remove(digest);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut sessions = lock(&self.sessions)?;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        Ok(before - sessions.len())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Users
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    users: HashMap<UserId, StoredUser>,
}

impl UserTable {
    fn is_taken(&self, email: Option<&str>, phone_no: Option<&str>, except: Option<UserId>) -> bool {
        self.users.values().any(|stored| {
            Some(stored.user.user_id) != except
                && (email.is_some_and(|e| stored.user.email.eq_ignore_ascii_case(e))
                    || phone_no.is_some_and(|p| stored.user.phone_no == p))
        })
    }
}

/// In-memory user repository seeded with the standard membership tiers.
#[derive(Debug, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<Mutex<UserTable>>,
    tiers: Arc<HashMap<String, Membership>>,
}

impl InMemoryUserRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        let tiers = Membership::standard_tiers()
            .into_iter()
            .map(|m| (m.tier.clone(), m))
            .collect();
        Self {
            table: Arc::new(Mutex::new(UserTable::default())),
            tiers: Arc::new(tiers),
        }
    }

    /// Move a user to another tier (for testing and seeding).
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown user and `Validation` for an
    /// unknown tier.
    pub fn set_tier(&self, user_id: UserId, tier: &str) -> Result<()> {
        if !self.tiers.contains_key(tier) {
            return Err(AuthError::Validation(format!("unknown membership tier {tier}")));
        }
        let mut table = lock(&self.table)?;
        let stored = table.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        stored.user.membership_tier = tier.to_string();
        Ok(())
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create_user(&self, user: NewUserRecord) -> Result<User> {
        let mut table = lock(&self.table)?;
        if table.is_taken(Some(&user.email), Some(&user.phone_no), None) {
            return Err(AuthError::DuplicateUser);
        }

        table.next_id += 1;
        let created = User {
            user_id: UserId::new(table.next_id),
            name: user.name,
            email: user.email,
            phone_no: user.phone_no,
            dob: user.dob,
            membership_tier: DEFAULT_MEMBERSHIP_TIER.to_string(),
        };
        table.users.insert(
            created.user_id,
            StoredUser {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        Ok(lock(&self.table)?
            .users
            .values()
            .find(|stored| stored.user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        Ok(lock(&self.table)?.users.get(&user_id).map(|stored| stored.user.clone()))
    }

    async fn update_user(&self, user_id: UserId, changes: UserChanges) -> Result<User> {
        let mut table = lock(&self.table)?;
        if !table.users.contains_key(&user_id) {
            return Err(AuthError::UserNotFound);
        }
        if table.is_taken(changes.email.as_deref(), changes.phone_no.as_deref(), Some(user_id)) {
            return Err(AuthError::DuplicateUser);
        }

        let stored = table.users.get_mut(&user_id).ok_or(AuthError::UserNotFound)?;
        if let Some(name) = changes.name {
            stored.user.name = name;
        }
        if let Some(email) = changes.email {
            stored.user.email = email;
        }
        if let Some(phone_no) = changes.phone_no {
            stored.user.phone_no = phone_no;
        }
        if let Some(dob) = changes.dob {
            stored.user.dob = dob;
        }
        if let Some(password_hash) = changes.password_hash {
            stored.password_hash = password_hash;
        }
        Ok(stored.user.clone())
    }

    async fn get_membership(&self, user_id: UserId) -> Result<Membership> {
        let tier = lock(&self.table)?
            .users
            .get(&user_id)
            .map(|stored| stored.user.membership_tier.clone())
            .ok_or(AuthError::UserNotFound)?;

        self.tiers
            .get(&tier)
            .cloned()
            .ok_or_else(|| AuthError::DatabaseError(format!("membership tier {tier} missing")))
    }
}
