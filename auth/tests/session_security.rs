//! Security properties of session handling.
//!
//! - Revocation wins over concurrent resolves, including a sliding refresh
//! - Forged tokens of the right shape are rejected
//! - Login failures do not reveal which half of the credential was wrong
//! - Only digests are stored

use async_trait::async_trait;
use car_rental_auth::stores::{InMemorySessionStore, InMemoryUserRepository};
use car_rental_auth::{
    Argon2Hasher, AuthError, IdentityService, NewUser, Session, SessionConfig,
    SessionIdentityProvider, SessionStore, SessionToken,
};
use car_rental_core::UserId;
use car_rental_testing::manual_clock;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;
use tokio::task::JoinSet;

fn provider(store: Arc<InMemorySessionStore>) -> SessionIdentityProvider {
    SessionIdentityProvider::new(store, Arc::new(manual_clock()), SessionConfig::default())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sessions_are_isolated_under_concurrency() {
    let provider = provider(Arc::new(InMemorySessionStore::new()));

    let mut tasks = JoinSet::new();
    for id in 1..=32 {
        let provider = provider.clone();
        tasks.spawn(async move {
            let token = provider.create_session(UserId::new(id)).await.unwrap();
            let resolved = provider.resolve(token.as_str()).await.unwrap();
            (id, resolved)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (id, resolved) = joined.unwrap();
        assert_eq!(resolved, UserId::new(id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_revoked_session_never_resolves_again() {
    let provider = provider(Arc::new(InMemorySessionStore::new()));
    let token = provider.create_session(UserId::new(7)).await.unwrap();

    let mut tasks = JoinSet::new();
    for _ in 0..8 {
        let provider = provider.clone();
        let raw = token.as_str().to_string();
        tasks.spawn(async move { provider.invalidate(&raw).await });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(joined.unwrap().is_ok());
    }

    assert!(matches!(
        provider.resolve(token.as_str()).await,
        Err(AuthError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_forged_tokens_are_rejected() {
    let provider = provider(Arc::new(InMemorySessionStore::new()));
    let real = provider.create_session(UserId::new(1)).await.unwrap();

    let mut tampered = real.as_str().to_string();
    let last = if tampered.ends_with('A') { "Q" } else { "A" };
    tampered.replace_range(tampered.len() - 1.., last);

    for forged in [
        SessionToken::generate().as_str().to_string(),
        tampered,
        String::new(),
        "user-session".to_string(),
    ] {
        assert!(
            matches!(provider.resolve(&forged).await, Err(AuthError::Unauthenticated)),
            "accepted {forged:?}"
        );
    }
}

#[tokio::test]
async fn test_store_never_sees_plaintext_token() {
    let store = Arc::new(InMemorySessionStore::new());
    let provider = provider(Arc::clone(&store));
    let token = provider.create_session(UserId::new(3)).await.unwrap();

    assert_eq!(store.session_count().unwrap(), 1);
    assert!(store.get_session(token.as_str()).await.unwrap().is_none());
    let stored = store.get_session(&token.digest()).await.unwrap().unwrap();
    assert_eq!(stored.user_id, UserId::new(3));
}

#[tokio::test]
async fn test_expired_session_is_rejected_and_purged() {
    let clock = manual_clock();
    let store = Arc::new(InMemorySessionStore::new());
    let provider = SessionIdentityProvider::new(
        store.clone(),
        Arc::new(clock.clone()),
        SessionConfig::new(Duration::minutes(30)),
    );
    let stale = provider.create_session(UserId::new(1)).await.unwrap();
    clock.advance(Duration::minutes(20));
    let fresh = provider.create_session(UserId::new(2)).await.unwrap();

    clock.advance(Duration::minutes(15));

    assert_eq!(provider.purge_expired().await.unwrap(), 1);
    assert!(provider.resolve(stale.as_str()).await.is_err());
    assert_eq!(provider.resolve(fresh.as_str()).await.unwrap(), UserId::new(2));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let service = IdentityService::new(
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(Argon2Hasher::new()),
        provider(Arc::new(InMemorySessionStore::new())),
    );
    service
        .register(NewUser {
            name: "Alice Tan".to_string(),
            email: "alice@example.com".to_string(),
            phone_no: "91234567".to_string(),
            password: "correct horse".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 4, 1).unwrap(),
        })
        .await
        .unwrap();

    let unknown = service.login("bob@example.com", "correct horse").await.unwrap_err();
    let wrong = service.login("alice@example.com", "battery staple").await.unwrap_err();

    assert_eq!(unknown.to_string(), wrong.to_string());
    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert!(matches!(wrong, AuthError::InvalidCredentials));
}

/// Store where a logout lands between the read and the sliding refresh.
struct LogoutDuringResolve {
    inner: InMemorySessionStore,
}

#[async_trait]
impl SessionStore for LogoutDuringResolve {
    async fn create_session(&self, session: &Session, ttl: Duration) -> car_rental_auth::Result<()> {
        self.inner.create_session(session, ttl).await
    }

    async fn get_session(&self, digest: &str) -> car_rental_auth::Result<Option<Session>> {
        let session = self.inner.get_session(digest).await?;
        self.inner.delete_session(digest).await?;
        Ok(session)
    }

    async fn update_session(&self, session: &Session, ttl: Duration) -> car_rental_auth::Result<bool> {
        self.inner.update_session(session, ttl).await
    }

    async fn delete_session(&self, digest: &str) -> car_rental_auth::Result<()> {
        self.inner.delete_session(digest).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> car_rental_auth::Result<usize> {
        self.inner.purge_expired(now).await
    }
}

#[tokio::test]
async fn test_sliding_refresh_does_not_resurrect_logged_out_session() {
    let inner = InMemorySessionStore::new();
    let provider = SessionIdentityProvider::new(
        Arc::new(LogoutDuringResolve { inner: inner.clone() }),
        Arc::new(manual_clock()),
        SessionConfig::default().with_sliding(true),
    );
    let token = provider.create_session(UserId::new(7)).await.unwrap();

    assert!(matches!(
        provider.resolve(token.as_str()).await,
        Err(AuthError::Unauthenticated)
    ));
    assert!(inner.get_session(&token.digest()).await.unwrap().is_none());
    assert_eq!(inner.session_count().unwrap(), 0);
}
