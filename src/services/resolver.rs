//! Credential resolution
//!
//! Turns the credentials presented with a request into a `User`, if any.
//! Resolution runs an ordered chain of strategies and the first match wins:
//!
//! 1. Hosted session: the token matches an unexpired `sessions` row.
//!    Expired rows are deleted on sight and resolution continues.
//! 2. Admin sentinel: the token is the built-in admin's credential.
//! 3. Stored credential: the token is a `users` row id.
//!
//! A strategy failure is logged and treated as "no match", so a broken
//! store can never grant access.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{User, ADMIN_USER_ID};

/// Credentials extracted from a request.
///
/// A bearer token fills both slots: the chain first tries it as a hosted
/// session id, then as a local token. Cookie-carried tokens land in the
/// session slot only.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Candidate hosted session id
    pub session: Option<String>,
    /// Candidate local token (admin sentinel or stored user id)
    pub token: Option<String>,
}

impl Credentials {
    /// Credentials from a single opaque bearer token.
    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            session: Some(token.clone()),
            token: Some(token),
        }
    }

    /// Credentials from a session cookie.
    pub fn session(id: impl Into<String>) -> Self {
        Self {
            session: Some(id.into()),
            token: None,
        }
    }

    /// Whether any credential was presented at all.
    pub fn is_empty(&self) -> bool {
        self.session.is_none() && self.token.is_none()
    }
}

/// One step in the resolution chain.
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Try to produce a user from the presented credentials
    async fn try_resolve(&self, credentials: &Credentials) -> Result<Option<User>>;
}

/// Resolves tokens against the hosted `sessions` table.
struct HostedSessionStrategy {
    session_repo: Arc<dyn SessionRepository>,
    user_repo: Arc<dyn UserRepository>,
}

#[async_trait]
impl ResolveStrategy for HostedSessionStrategy {
    fn name(&self) -> &'static str {
        "hosted_session"
    }

    async fn try_resolve(&self, credentials: &Credentials) -> Result<Option<User>> {
        let Some(token) = credentials.session.as_deref() else {
            return Ok(None);
        };

        let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to look up session")?
        else {
            return Ok(None);
        };

        if session.is_expired() {
            // Dead rows are cleared so later strategies get their turn
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        let Some(user) = self
            .user_repo
            .get_by_id(&session.user_id)
            .await
            .context("Failed to load session user")?
        else {
            return Ok(None);
        };

        // A live hosted session always carries admin rights
        Ok(Some(User {
            is_admin: true,
            ..user
        }))
    }
}

/// Matches the built-in admin's sentinel token.
struct AdminSentinelStrategy;

#[async_trait]
impl ResolveStrategy for AdminSentinelStrategy {
    fn name(&self) -> &'static str {
        "admin_sentinel"
    }

    async fn try_resolve(&self, credentials: &Credentials) -> Result<Option<User>> {
        match credentials.token.as_deref() {
            Some(token) if token == ADMIN_USER_ID => Ok(Some(User::builtin_admin())),
            _ => Ok(None),
        }
    }
}

/// Falls back to looking the token up as a stored user id.
struct StoredCredentialStrategy {
    user_repo: Arc<dyn UserRepository>,
}

#[async_trait]
impl ResolveStrategy for StoredCredentialStrategy {
    fn name(&self) -> &'static str {
        "stored_credential"
    }

    async fn try_resolve(&self, credentials: &Credentials) -> Result<Option<User>> {
        let Some(token) = credentials.token.as_deref() else {
            return Ok(None);
        };

        self.user_repo
            .get_by_id(token)
            .await
            .context("Failed to look up user by token")
    }
}

/// The resolution chain. Order matters: a live hosted session shadows any
/// local token, and the sentinel shadows stored-user lookups.
pub struct SessionResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl SessionResolver {
    /// Build the default chain over the given repositories.
    pub fn new(
        session_repo: Arc<dyn SessionRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            strategies: vec![
                Box::new(HostedSessionStrategy {
                    session_repo,
                    user_repo: user_repo.clone(),
                }),
                Box::new(AdminSentinelStrategy),
                Box::new(StoredCredentialStrategy { user_repo }),
            ],
        }
    }

    /// Resolve the presented credentials to a user, if any.
    ///
    /// The first strategy that yields a user wins; the rest are never
    /// consulted. Strategy errors fail closed.
    pub async fn resolve(&self, credentials: &Credentials) -> Option<User> {
        if credentials.is_empty() {
            return None;
        }

        for strategy in &self.strategies {
            match strategy.try_resolve(credentials).await {
                Ok(Some(user)) => {
                    tracing::debug!(strategy = strategy.name(), user_id = %user.id, "Resolved credentials");
                    return Some(user);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(strategy = strategy.name(), error = %e, "Credential resolution step failed");
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Session;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    struct Fixture {
        resolver: SessionResolver,
        session_repo: Arc<dyn SessionRepository>,
        user_repo: Arc<dyn UserRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let user_repo = SqlxUserRepository::boxed(pool);
        Fixture {
            resolver: SessionResolver::new(session_repo.clone(), user_repo.clone()),
            session_repo,
            user_repo,
        }
    }

    async fn stored_user(fixture: &Fixture, username: &str) -> User {
        fixture
            .user_repo
            .create(&User::new(username, "hash", false))
            .await
            .expect("Failed to create user")
    }

    fn session_for(user_id: &str, days: i64) -> Session {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            expires_at: now + Duration::days(days),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_no_credentials_resolves_to_none() {
        let fixture = setup().await;
        assert!(fixture.resolver.resolve(&Credentials::default()).await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_token_resolves_to_none() {
        let fixture = setup().await;
        let user = fixture
            .resolver
            .resolve(&Credentials::bearer("not-a-real-token"))
            .await;
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_live_session_resolves_as_admin() {
        let fixture = setup().await;
        let user = stored_user(&fixture, "alice").await;
        let session = session_for(&user.id, 7);
        fixture.session_repo.create(&session).await.unwrap();

        let resolved = fixture
            .resolver
            .resolve(&Credentials::bearer(&session.id))
            .await
            .expect("Session should resolve");

        assert_eq!(resolved.id, user.id);
        assert!(resolved.is_admin, "Hosted sessions carry admin rights");
    }

    #[tokio::test]
    async fn test_live_session_wins_over_user_fallback() {
        let fixture = setup().await;
        let alice = stored_user(&fixture, "alice").await;
        let bob = stored_user(&fixture, "bob").await;

        // A session whose id collides with bob's user id: the hosted
        // strategy must win, so the result is alice, not bob.
        let now = Utc::now();
        let session = Session {
            id: bob.id.clone(),
            user_id: alice.id.clone(),
            expires_at: now + Duration::days(7),
            created_at: now,
        };
        fixture.session_repo.create(&session).await.unwrap();

        let resolved = fixture
            .resolver
            .resolve(&Credentials::bearer(&bob.id))
            .await
            .expect("Should resolve");
        assert_eq!(resolved.id, alice.id);
    }

    #[tokio::test]
    async fn test_expired_session_falls_through_to_sentinel() {
        let fixture = setup().await;
        let user = stored_user(&fixture, "alice").await;
        let expired = session_for(&user.id, -1);
        fixture.session_repo.create(&expired).await.unwrap();

        // Session slot holds the dead session, token slot the sentinel
        let credentials = Credentials {
            session: Some(expired.id.clone()),
            token: Some(ADMIN_USER_ID.to_string()),
        };

        let resolved = fixture
            .resolver
            .resolve(&credentials)
            .await
            .expect("Sentinel should resolve");
        assert_eq!(resolved.id, ADMIN_USER_ID);
        assert!(resolved.is_admin);

        // The dead row was cleared along the way
        assert!(fixture
            .session_repo
            .get_by_id(&expired.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sentinel_token_resolves_builtin_admin() {
        let fixture = setup().await;
        let resolved = fixture
            .resolver
            .resolve(&Credentials::bearer(ADMIN_USER_ID))
            .await
            .expect("Sentinel should resolve");
        assert_eq!(resolved.username, "admin");
        assert!(resolved.is_admin);
    }

    #[tokio::test]
    async fn test_user_id_token_resolves_stored_user() {
        let fixture = setup().await;
        let user = stored_user(&fixture, "carol").await;

        let resolved = fixture
            .resolver
            .resolve(&Credentials::bearer(&user.id))
            .await
            .expect("User token should resolve");
        assert_eq!(resolved.id, user.id);
        assert!(!resolved.is_admin, "Stored flag is preserved");
    }

    #[tokio::test]
    async fn test_cookie_only_credentials_skip_token_strategies() {
        let fixture = setup().await;
        let user = stored_user(&fixture, "dave").await;

        // A cookie carrying a plain user id is not a session, and the
        // token strategies never see cookie values.
        let resolved = fixture
            .resolver
            .resolve(&Credentials::session(&user.id))
            .await;
        assert!(resolved.is_none());
    }
}
