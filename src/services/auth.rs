//! Authentication service
//!
//! Login, logout, refresh, and user provisioning. Two login paths exist:
//!
//! - Hosted path (identifier contains `@`): the account is looked up by
//!   username, the password checked against its Argon2id hash, and a hosted
//!   session row is minted. The session id is the bearer token.
//! - Custom path: `admin` is checked against the configured admin password
//!   hash and yields the sentinel token; any other identifier is looked up
//!   by username and on match yields the user's id as token.
//!
//! The admin password is hashed once at service construction. No plaintext
//! secret is ever stored or compared.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{Session, User, ADMIN_USER_ID};
use crate::services::password::{hash_password, verify_password};

/// Error types for authentication operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// User already exists
    #[error("User already exists: {0}")]
    UserExists(String),

    /// Session could not be renewed
    #[error("Session refresh failed")]
    RefreshFailed,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The authenticated user
    pub user: User,
    /// Opaque bearer token for subsequent requests
    pub token: String,
    /// Whether the token is a hosted session id
    pub hosted: bool,
}

/// Authentication service
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    admin_password_hash: String,
    session_ttl_days: i64,
}

impl AuthService {
    /// Create the service, hashing the configured admin password.
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        config: &AuthConfig,
    ) -> Result<Self> {
        let admin_password_hash =
            hash_password(&config.admin_password).context("Failed to hash admin password")?;

        Ok(Self {
            user_repo,
            session_repo,
            admin_password_hash,
            session_ttl_days: config.session_ttl_days,
        })
    }

    /// Authenticate with an identifier and password.
    ///
    /// Identifiers containing `@` try the hosted path first and fall back to
    /// the custom path when no hosted account matches.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthServiceError> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthServiceError::ValidationError(
                "Identifier and password are required".to_string(),
            ));
        }

        if identifier.contains('@') {
            if let Some(outcome) = self.try_hosted_login(identifier, password).await? {
                return Ok(outcome);
            }
        }

        self.custom_login(identifier, password).await
    }

    async fn try_hosted_login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Option<LoginOutcome>, AuthServiceError> {
        let Some(user) = self
            .user_repo
            .get_by_username(identifier)
            .await
            .context("Failed to look up hosted account")?
        else {
            return Ok(None);
        };

        if !verify_password(password, &user.password_hash)
            .context("Failed to verify hosted password")?
        {
            return Ok(None);
        }

        let session = self.create_session(&user.id).await?;
        tracing::info!(user_id = %user.id, "Hosted login");

        Ok(Some(LoginOutcome {
            user,
            token: session.id,
            hosted: true,
        }))
    }

    async fn custom_login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<LoginOutcome, AuthServiceError> {
        if identifier.eq_ignore_ascii_case("admin") {
            if verify_password(password, &self.admin_password_hash)
                .context("Failed to verify admin password")?
            {
                tracing::info!("Built-in admin login");
                return Ok(LoginOutcome {
                    user: User::builtin_admin(),
                    token: ADMIN_USER_ID.to_string(),
                    hosted: false,
                });
            }
            return Err(AuthServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            ));
        }

        let user = self
            .user_repo
            .get_by_username(identifier)
            .await
            .context("Failed to look up user")?;

        match user {
            Some(user)
                if verify_password(password, &user.password_hash)
                    .context("Failed to verify password")? =>
            {
                tracing::info!(user_id = %user.id, "Custom login");
                Ok(LoginOutcome {
                    token: user.id.clone(),
                    user,
                    hosted: false,
                })
            }
            _ => Err(AuthServiceError::AuthenticationError(
                "Invalid username or password".to_string(),
            )),
        }
    }

    /// Renew a credential.
    ///
    /// An unexpired hosted session is extended by the configured TTL. The
    /// admin sentinel renews as a no-op: a valid local admin credential is
    /// never downgraded because there is nothing hosted to refresh. Anything
    /// else fails and leaves existing state untouched.
    pub async fn refresh(&self, token: &str) -> Result<User, AuthServiceError> {
        if token == ADMIN_USER_ID {
            return Ok(User::builtin_admin());
        }

        if let Some(session) = self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to look up session")?
        {
            if !session.is_expired() {
                let new_expiry = Utc::now() + Duration::days(self.session_ttl_days);
                self.session_repo
                    .touch(&session.id, new_expiry)
                    .await
                    .context("Failed to extend session")?;

                if let Some(user) = self
                    .user_repo
                    .get_by_id(&session.user_id)
                    .await
                    .context("Failed to load session user")?
                {
                    return Ok(User {
                        is_admin: true,
                        ..user
                    });
                }
            }
        }

        Err(AuthServiceError::RefreshFailed)
    }

    /// Drop the hosted session behind a token, if there is one.
    ///
    /// Logout with a local token is a no-op success: the client simply
    /// discards it.
    pub async fn logout(&self, token: &str) -> Result<(), AuthServiceError> {
        self.session_repo
            .delete(token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Provision a user account with a hashed password.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<User, AuthServiceError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AuthServiceError::ValidationError(
                "Username is required".to_string(),
            ));
        }
        if password.len() < 6 {
            return Err(AuthServiceError::ValidationError(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        if username.eq_ignore_ascii_case("admin") {
            return Err(AuthServiceError::UserExists(
                "Username 'admin' is reserved".to_string(),
            ));
        }

        if self
            .user_repo
            .exists_by_username(username)
            .await
            .context("Failed to check username")?
        {
            return Err(AuthServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let password_hash = hash_password(password).context("Failed to hash password")?;
        let user = User::new(username, password_hash, is_admin);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = %created.id, username = %created.username, "User created");
        Ok(created)
    }

    /// Delete expired session rows, returning how many were removed.
    pub async fn cleanup_expired_sessions(&self) -> Result<i64, AuthServiceError> {
        let removed = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to clean up sessions")?;
        if removed > 0 {
            tracing::debug!(removed, "Expired sessions removed");
        }
        Ok(removed)
    }

    async fn create_session(&self, user_id: &str) -> Result<Session, AuthServiceError> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            expires_at: now + Duration::days(self.session_ttl_days),
            created_at: now,
        };

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}
