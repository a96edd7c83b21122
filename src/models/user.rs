//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id of the built-in administrator. The same value is accepted as an opaque
/// credential token for the local admin login path.
pub const ADMIN_USER_ID: &str = "admin-user-id";

/// User entity.
///
/// Besides rows in the `users` table there is one built-in administrator that
/// never touches the store; see [`User::builtin_admin`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: String,
    /// Username (unique, stored case-folded)
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Whether the user may use the admin surface
    pub is_admin: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given parameters.
    ///
    /// Note: the password must already be hashed. Use
    /// `services::password::hash_password()`.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, is_admin: bool) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.into().to_lowercase(),
            password_hash: password_hash.into(),
            is_admin,
            created_at: now,
            updated_at: now,
        }
    }

    /// The built-in administrator account.
    ///
    /// Its password hash lives in the auth service, not on this struct.
    pub fn builtin_admin() -> Self {
        let now = Utc::now();
        Self {
            id: ADMIN_USER_ID.to_string(),
            username: "admin".to_string(),
            password_hash: String::new(),
            is_admin: true,
            created_at: now,
            updated_at: now,
        }
    }
}
