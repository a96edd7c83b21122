//! Business logic services
//!
//! Services sit between the API layer and the repositories:
//! - `AuthService`: login, logout, refresh, user provisioning
//! - `SessionResolver`: turns presented credentials into a user
//! - `PostService`: post CRUD with validation and slug derivation
//! - `password`: Argon2id hashing helpers

pub mod auth;
pub mod password;
pub mod post;
pub mod resolver;

pub use auth::{AuthService, AuthServiceError, LoginOutcome};
pub use post::{generate_slug, PostService, PostServiceError};
pub use resolver::{Credentials, SessionResolver};
