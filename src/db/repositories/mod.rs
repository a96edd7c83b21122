//! Repository layer
//!
//! Data access for posts, users, and sessions. Each repository is a trait
//! with a SQLx-backed implementation that dispatches on the configured
//! database driver.

mod post;
mod session;
mod user;

pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
