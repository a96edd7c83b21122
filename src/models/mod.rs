//! Data models
//!
//! This module contains all data structures used throughout the ShieldBlog system.
//! Models represent:
//! - Database entities (BlogPost, User, Session)
//! - The closed Category set
//! - API request/response types

mod category;
mod post;
mod session;
mod user;

pub use category::{Category, CategoryInfo};
pub use post::{BlogPost, PostInput};
pub use session::Session;
pub use user::{User, ADMIN_USER_ID};
