//! Database layer
//!
//! Storage abstraction for ShieldBlog. Two backends are supported:
//! - SQLite (default, single-binary deployment)
//! - MySQL (larger deployments)
//!
//! The driver is selected from configuration. Repositories dispatch on
//! `DatabasePool::driver()` so the rest of the application never cares which
//! backend is in use.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
