//! ShieldBlog - A marketing blog engine with an authenticated admin surface
//!
//! This library provides the core functionality for the ShieldBlog server.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
