//! # Task Board Shared Library
//!
//! Types and logic used by the task board API server.
//!
//! ## Module Organization
//!
//! - `auth`: credential extraction, JWT, CSRF, password hashing, middleware
//! - `models`: users and tasks, with their PostgreSQL queries
//! - `store`: storage traits plus PostgreSQL and in-memory implementations
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
