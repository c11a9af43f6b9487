/// Database models for the task board
///
/// # Models
///
/// - `user`: User accounts and login bookkeeping
/// - `task`: Owner-scoped to-do items
///
/// Models carry their own PostgreSQL queries as static methods taking a
/// `&PgPool`. Code outside `store` goes through the storage traits instead of
/// calling these directly.

pub mod task;
pub mod user;
