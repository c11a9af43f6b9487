/// PostgreSQL plumbing: connection pool and embedded migrations
///
/// Queries themselves live on the models in [`crate::models`].

pub mod migrations;
pub mod pool;
