/// Middleware for the API server
///
/// Authentication lives in `taskboard_shared::auth::middleware`; this module
/// only holds HTTP-level concerns.

pub mod security;
