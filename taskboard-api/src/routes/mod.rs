/// API route handlers
///
/// - `home`: service banner
/// - `health`: health check
/// - `auth`: registration, login, token refresh, logout, CSRF token, current user
/// - `tasks`: owner-scoped task CRUD

pub mod auth;
pub mod health;
pub mod home;
pub mod tasks;
