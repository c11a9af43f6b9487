/// Authentication primitives
///
/// # Modules
///
/// - [`credentials`]: finds the access token in the `Authorization` header or cookie
/// - [`jwt`]: HS256 access/refresh token creation and validation
/// - [`csrf`]: double-submit CSRF policy
/// - [`authenticator`]: combines the above into one per-request decision
/// - [`middleware`]: Axum middleware and the `AuthContext` extractor
/// - [`password`]: Argon2id password hashing

pub mod authenticator;
pub mod credentials;
pub mod csrf;
pub mod jwt;
pub mod middleware;
pub mod password;
