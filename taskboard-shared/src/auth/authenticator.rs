/// Request authentication
///
/// Turns the headers of one request into an authenticated identity, or into
/// "anonymous", or into a rejection. The steps always run in this order:
///
/// ```text
/// no credential ───────────────────────────────────────────► Ok(None)
/// credential ─► validate JWT ─✗─► InvalidToken (401)
///                    │ ✓
///                    ▼
///      CSRF policy on and method unsafe? ─yes─► double-submit check ─✗─► CsrfFailed (403)
///                    │ no                              │ ✓
///                    ▼                                 ▼
///              look up `sub` ─✗─► PrincipalNotFound / InactivePrincipal (401)
///                    │ ✓
///                    ▼
///             Ok(Some(AuthContext))
/// ```
///
/// CSRF runs only once a token has validated, so a request with no credential
/// (or a bad one) never gets a CSRF error. The check applies the same way to
/// tokens from the header and from the cookie. The CSRF token itself comes from
/// the CSRF header, or from a form field the caller already read out of the body.

use axum::http::{HeaderMap, Method};
use tracing::{debug, warn};

use super::credentials::extract_credential;
use super::csrf::CsrfPolicy;
use super::jwt::{validate_access_token, JwtError};
use super::middleware::{AuthContext, AuthError};
use crate::store::UserStore;

/// Default name of the cookie carrying the access token
pub const DEFAULT_ACCESS_COOKIE: &str = "access_token";

/// Immutable authentication settings, built once at startup
#[derive(Debug, Clone)]
pub struct Authenticator {
    jwt_secret: String,
    access_cookie: String,
    csrf: CsrfPolicy,
}

impl Authenticator {
    pub fn new(jwt_secret: impl Into<String>, access_cookie: impl Into<String>, csrf: CsrfPolicy) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_cookie: access_cookie.into(),
            csrf,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    pub fn access_cookie(&self) -> &str {
        &self.access_cookie
    }

    pub fn csrf_policy(&self) -> &CsrfPolicy {
        &self.csrf
    }

    /// Authenticates one request
    ///
    /// `Ok(None)` means no credential was presented. Whether that is acceptable
    /// is up to the handler.
    pub async fn authenticate(
        &self,
        method: &Method,
        headers: &HeaderMap,
        users: &dyn UserStore,
    ) -> Result<Option<AuthContext>, AuthError> {
        self.authenticate_with_form_token(method, headers, None, users)
            .await
    }

    /// Same as [`Authenticator::authenticate`], with a CSRF token taken from a
    /// form body used when the CSRF header is absent
    pub async fn authenticate_with_form_token(
        &self,
        method: &Method,
        headers: &HeaderMap,
        form_token: Option<&str>,
        users: &dyn UserStore,
    ) -> Result<Option<AuthContext>, AuthError> {
        let Some(credential) = extract_credential(headers, &self.access_cookie) else {
            return Ok(None);
        };

        let claims = validate_access_token(&credential.token, &self.jwt_secret).map_err(|e| {
            warn!(source = ?credential.source, error = %e, "Rejected access token");
            match e {
                JwtError::Expired => AuthError::InvalidToken("Token has expired".to_string()),
                JwtError::WrongType { .. } => {
                    AuthError::InvalidToken("Token is not an access token".to_string())
                }
                _ => AuthError::InvalidToken("Token is invalid".to_string()),
            }
        })?;

        if self.csrf.applies_to(method) {
            self.csrf.verify_with_form(headers, form_token).map_err(|reason| {
                warn!(user_id = %claims.sub, %method, %reason, "CSRF check failed");
                AuthError::CsrfFailed(reason)
            })?;
        }

        let user = users
            .find_user_by_id(claims.sub)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "Token names an unknown user");
                AuthError::PrincipalNotFound
            })?;

        if !user.is_active {
            warn!(user_id = %user.id, "Token names an inactive user");
            return Err(AuthError::InactivePrincipal);
        }

        debug!(user_id = %user.id, source = ?credential.source, "Authenticated request");

        Ok(Some(AuthContext {
            user,
            claims,
            source: credential.source,
        }))
    }
}
