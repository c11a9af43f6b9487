/// Authentication middleware and extractor for Axum
///
/// [`identity_middleware`] runs the [`Authenticator`] on each request that
/// reaches a protected route:
///
/// - valid credential: inserts an [`AuthContext`] into the request extensions
/// - no credential: passes the request through untouched
/// - bad credential or failed CSRF check: answers immediately with 401 / 403
///
/// A checked request with a urlencoded body and no CSRF header has its body
/// buffered (up to [`MAX_FORM_BODY`] bytes) so the CSRF form field can be read.
/// The handler still receives the full body.
///
/// Handlers take [`AuthContext`] as an argument. Its extractor turns a missing
/// context into a 401, so an anonymous request can never reach handler code
/// that needs an identity.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Router};
/// use taskboard_shared::auth::authenticator::Authenticator;
/// use taskboard_shared::auth::csrf::CsrfPolicy;
/// use taskboard_shared::auth::middleware::{identity_middleware, AuthContext, AuthState};
/// use taskboard_shared::store::MemoryStore;
///
/// async fn me(auth: AuthContext) -> String {
///     auth.user.email
/// }
///
/// let state = AuthState {
///     authenticator: Arc::new(Authenticator::new("secret", "access_token", CsrfPolicy::default())),
///     users: Arc::new(MemoryStore::new()),
/// };
///
/// let app: Router = Router::new()
///     .route("/me", get(me))
///     .layer(middleware::from_fn_with_state(state, identity_middleware));
/// ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde_json::json;

use super::authenticator::Authenticator;
use super::credentials::CredentialSource;
use super::csrf::CsrfError;
use super::jwt::Claims;
use crate::models::user::User;
use crate::store::UserStore;

/// Largest urlencoded body buffered while looking for the CSRF form field
pub const MAX_FORM_BODY: usize = 1024 * 1024;

/// Identity of an authenticated request
///
/// Lives for exactly one request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,

    /// Claims of the validated access token
    pub claims: Claims,

    /// Where the token came from
    pub source: CredentialSource,
}

impl AuthContext {
    pub fn user_id(&self) -> uuid::Uuid {
        self.user.id
    }
}

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Signature, expiry, issuer or token type check failed
    #[error("{0}")]
    InvalidToken(String),

    #[error("CSRF Failed: {0}")]
    CsrfFailed(CsrfError),

    /// Token is valid but names no existing user
    #[error("User not found")]
    PrincipalNotFound,

    #[error("User is inactive")]
    InactivePrincipal,

    /// Handler needs an identity and none was presented
    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    /// User lookup failed
    #[error("Storage error: {0}")]
    Store(String),

    /// Form body could not be buffered for the CSRF check
    #[error("Request body could not be read")]
    UnreadableBody,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::CsrfFailed(_) => StatusCode::FORBIDDEN,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::UnreadableBody => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            AuthError::CsrfFailed(_) => ("forbidden", self.to_string()),
            AuthError::UnreadableBody => ("bad_request", self.to_string()),
            AuthError::Store(e) => {
                tracing::error!(error = %e, "User lookup failed during authentication");
                ("internal_error", "An internal error occurred".to_string())
            }
            _ => ("unauthorized", self.to_string()),
        };

        let mut response = (status, Json(json!({ "error": code, "message": message }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"api\""),
            );
        }
        response
    }
}

/// State handed to [`identity_middleware`]
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<Authenticator>,
    pub users: Arc<dyn UserStore>,
}

/// Resolves the request's identity, see the module docs
pub async fn identity_middleware(
    State(state): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let policy = state.authenticator.csrf_policy();
    let (mut req, form_token) = if policy.wants_form_token(req.method(), req.headers()) {
        read_form_token(req, &policy.form_field).await?
    } else {
        (req, None)
    };

    let context = state
        .authenticator
        .authenticate_with_form_token(
            req.method(),
            req.headers(),
            form_token.as_deref(),
            state.users.as_ref(),
        )
        .await?;

    if let Some(context) = context {
        req.extensions_mut().insert(context);
    }

    Ok(next.run(req).await)
}

/// Buffers a urlencoded body and reads `field` from it
///
/// Returns the request rebuilt around the same bytes.
async fn read_form_token(req: Request, field: &str) -> Result<(Request, Option<String>), AuthError> {
    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_FORM_BODY).await.map_err(|e| {
        tracing::warn!(error = %e, "Could not buffer form body");
        AuthError::UnreadableBody
    })?;

    let mut form_req = Request::new(Body::from(bytes.clone()));
    *form_req.method_mut() = parts.method.clone();
    if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
        form_req
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type.clone());
    }

    let token = Form::<HashMap<String, String>>::from_request(form_req, &())
        .await
        .ok()
        .and_then(|Form(mut fields)| fields.remove(field));

    Ok((Request::from_parts(parts, Body::from(bytes)), token))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::csrf::CsrfPolicy;
    use crate::auth::jwt::{create_token, TokenType};
    use crate::models::user::CreateUser;
    use crate::store::MemoryStore;
    use axum::{body::Body, middleware, routing::{get, post}, Router};
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret-at-least-32-bytes";

    async fn me(auth: AuthContext) -> String {
        auth.user.email
    }

    async fn echo(_auth: AuthContext, body: String) -> String {
        body
    }

    async fn app(csrf: CsrfPolicy) -> (Router, String) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(CreateUser {
                email: "a@x.com".to_string(),
                username: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let token = create_token(&Claims::new(user.id, TokenType::Access), SECRET).unwrap();

        let state = AuthState {
            authenticator: Arc::new(Authenticator::new(SECRET, "access_token", csrf)),
            users: store,
        };

        let router = Router::new()
            .route("/me", get(me))
            .route("/write", post(me))
            .route("/form", post(echo))
            .layer(middleware::from_fn_with_state(state, identity_middleware));
        (router, token)
    }

    fn request(method: &str, uri: &str, token: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_authenticated_request_reaches_handler() {
        let (app, token) = app(CsrfPolicy::default()).await;
        let response = app.oneshot(request("GET", "/me", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_anonymous_request_rejected_by_extractor() {
        let (app, _) = app(CsrfPolicy::default()).await;
        let response = app.oneshot(request("GET", "/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_bad_token_rejected_by_middleware() {
        let (app, _) = app(CsrfPolicy::default()).await;
        let response = app.oneshot(request("GET", "/me", Some("nope"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_csrf_failure_is_forbidden() {
        let (app, token) = app(CsrfPolicy::enforcing()).await;
        let response = app.oneshot(request("POST", "/write", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    fn form_post(token: &str, body: &'static str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/form")
            .header(header::COOKIE, format!("access_token={}; csrftoken=abc", token))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_csrf_form_field_accepted_and_body_preserved() {
        let (app, token) = app(CsrfPolicy::enforcing()).await;
        let body = "title=Buy+milk&csrfmiddlewaretoken=abc";

        let response = app.oneshot(form_post(&token, body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let echoed = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&echoed[..], body.as_bytes());
    }

    #[tokio::test]
    async fn test_csrf_form_field_mismatch_is_forbidden() {
        let (app, token) = app(CsrfPolicy::enforcing()).await;

        let response = app
            .clone()
            .oneshot(form_post(&token, "csrfmiddlewaretoken=abd"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.oneshot(form_post(&token, "title=x")).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_auth_error_status() {
        assert_eq!(AuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::PrincipalNotFound.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::CsrfFailed(CsrfError::TokenMismatch).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::Store("down".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AuthError::UnreadableBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthError::CsrfFailed(CsrfError::CookieMissing).to_string(),
            "CSRF Failed: CSRF cookie not set"
        );
    }
}
