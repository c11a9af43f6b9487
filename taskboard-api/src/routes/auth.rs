/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register/` - Register new user
/// - `POST /api/auth/token/` - Login, returns an access/refresh pair and sets cookies
/// - `POST /api/auth/token/refresh/` - New access token from a refresh token
/// - `POST /api/auth/logout/` - Clears the auth cookies
/// - `GET  /api/auth/csrf/` - Issues a CSRF token and cookie
/// - `GET  /api/auth/me/` - The authenticated user

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_shared::auth::{
    csrf::generate_csrf_token,
    jwt::{self, Claims, TokenPair, TokenType},
    middleware::AuthContext,
    password,
};
use taskboard_shared::models::user::{CreateUser, User};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    cookies::{append_access_cookie, append_csrf_cookie, expire_cookie},
    error::{ApiError, ApiResult},
    extract::ApiJson,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(max = 150, message = "Username must be at most 150 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,

    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be between 6 and 128 characters"
    ))]
    pub password: String,
}

/// Public view of a user account
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
        }
    }
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Refresh token response
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfResponse {
    pub csrf_token: String,
}

/// `GET /api/auth/me/` response
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register/
/// Content-Type: application/json
///
/// { "email": "a@x.com", "password": "p12345", "username": "alice" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or the email is already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate()?;
    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::invalid("password", message))?;

    let username = req
        .username
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let password_hash = password::hash_password_blocking(req.password).await?;

    let user = state
        .users
        .create_user(CreateUser {
            email: req.email,
            username,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, "User registered");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Login with email and password
///
/// Returns `{access, refresh}` and sets the access token cookie (HttpOnly)
/// plus a fresh CSRF cookie, so browser clients can authenticate with either.
///
/// # Errors
///
/// - `400 Bad Request`: malformed body
/// - `401 Unauthorized`: unknown email, wrong password or inactive account
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<(HeaderMap, Json<TokenPair>)> {
    let user = state.users.find_user_by_email(&req.email).await?;

    // Unknown emails still pay for a hash verification.
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let valid = password::verify_password_blocking(req.password, stored_hash).await?;

    let user = match user {
        Some(user) if valid && user.is_active => user,
        _ => {
            warn!("Rejected login attempt");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    state.users.record_login(user.id).await?;

    let lifetimes = state.config.jwt.lifetimes;
    let pair = jwt::issue_token_pair(user.id, state.jwt_secret(), &lifetimes)?;

    let mut headers = HeaderMap::new();
    append_access_cookie(
        &mut headers,
        &pair.access,
        lifetimes.access.num_seconds(),
        &state.config.auth,
    )?;
    append_csrf_cookie(&mut headers, &generate_csrf_token(), &state.config.auth)?;

    info!(user_id = %user.id, "User logged in");

    Ok((headers, Json(pair)))
}

/// Exchange a refresh token for a new access token
///
/// The user must still exist and be active.
///
/// # Errors
///
/// - `401 Unauthorized`: invalid or expired refresh token, or unknown/inactive user
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> ApiResult<(HeaderMap, Json<RefreshResponse>)> {
    let claims = jwt::validate_refresh_token(&req.refresh, state.jwt_secret())?;

    match state.users.find_user_by_id(claims.sub).await? {
        Some(user) if user.is_active => {}
        _ => {
            warn!(user_id = %claims.sub, "Refresh token for unknown or inactive user");
            return Err(ApiError::Unauthorized("Token is invalid".to_string()));
        }
    }

    let lifetime = state.config.jwt.lifetimes.access;
    let access = jwt::create_token(
        &Claims::with_expiration(claims.sub, TokenType::Access, lifetime),
        state.jwt_secret(),
    )?;

    let mut headers = HeaderMap::new();
    append_access_cookie(&mut headers, &access, lifetime.num_seconds(), &state.config.auth)?;

    debug!(user_id = %claims.sub, "Access token refreshed");

    Ok((headers, Json(RefreshResponse { access })))
}

/// Clear the access and CSRF cookies
///
/// Tokens are stateless, so a bearer token stays valid until it expires.
pub async fn logout(State(state): State<AppState>) -> ApiResult<(StatusCode, HeaderMap)> {
    let auth = &state.config.auth;

    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, expire_cookie(&auth.cookie_name, auth)?);
    headers.append(header::SET_COOKIE, expire_cookie(&auth.csrf_cookie_name, auth)?);

    Ok((StatusCode::NO_CONTENT, headers))
}

/// Issue a CSRF token
///
/// The same value goes into the body and the CSRF cookie; clients echo it back
/// in the CSRF header on unsafe requests.
pub async fn csrf_token(State(state): State<AppState>) -> ApiResult<(HeaderMap, Json<CsrfResponse>)> {
    let token = generate_csrf_token();

    let mut headers = HeaderMap::new();
    append_csrf_cookie(&mut headers, &token, &state.config.auth)?;

    Ok((headers, Json(CsrfResponse { csrf_token: token })))
}

/// The authenticated user
pub async fn me(auth: AuthContext) -> Json<MeResponse> {
    let user = auth.user;
    Json(MeResponse {
        id: user.id,
        email: user.email,
        username: user.username,
        is_active: user.is_active,
        date_joined: user.date_joined,
    })
}
