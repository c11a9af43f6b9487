/// `Set-Cookie` values for the access token and CSRF cookies
///
/// The access cookie is `HttpOnly` so page scripts can't read the token. The
/// CSRF cookie is deliberately readable: the front end copies it into the CSRF
/// header on unsafe requests.

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::AuthConfig;
use crate::error::ApiError;

/// Attributes for one cookie
#[derive(Debug, Clone)]
pub struct CookieSpec<'a> {
    pub name: &'a str,
    pub value: &'a str,
    /// `None` makes a session cookie
    pub max_age_seconds: Option<i64>,
    pub http_only: bool,
}

/// Renders a `Set-Cookie` header value with the configured Secure/SameSite
pub fn set_cookie(spec: &CookieSpec<'_>, config: &AuthConfig) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!("{}={}; Path=/", spec.name, spec.value);

    if let Some(max_age) = spec.max_age_seconds {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if spec.http_only {
        cookie.push_str("; HttpOnly");
    }
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie.push_str(&format!("; SameSite={}", config.cookie_samesite));

    HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))
}

/// `Set-Cookie` that makes the browser drop a cookie
pub fn expire_cookie(name: &str, config: &AuthConfig) -> Result<HeaderValue, ApiError> {
    set_cookie(
        &CookieSpec {
            name,
            value: "",
            max_age_seconds: Some(0),
            http_only: false,
        },
        config,
    )
}

/// Appends the access token cookie
pub fn append_access_cookie(
    headers: &mut HeaderMap,
    token: &str,
    max_age_seconds: i64,
    config: &AuthConfig,
) -> Result<(), ApiError> {
    let value = set_cookie(
        &CookieSpec {
            name: &config.cookie_name,
            value: token,
            max_age_seconds: Some(max_age_seconds),
            http_only: true,
        },
        config,
    )?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

/// Appends the CSRF cookie (session lifetime, script-readable)
pub fn append_csrf_cookie(
    headers: &mut HeaderMap,
    token: &str,
    config: &AuthConfig,
) -> Result<(), ApiError> {
    let value = set_cookie(
        &CookieSpec {
            name: &config.csrf_cookie_name,
            value: token,
            max_age_seconds: None,
            http_only: false,
        },
        config,
    )?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}
