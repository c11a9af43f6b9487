/// Credential extraction from request headers
///
/// A request can carry its access token in two places:
///
/// 1. `Authorization: Bearer <token>`, used by API clients
/// 2. A named cookie (`access_token` by default), used by browsers
///
/// The header wins whenever it holds a usable bearer token. An `Authorization`
/// header with another scheme (e.g. `Basic`) is not ours to interpret, so the
/// cookie is consulted instead. Finding no credential at all is not an error:
/// the request simply stays anonymous.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

/// Where a credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// `Authorization: Bearer` header
    Header,

    /// Access cookie
    Cookie,
}

/// Raw, not yet validated, token pulled off a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCredential {
    pub token: String,
    pub source: CredentialSource,
}

/// Reads the bearer token from the `Authorization` header
///
/// The scheme is matched case-insensitively. Returns `None` for other schemes,
/// an empty token, or a value with more than one token after the scheme.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();

    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    Some(token)
}

/// Reads a cookie value by name from every `Cookie` header on the request
///
/// Values wrapped in double quotes are unquoted. Empty values count as absent.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
        .map(|value| {
            value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value)
        })
        .find(|value| !value.is_empty())
}

/// Determines the request's credential, if any
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use taskboard_shared::auth::credentials::{extract_credential, CredentialSource};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::COOKIE, HeaderValue::from_static("access_token=from-cookie"));
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
///
/// let credential = extract_credential(&headers, "access_token").unwrap();
/// assert_eq!(credential.token, "from-header");
/// assert_eq!(credential.source, CredentialSource::Header);
/// ```
pub fn extract_credential(headers: &HeaderMap, cookie_name: &str) -> Option<RawCredential> {
    if let Some(token) = bearer_token(headers) {
        return Some(RawCredential {
            token: token.to_string(),
            source: CredentialSource::Header,
        });
    }

    read_cookie(headers, cookie_name).map(|token| RawCredential {
        token: token.to_string(),
        source: CredentialSource::Cookie,
    })
}
