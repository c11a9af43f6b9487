/// Double-submit CSRF protection
///
/// When enabled, every state-changing request (anything but GET, HEAD and
/// OPTIONS) that carries a valid token must also present the CSRF cookie and
/// echo the same value in the CSRF header. A cross-site form can make the
/// browser send the cookie but cannot read it to fill in the header.
///
/// HTML forms cannot set headers, so a urlencoded body may carry the token in
/// the `csrfmiddlewaretoken` field instead. The header wins when both are sent.
///
/// The policy is plain configuration, built once at startup and handed to the
/// [`Authenticator`](super::authenticator::Authenticator).

use axum::http::{header, HeaderMap, Method};
use rand::RngCore;

use super::credentials::read_cookie;

/// Default CSRF cookie name
pub const DEFAULT_COOKIE_NAME: &str = "csrftoken";

/// Default CSRF header name
pub const DEFAULT_HEADER_NAME: &str = "X-CSRFToken";

/// Default form field carrying the token in urlencoded bodies
pub const DEFAULT_FORM_FIELD: &str = "csrfmiddlewaretoken";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Random bytes in a generated CSRF token (hex encoded to twice the length)
const TOKEN_BYTES: usize = 32;

/// Why a request failed the CSRF check
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("CSRF cookie not set")]
    CookieMissing,

    #[error("CSRF token missing")]
    TokenMissing,

    #[error("CSRF token incorrect")]
    TokenMismatch,

    #[error("Origin checking failed - {0} does not match any trusted origins")]
    UntrustedOrigin(String),
}

/// CSRF enforcement settings
#[derive(Debug, Clone)]
pub struct CsrfPolicy {
    /// Global switch; when off no request is ever CSRF-checked
    pub enabled: bool,

    pub cookie_name: String,

    pub header_name: String,

    pub form_field: String,

    /// Allowed `Origin` values for unsafe requests. Empty means any origin.
    pub trusted_origins: Vec<String>,
}

impl Default for CsrfPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            header_name: DEFAULT_HEADER_NAME.to_string(),
            form_field: DEFAULT_FORM_FIELD.to_string(),
            trusted_origins: Vec::new(),
        }
    }
}

/// GET, HEAD and OPTIONS never change state and are never checked
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

impl CsrfPolicy {
    /// Enabled policy with default names
    pub fn enforcing() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Whether a request with this method must pass [`CsrfPolicy::verify`]
    pub fn applies_to(&self, method: &Method) -> bool {
        self.enabled && !is_safe_method(method)
    }

    /// Whether the token has to come from a form body
    ///
    /// True for checked requests with a urlencoded body and no CSRF header.
    pub fn wants_form_token(&self, method: &Method, headers: &HeaderMap) -> bool {
        self.applies_to(method)
            && !headers.contains_key(self.header_name.as_str())
            && headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.trim_start().starts_with(FORM_CONTENT_TYPE))
    }

    /// Runs the double-submit check against the request headers
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), CsrfError> {
        self.verify_with_form(headers, None)
    }

    /// Runs the double-submit check, falling back to `form_token` when the
    /// CSRF header is absent
    ///
    /// Order: origin (only if both an `Origin` header and a trusted list exist),
    /// then cookie presence, then token presence, then value equality.
    pub fn verify_with_form(
        &self,
        headers: &HeaderMap,
        form_token: Option<&str>,
    ) -> Result<(), CsrfError> {
        if !self.trusted_origins.is_empty() {
            if let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) {
                let origin = origin.trim_end_matches('/');
                if !self
                    .trusted_origins
                    .iter()
                    .any(|trusted| trusted.trim_end_matches('/') == origin)
                {
                    return Err(CsrfError::UntrustedOrigin(origin.to_string()));
                }
            }
        }

        let cookie = read_cookie(headers, &self.cookie_name).ok_or(CsrfError::CookieMissing)?;

        let submitted = headers
            .get(self.header_name.as_str())
            .and_then(|v| v.to_str().ok())
            .or(form_token)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(CsrfError::TokenMissing)?;

        if !constant_time_compare(cookie, submitted) {
            return Err(CsrfError::TokenMismatch);
        }

        Ok(())
    }
}

/// Generates a fresh random CSRF token (64 hex characters)
pub fn generate_csrf_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time string comparison
///
/// Always walks the full length of equally sized inputs so the comparison time
/// doesn't reveal where two values first differ. Length itself is not secret.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
