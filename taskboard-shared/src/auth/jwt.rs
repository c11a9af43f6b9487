/// JWT token generation and validation module
///
/// Tokens are signed with HS256 (HMAC-SHA256) and identify a single user through
/// the `sub` claim. Two token types exist:
///
/// - **Access Token**: short-lived (15 minutes by default), presented on every
///   request either as `Authorization: Bearer <token>` or through the access cookie
/// - **Refresh Token**: long-lived (7 days by default), only accepted by the
///   refresh endpoint to mint a new access token
///
/// # Security
///
/// - **Algorithm**: HS256 only, other algorithms are rejected
/// - **Validation**: signature, `exp`, `nbf`, issuer and token type
/// - **Secret Management**: secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, TokenType::Access);
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated_claims = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated_claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into and required from every token
pub const ISSUER: &str = "taskboard";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format or claim validation failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token is valid but of the wrong type for this use
    #[error("Expected {expected} token, got {actual} token")]
    WrongType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

impl TokenType {
    /// Gets default expiration duration for token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::minutes(15),
            TokenType::Refresh => Duration::days(7),
        }
    }

    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Configured lifetimes for issued tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: TokenType::Access.default_expiration(),
            refresh: TokenType::Refresh.default_expiration(),
        }
    }
}

impl TokenLifetimes {
    /// Lifetime for the given token type
    pub fn for_type(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access,
            TokenType::Refresh => self.refresh,
        }
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "taskboard")
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
/// - `nbf`: Not before timestamp
/// - `jti`: Unique token ID
///
/// # Custom Claims
///
/// - `token_type`: Access or refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "taskboard"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token ID
    pub jti: Uuid,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the default expiration for `token_type`
    ///
    /// # Example
    ///
    /// ```
    /// use taskboard_shared::auth::jwt::{Claims, TokenType};
    /// use uuid::Uuid;
    ///
    /// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
    /// assert!(!claims.is_expired());
    /// ```
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, token_type, token_type.default_expiration())
    }

    /// Creates claims with custom expiration
    ///
    /// A negative `expires_in` produces claims that are already expired, which
    /// tests use to exercise the expiry path.
    pub fn with_expiration(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

}

/// Access and refresh token issued together at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 (HMAC-SHA256) with the provided secret.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token creation fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues an access/refresh pair for a user
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::jwt::{issue_token_pair, validate_refresh_token, TokenLifetimes};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let pair = issue_token_pair(user_id, "secret", &TokenLifetimes::default())?;
///
/// let refresh = validate_refresh_token(&pair.refresh, "secret")?;
/// assert_eq!(refresh.sub, user_id);
/// # Ok(())
/// # }
/// ```
pub fn issue_token_pair(
    user_id: Uuid,
    secret: &str,
    lifetimes: &TokenLifetimes,
) -> Result<TokenPair, JwtError> {
    let access = Claims::with_expiration(user_id, TokenType::Access, lifetimes.access);
    let refresh = Claims::with_expiration(user_id, TokenType::Refresh, lifetimes.refresh);

    Ok(TokenPair {
        access: create_token(&access, secret)?,
        refresh: create_token(&refresh, secret)?,
    })
}

/// Validates a JWT token and extracts claims
///
/// Verifies:
/// - Signature is valid and the algorithm is HS256
/// - Token hasn't expired
/// - Issuer is "taskboard"
/// - Token is not used before nbf time
///
/// No clock leeway is granted: a token is rejected from its `exp` second on.
///
/// Token type is not checked here; see [`validate_access_token`] and
/// [`validate_refresh_token`].
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    // `exp` is a hard cutoff, matching `Claims::is_expired`.
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::minutes(15));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(7));
    }

    #[test]
    fn test_lifetimes_for_type() {
        let lifetimes = TokenLifetimes {
            access: Duration::minutes(5),
            refresh: Duration::days(1),
        };
        assert_eq!(lifetimes.for_type(TokenType::Access), Duration::minutes(5));
        assert_eq!(lifetimes.for_type(TokenType::Refresh), Duration::days(1));
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();

        let claims = Claims::new(user_id, TokenType::Access);

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "taskboard");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_claims_have_unique_ids() {
        let user_id = Uuid::new_v4();
        let a = Claims::new(user_id, TokenType::Access);
        let b = Claims::new(user_id, TokenType::Access);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_claims_with_custom_expiration() {
        let claims = Claims::with_expiration(Uuid::new_v4(), TokenType::Access, Duration::hours(1));

        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();

        let claims = Claims::new(user_id, TokenType::Access);
        let token = create_token(&claims, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated, claims);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
        let token = create_token(&claims, "secret1").expect("Should create token");

        let result = validate_token(&token, "wrong-secret");
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_validate_garbage() {
        assert!(validate_token("not-a-jwt", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let claims =
            Claims::with_expiration(Uuid::new_v4(), TokenType::Access, Duration::seconds(-3600));

        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).expect("Should create token");
        let result = validate_token(&token, SECRET);

        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_recently_expired_token_is_rejected() {
        for seconds_ago in [1, 5, 30] {
            let claims = Claims::with_expiration(
                Uuid::new_v4(),
                TokenType::Access,
                Duration::seconds(-seconds_ago),
            );
            let token = create_token(&claims, SECRET).unwrap();

            assert!(
                matches!(validate_access_token(&token, SECRET), Err(JwtError::Expired)),
                "token expired {}s ago was accepted",
                seconds_ago
            );
        }
    }

    #[test]
    fn test_validate_foreign_issuer() {
        let mut claims = Claims::new(Uuid::new_v4(), TokenType::Access);
        claims.iss = "someone-else".to_string();
        let token = create_token(&claims, SECRET).unwrap();

        let result = validate_token(&token, SECRET);
        assert!(matches!(result, Err(JwtError::InvalidIssuer { .. })));
    }

    #[test]
    fn test_validate_access_token() {
        let access = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();
        assert!(validate_access_token(&access, SECRET).is_ok());

        let refresh =
            create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();
        assert!(matches!(
            validate_access_token(&refresh, SECRET),
            Err(JwtError::WrongType {
                expected: "access",
                actual: "refresh"
            })
        ));
    }

    #[test]
    fn test_validate_refresh_token() {
        let refresh =
            create_token(&Claims::new(Uuid::new_v4(), TokenType::Refresh), SECRET).unwrap();
        assert!(validate_refresh_token(&refresh, SECRET).is_ok());

        let access = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();
        assert!(validate_refresh_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_issue_token_pair() {
        let user_id = Uuid::new_v4();
        let pair = issue_token_pair(user_id, SECRET, &TokenLifetimes::default()).unwrap();

        assert_eq!(validate_access_token(&pair.access, SECRET).unwrap().sub, user_id);
        assert_eq!(validate_refresh_token(&pair.refresh, SECRET).unwrap().sub, user_id);
    }

    #[test]
    fn test_refresh_token_mints_access_token() {
        let user_id = Uuid::new_v4();
        let refresh_token =
            create_token(&Claims::new(user_id, TokenType::Refresh), SECRET).unwrap();

        let claims = validate_refresh_token(&refresh_token, SECRET).unwrap();
        let access_token = create_token(
            &Claims::with_expiration(claims.sub, TokenType::Access, Duration::minutes(10)),
            SECRET,
        )
        .unwrap();

        let validated = validate_access_token(&access_token, SECRET).unwrap();
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.exp - validated.iat, 600);
    }

    #[test]
    fn test_access_token_is_not_a_refresh_token() {
        let access_token =
            create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();

        let result = validate_refresh_token(&access_token, SECRET);
        assert!(matches!(result, Err(JwtError::WrongType { .. })));
    }
}
