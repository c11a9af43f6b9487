/// Configuration management for the API server
///
/// Everything comes from environment variables (a `.env` file is loaded first
/// when present). Configuration is read once at startup and never changes.
///
/// # Environment Variables
///
/// | Variable | Default | |
/// |---|---|---|
/// | `API_HOST` | `0.0.0.0` | bind host |
/// | `API_PORT` | `8000` | bind port |
/// | `API_PRODUCTION` | `false` | enables HSTS |
/// | `CORS_ORIGINS` | `*` | comma-separated allowed origins |
/// | `STORAGE_BACKEND` | `postgres` | `postgres` or `memory` |
/// | `DATABASE_URL` | | required for `postgres` |
/// | `DATABASE_MAX_CONNECTIONS` | `10` | |
/// | `JWT_SECRET` | | required, at least 32 characters |
/// | `JWT_ACCESS_TTL_MINUTES` | `15` | |
/// | `JWT_REFRESH_TTL_DAYS` | `7` | |
/// | `AUTH_COOKIE` | `access_token` | cookie carrying the access token |
/// | `AUTH_COOKIE_SECURE` | `false` | `Secure` attribute on auth cookies |
/// | `AUTH_COOKIE_SAMESITE` | `Lax` | `Strict`, `Lax` or `None` |
/// | `AUTH_CSRF_AUTHENTICATION` | `false` | CSRF check on unsafe methods |
/// | `CSRF_COOKIE_NAME` | `csrftoken` | |
/// | `CSRF_HEADER_NAME` | `X-CSRFToken` | |
/// | `CSRF_TRUSTED_ORIGINS` | empty | comma-separated |
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use chrono::Duration;
use taskboard_shared::auth::authenticator::DEFAULT_ACCESS_COOKIE;
use taskboard_shared::auth::csrf::{
    CsrfPolicy, DEFAULT_COOKIE_NAME, DEFAULT_FORM_FIELD, DEFAULT_HEADER_NAME,
};
use taskboard_shared::auth::jwt::TokenLifetimes;

/// Shortest accepted `JWT_SECRET`, in bytes
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Upper bound for `JWT_ACCESS_TTL_MINUTES` (one day)
pub const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;

/// Upper bound for `JWT_REFRESH_TTL_DAYS`
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Production mode adds HSTS
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Where users and tasks are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,

    /// Process memory, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("unknown STORAGE_BACKEND '{}'", other),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,

    /// PostgreSQL connection URL; empty for the memory backend
    pub url: String,

    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret. Generate with `openssl rand -hex 32`.
    pub secret: String,

    /// Bounded by `MAX_ACCESS_TTL_MINUTES` and `MAX_REFRESH_TTL_DAYS`
    pub lifetimes: TokenLifetimes,
}

/// `SameSite` cookie attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl FromStr for SameSite {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => anyhow::bail!("unknown SameSite value '{}'", other),
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// Cookie and CSRF settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Cookie carrying the access token
    pub cookie_name: String,

    pub cookie_secure: bool,

    pub cookie_samesite: SameSite,

    /// `AUTH_CSRF_AUTHENTICATION`
    pub csrf_enabled: bool,

    pub csrf_cookie_name: String,

    pub csrf_header_name: String,

    pub csrf_trusted_origins: Vec<String>,
}

impl AuthConfig {
    pub fn csrf_policy(&self) -> CsrfPolicy {
        CsrfPolicy {
            enabled: self.csrf_enabled,
            cookie_name: self.csrf_cookie_name.clone(),
            header_name: self.csrf_header_name.clone(),
            form_field: DEFAULT_FORM_FIELD.to_string(),
            trusted_origins: self.csrf_trusted_origins.clone(),
        }
    }
}

fn parse_bool(name: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("{} must be a boolean, got '{}'", name, other),
    }
}

/// Parses a token lifetime in `1..=max` units
fn parse_ttl(
    name: &str,
    value: &str,
    max: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> anyhow::Result<Duration> {
    let amount = value
        .trim()
        .parse::<i64>()
        .with_context(|| format!("{} must be an integer", name))?;

    if !(1..=max).contains(&amount) {
        anyhow::bail!("{} must be between 1 and {}, got {}", name, max, amount);
    }

    to_duration(amount).ok_or_else(|| anyhow::anyhow!("{} is out of range", name))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value can't be
    /// parsed.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let port = var("API_PORT", "8000")
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let backend: StorageBackend = var("STORAGE_BACKEND", "postgres").parse()?;

        let database_url = match (backend, lookup("DATABASE_URL")) {
            (_, Some(url)) => url,
            (StorageBackend::Memory, None) => String::new(),
            (StorageBackend::Postgres, None) => {
                anyhow::bail!("DATABASE_URL environment variable is required")
            }
        };

        let max_connections = var("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let lifetimes = TokenLifetimes {
            access: parse_ttl(
                "JWT_ACCESS_TTL_MINUTES",
                &var("JWT_ACCESS_TTL_MINUTES", "15"),
                MAX_ACCESS_TTL_MINUTES,
                Duration::try_minutes,
            )?,
            refresh: parse_ttl(
                "JWT_REFRESH_TTL_DAYS",
                &var("JWT_REFRESH_TTL_DAYS", "7"),
                MAX_REFRESH_TTL_DAYS,
                Duration::try_days,
            )?,
        };

        let cookie_samesite: SameSite = var("AUTH_COOKIE_SAMESITE", "Lax").parse()?;
        let cookie_secure = parse_bool("AUTH_COOKIE_SECURE", &var("AUTH_COOKIE_SECURE", "false"))?;

        if cookie_samesite == SameSite::None && !cookie_secure {
            anyhow::bail!("AUTH_COOKIE_SAMESITE=None requires AUTH_COOKIE_SECURE=true");
        }

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port,
                production: parse_bool("API_PRODUCTION", &var("API_PRODUCTION", "false"))?,
                cors_origins: parse_list(&var("CORS_ORIGINS", "*")),
            },
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                lifetimes,
            },
            auth: AuthConfig {
                cookie_name: var("AUTH_COOKIE", DEFAULT_ACCESS_COOKIE),
                cookie_secure,
                cookie_samesite,
                csrf_enabled: parse_bool(
                    "AUTH_CSRF_AUTHENTICATION",
                    &var("AUTH_CSRF_AUTHENTICATION", "false"),
                )?,
                csrf_cookie_name: var("CSRF_COOKIE_NAME", DEFAULT_COOKIE_NAME),
                csrf_header_name: var("CSRF_HEADER_NAME", DEFAULT_HEADER_NAME),
                csrf_trusted_origins: parse_list(&var("CSRF_TRUSTED_ORIGINS", "")),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
