/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth/JWKS 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::services::auth::{key_set::is_asymmetric, permissions::MissingPermissions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,
    pub request_timeout_seconds: u64,

    pub auth_domain: String,
    pub auth_issuer: String,
    pub auth_audience: String,
    pub auth_algorithm: Algorithm,
    pub access_token_leeway_seconds: u64,
    pub missing_permissions: MissingPermissions,

    pub jwks_url: Url,
    pub jwks_path: Option<PathBuf>,
    pub jwks_cache_ttl_seconds: u64,
    pub jwks_min_refresh_seconds: u64,
    pub jwks_fetch_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parse_or(lookup("PORT"), "PORT", 3000)?;

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections: u32 = parse_positive_or(
            lookup("DATABASE_MAX_CONNECTIONS"),
            "DATABASE_MAX_CONNECTIONS",
            5,
        )?;

        let app_env = lookup("APP_ENV")
            .map(|v| AppEnv::parse(&v))
            .unwrap_or(AppEnv::Development);

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let request_timeout_seconds: u64 =
            parse_positive_or(lookup("REQUEST_TIMEOUT_SECONDS"), "REQUEST_TIMEOUT_SECONDS", 30)?;

        let auth_domain = lookup("AUTH_DOMAIN")
            .map(|d| d.trim().trim_end_matches('/').to_string())
            .filter(|d| !d.is_empty())
            .ok_or(ConfigError::Missing("AUTH_DOMAIN"))?;

        let auth_audience = lookup("AUTH_AUDIENCE")
            .filter(|a| !a.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTH_AUDIENCE"))?;

        let auth_issuer =
            lookup("AUTH_ISSUER").unwrap_or_else(|| format!("https://{}/", auth_domain));

        let auth_algorithm = match lookup("AUTH_ALGORITHM") {
            Some(raw) => Algorithm::from_str(raw.trim())
                .ok()
                .filter(|alg| is_asymmetric(*alg))
                .ok_or(ConfigError::Invalid("AUTH_ALGORITHM"))?,
            None => Algorithm::RS256,
        };

        let access_token_leeway_seconds: u64 = parse_or(
            lookup("ACCESS_TOKEN_LEEWAY_SECONDS"),
            "ACCESS_TOKEN_LEEWAY_SECONDS",
            0,
        )?;

        let missing_permissions = match lookup("AUTH_MISSING_PERMISSIONS") {
            Some(raw) => raw
                .parse::<MissingPermissions>()
                .map_err(|_| ConfigError::Invalid("AUTH_MISSING_PERMISSIONS"))?,
            None => MissingPermissions::default(),
        };

        let jwks_url = lookup("JWKS_URL")
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", auth_domain));
        let jwks_url = Url::parse(&jwks_url).map_err(|_| ConfigError::Invalid("JWKS_URL"))?;

        let jwks_path = lookup("JWKS_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let jwks_cache_ttl_seconds: u64 =
            parse_or(lookup("JWKS_CACHE_TTL_SECONDS"), "JWKS_CACHE_TTL_SECONDS", 600)?;

        let jwks_min_refresh_seconds: u64 =
            parse_or(lookup("JWKS_MIN_REFRESH_SECONDS"), "JWKS_MIN_REFRESH_SECONDS", 5)?;

        let jwks_fetch_timeout_seconds: u64 = parse_positive_or(
            lookup("JWKS_FETCH_TIMEOUT_SECONDS"),
            "JWKS_FETCH_TIMEOUT_SECONDS",
            5,
        )?;

        Ok(Self {
            addr,
            database_url,
            database_max_connections,
            app_env,
            cors_allowed_origins,
            request_timeout_seconds,
            auth_domain,
            auth_issuer,
            auth_audience,
            auth_algorithm,
            access_token_leeway_seconds,
            missing_permissions,
            jwks_url,
            jwks_path,
            jwks_cache_ttl_seconds,
            jwks_min_refresh_seconds,
            jwks_fetch_timeout_seconds,
        })
    }
}

/// Absent → `default`; present but unparseable → `Invalid(key)`.
fn parse_or<T: FromStr>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
    }
}

/// Like `parse_or`, but zero is also invalid.
fn parse_positive_or<T>(
    raw: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
{
    let value = parse_or(raw, key, default)?;
    if value == T::default() {
        return Err(ConfigError::Invalid(key));
    }
    Ok(value)
}
