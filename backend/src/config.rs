// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use url::Url;

/// Default lifetime of a signed access token, in seconds.
pub const DEFAULT_JWT_EXPIRATION: u64 = 3600;

/// Profile assigned to every newly registered user.
pub const DEFAULT_PROFILE: &str = "user";

/// Profile that unlocks the admin-only endpoints.
pub const ADMIN_PROFILE: &str = "admin";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,

    /// Public base URL of this service, used to build verification links.
    pub app_url: Url,

    /// Where `/verify/{token}` sends the browser after a successful verification.
    pub verify_redirect_url: Url,

    pub admin_nick: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, reason) => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match env::var("JWT_EXPIRATION") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid("JWT_EXPIRATION", e.to_string()))?,
            Err(_) => DEFAULT_JWT_EXPIRATION,
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid("BIND_ADDR", e.to_string()))?;

        let app_url = parse_url("APP_URL", "http://localhost:3000")?;
        let verify_redirect_url = parse_url("VERIFY_REDIRECT_URL", "http://localhost:8080/login")?;

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            app_url,
            verify_redirect_url,
            admin_nick: env::var("ADMIN_NICK").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }

    /// Builds the link a user follows to prove ownership of their email address.
    pub fn verification_link(&self, token: &str) -> String {
        let base = self.app_url.as_str().trim_end_matches('/');
        format!("{}/verify/{}", base, token)
    }
}

fn parse_url(key: &'static str, default: &str) -> Result<Url, ConfigError> {
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::Invalid(key, e.to_string()))
}
