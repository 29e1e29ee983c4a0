/// Configuration management for Reel Service
///
/// Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration; `None` selects the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Redis configuration; `None` keeps one-time codes in process memory
    pub redis: Option<RedisConfig>,
    /// Token signing
    pub jwt: JwtConfig,
    /// One-time code lifetimes
    pub otp: OtpConfig,
    /// Outbound email
    pub email: EmailConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Min connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL (redis://host:port)
    pub url: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_expiry_secs")]
    pub expiry_secs: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiry_secs", &self.expiry_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Login code lifetime
    #[serde(default = "default_login_ttl_secs")]
    pub login_ttl_secs: i64,
    /// Password reset code lifetime
    #[serde(default = "default_reset_ttl_secs")]
    pub reset_ttl_secs: i64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            login_ttl_secs: default_login_ttl_secs(),
            reset_ttl_secs: default_reset_ttl_secs(),
        }
    }
}

/// SMTP settings. An empty host puts the mailer in log-only mode.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_from", &self.smtp_from)
            .field("use_starttls", &self.use_starttls)
            .finish_non_exhaustive()
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: "Reel <no-reply@reel.local>".to_string(),
            use_starttls: true,
        }
    }
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_jwt_expiry_secs() -> i64 {
    3600
}

fn default_login_ttl_secs() -> i64 {
    120
}

fn default_reset_ttl_secs() -> i64 {
    600
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let app = AppConfig {
            env: var("APP_ENV").unwrap_or_else(|| "development".to_string()),
            host: var("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: parse_or(&var, "PORT", 5000)?,
            json_logs: var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(&var, "DB_MAX_CONNECTIONS", default_max_connections())?,
                min_connections: parse_or(&var, "DB_MIN_CONNECTIONS", default_min_connections())?,
            }),
            None => None,
        };

        let redis = var("REDIS_URL").map(|url| RedisConfig { url });

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET environment variable not set")?,
            expiry_secs: parse_or(&var, "JWT_EXPIRY_SECS", default_jwt_expiry_secs())?,
        };

        let otp = OtpConfig {
            login_ttl_secs: parse_or(&var, "OTP_LOGIN_TTL_SECS", default_login_ttl_secs())?,
            reset_ttl_secs: parse_or(&var, "OTP_RESET_TTL_SECS", default_reset_ttl_secs())?,
        };
        if otp.login_ttl_secs <= 0 || otp.reset_ttl_secs <= 0 {
            bail!("OTP lifetimes must be positive");
        }

        let defaults = EmailConfig::default();
        let email = EmailConfig {
            smtp_host: var("SMTP_HOST").unwrap_or_default(),
            smtp_port: parse_or(&var, "SMTP_PORT", defaults.smtp_port)?,
            smtp_username: var("SMTP_USERNAME"),
            smtp_password: var("SMTP_PASSWORD"),
            smtp_from: var("SMTP_FROM").unwrap_or(defaults.smtp_from),
            use_starttls: var("SMTP_STARTTLS")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(defaults.use_starttls),
        };

        Ok(Config {
            app,
            database,
            redis,
            jwt,
            otp,
            email,
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.env.eq_ignore_ascii_case("production")
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
