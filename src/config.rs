//! Configuration module
//!
//! Loads the application configuration from an environment source in one
//! validating pass. Construction is all-or-nothing: either every field
//! coerces and every invariant holds, or loading fails with the offending
//! key name and nothing is returned. The resulting [`AppConfig`] is
//! immutable and may be shared freely across threads; downstream
//! components (database pool, token issuer, mail client, server
//! bootstrap) receive their fields from it at their own construction
//! time.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;
use crate::source::EnvSource;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    /// Parse an `ENVIRONMENT` value. Missing or unrecognized values fall
    /// back to development (non-strict) rather than guessing production.
    /// The legacy `DEV`/`PROD`/`LOCAL` spellings are accepted.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("test") => Environment::Test,
            Some("development") | Some("dev") | Some("local") | None => Environment::Development,
            Some(other) => {
                tracing::warn!(
                    "Unrecognized ENVIRONMENT value {:?}; treating as development",
                    other
                );
                Environment::Development
            }
        }
    }

    /// Overlay env file for this environment, matching the original
    /// deployment layout (`.env` plus one environment-specific file).
    pub fn env_file(&self) -> &'static str {
        match self {
            Environment::Development => ".env.development",
            Environment::Production => ".env.production",
            Environment::Test => ".env.test",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

/// JWT signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JwtAlgorithm {
    HS256,
    HS384,
    HS512,
}

impl JwtAlgorithm {
    fn parse(raw: &str, key: &'static str) -> Result<Self, ConfigError> {
        match raw.trim() {
            "HS256" => Ok(JwtAlgorithm::HS256),
            "HS384" => Ok(JwtAlgorithm::HS384),
            "HS512" => Ok(JwtAlgorithm::HS512),
            _ => Err(ConfigError::TypeMismatch {
                key,
                expected: "one of HS256, HS384, HS512",
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JwtAlgorithm::HS256 => "HS256",
            JwtAlgorithm::HS384 => "HS384",
            JwtAlgorithm::HS512 => "HS512",
        }
    }
}

/// Application configuration
///
/// Secret fields are wrapped in [`SecretString`] so the derived `Debug`
/// output and anything built on it stays redacted.
#[derive(Debug)]
pub struct AppConfig {
    /// Environment (development, production, test)
    pub environment: Environment,

    /// Debug mode flag
    pub debug: bool,

    /// Server bind host
    pub server_host: String,

    /// Server bind port
    pub server_port: u16,

    /// Worker process count
    pub server_workers: u32,

    /// Database driver/schema name (e.g. "postgresql")
    pub postgres_schema: String,

    /// Database username
    pub postgres_username: String,

    /// Database password
    pub postgres_password: SecretString,

    /// Database host
    pub postgres_host: String,

    /// Database port
    pub postgres_port: u16,

    /// Database name
    pub postgres_db: String,

    /// Connection timeout in seconds
    pub db_timeout_secs: u64,

    /// Connection pool size
    pub db_pool_size: u32,

    /// Maximum pooled connections
    pub db_max_pool_con: u32,

    /// Pool overflow allowance
    pub db_pool_overflow: u32,

    /// Echo SQL statements to the log
    pub db_echo_log: bool,

    /// Expire ORM objects on commit
    pub db_expire_on_commit: bool,

    /// Force transaction rollback (test fixtures)
    pub db_force_rollback: bool,

    /// Service API token
    pub api_token: SecretString,

    /// Service auth token
    pub auth_token: SecretString,

    /// JWT signing secret
    pub jwt_secret_key: SecretString,

    /// JWT subject claim
    pub jwt_subject: String,

    /// JWT subject claim for password-reset tokens
    pub jwt_forgot_password_subject: String,

    /// Authorization header token prefix
    pub jwt_token_prefix: String,

    /// JWT signing algorithm
    pub jwt_algorithm: JwtAlgorithm,

    /// Access token lifetime components
    pub jwt_min: u64,
    pub jwt_hour: u64,
    pub jwt_day: u64,

    /// Maximum devices per user
    pub jwt_max_devices: u32,

    /// Bind tokens to the originating IP
    pub jwt_ip_check_enabled: bool,

    /// Device-binding secret
    pub jwt_device_secret: SecretString,

    /// Refresh token lifetime in days
    pub jwt_refresh_token_days: u64,

    /// Monitor for suspicious token activity
    pub jwt_suspicious_activity_monitoring: bool,

    /// Collect Android device data
    pub jwt_android_data_collection: bool,

    /// Password hashing algorithm, layer 1 (applied first)
    pub hashing_layer_1: String,

    /// Password hashing algorithm, layer 2
    pub hashing_layer_2: String,

    /// Password hashing salt
    pub hashing_salt: SecretString,

    /// data.gov API key
    pub data_gov_api_key: SecretString,

    /// data.gov base URL
    pub data_gov_url: String,

    /// Allow credentialed cross-origin requests
    pub allow_credentials: bool,

    /// Redis host
    pub redis_host: String,

    /// Redis port
    pub redis_port: u16,

    /// Redis logical database index
    pub redis_db: u32,

    /// Outbound mail sender address
    pub email_sender: String,

    /// SMTP server host
    pub smtp_server: String,

    /// SMTP server port
    pub smtp_port: u16,

    /// Use TLS for SMTP
    pub smtp_tls: bool,

    /// SMTP auth username
    pub email_username: String,

    /// SMTP auth password
    pub email_password: SecretString,
}

/// Every key the loader understands. Env-file keys outside this table are
/// rejected rather than silently ignored.
const KNOWN_KEYS: &[&str] = &[
    "ENVIRONMENT",
    "DEBUG",
    "BACKEND_SERVER_HOST",
    "BACKEND_SERVER_PORT",
    "BACKEND_SERVER_WORKERS",
    "POSTGRES_SCHEMA",
    "POSTGRES_USERNAME",
    "POSTGRES_PASSWORD",
    "POSTGRES_HOST",
    "POSTGRES_PORT",
    "POSTGRES_DB",
    "DB_TIMEOUT",
    "DB_POOL_SIZE",
    "DB_MAX_POOL_CON",
    "DB_POOL_OVERFLOW",
    "IS_DB_ECHO_LOG",
    "IS_DB_EXPIRE_ON_COMMIT",
    "IS_DB_FORCE_ROLLBACK",
    "API_TOKEN",
    "AUTH_TOKEN",
    "JWT_SECRET_KEY",
    "JWT_SUBJECT",
    "JWT_FORGOT_PASSWORD_SUBJECT",
    "JWT_TOKEN_PREFIX",
    "JWT_ALGORITHM",
    "JWT_MIN",
    "JWT_HOUR",
    "JWT_DAY",
    "JWT_MAX_DEVICES",
    "JWT_IP_CHECK_ENABLED",
    "JWT_DEVICE_SECRET",
    "JWT_REFRESH_TOKEN_EXPIRATION_TIME",
    "JWT_SUSPICIOUS_ACTIVITY_MONITORING",
    "JWT_ANDROID_DATA_COLLECTION",
    "HASHING_ALGORITHM_LAYER_1",
    "HASHING_ALGORITHM_LAYER_2",
    "HASHING_SALT",
    "DATA_GOV_API_KEY",
    "DATA_GOV_URL",
    "IS_ALLOWED_CREDENTIALS",
    "REDIS_HOST",
    "REDIS_PORT",
    "REDIS_DB",
    "EMAIL_SENDER",
    "SMTP_SERVER",
    "SMTP_PORT",
    "SMTP_TLS",
    "EMAIL_USERNAME",
    "EMAIL_PASSWORD",
];

impl AppConfig {
    pub const TITLE: &'static str = "Mandi Backend API";
    pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    pub const TIMEZONE: &'static str = "UTC";

    /// Load and validate the configuration from an environment source.
    ///
    /// `strict` additionally rejects empty and placeholder secrets; it is
    /// the production mode.
    pub fn load(source: &EnvSource, strict: bool) -> Result<Self, ConfigError> {
        for key in source.file_keys() {
            if !KNOWN_KEYS.contains(&key) {
                return Err(ConfigError::UnknownKey(key.to_string()));
            }
        }

        let config = Self {
            environment: Environment::parse_lenient(source.get("ENVIRONMENT").as_deref()),
            debug: optional_bool(source, "DEBUG", false)?,
            server_host: required(source, "BACKEND_SERVER_HOST")?,
            server_port: required_port(source, "BACKEND_SERVER_PORT")?,
            server_workers: required_parsed(source, "BACKEND_SERVER_WORKERS")?,
            postgres_schema: required(source, "POSTGRES_SCHEMA")?,
            postgres_username: required(source, "POSTGRES_USERNAME")?,
            postgres_password: required_secret(source, "POSTGRES_PASSWORD")?,
            postgres_host: required(source, "POSTGRES_HOST")?,
            postgres_port: required_port(source, "POSTGRES_PORT")?,
            postgres_db: required(source, "POSTGRES_DB")?,
            db_timeout_secs: required_parsed(source, "DB_TIMEOUT")?,
            db_pool_size: required_parsed(source, "DB_POOL_SIZE")?,
            db_max_pool_con: required_parsed(source, "DB_MAX_POOL_CON")?,
            db_pool_overflow: required_parsed(source, "DB_POOL_OVERFLOW")?,
            db_echo_log: required_bool(source, "IS_DB_ECHO_LOG")?,
            db_expire_on_commit: required_bool(source, "IS_DB_EXPIRE_ON_COMMIT")?,
            db_force_rollback: required_bool(source, "IS_DB_FORCE_ROLLBACK")?,
            api_token: required_secret(source, "API_TOKEN")?,
            auth_token: required_secret(source, "AUTH_TOKEN")?,
            jwt_secret_key: required_secret(source, "JWT_SECRET_KEY")?,
            jwt_subject: required(source, "JWT_SUBJECT")?,
            jwt_forgot_password_subject: optional(
                source,
                "JWT_FORGOT_PASSWORD_SUBJECT",
                "password-reset",
            ),
            jwt_token_prefix: required(source, "JWT_TOKEN_PREFIX")?,
            jwt_algorithm: required_algorithm(source, "JWT_ALGORITHM")?,
            jwt_min: required_parsed(source, "JWT_MIN")?,
            jwt_hour: required_parsed(source, "JWT_HOUR")?,
            jwt_day: required_parsed(source, "JWT_DAY")?,
            jwt_max_devices: optional_parsed(source, "JWT_MAX_DEVICES", 5)?,
            jwt_ip_check_enabled: optional_bool(source, "JWT_IP_CHECK_ENABLED", false)?,
            jwt_device_secret: optional_secret(source, "JWT_DEVICE_SECRET", "device-secret-key"),
            jwt_refresh_token_days: optional_parsed(source, "JWT_REFRESH_TOKEN_EXPIRATION_TIME", 30)?,
            jwt_suspicious_activity_monitoring: optional_bool(
                source,
                "JWT_SUSPICIOUS_ACTIVITY_MONITORING",
                true,
            )?,
            jwt_android_data_collection: optional_bool(source, "JWT_ANDROID_DATA_COLLECTION", true)?,
            hashing_layer_1: required(source, "HASHING_ALGORITHM_LAYER_1")?,
            hashing_layer_2: required(source, "HASHING_ALGORITHM_LAYER_2")?,
            hashing_salt: required_secret(source, "HASHING_SALT")?,
            data_gov_api_key: required_secret(source, "DATA_GOV_API_KEY")?,
            data_gov_url: required(source, "DATA_GOV_URL")?,
            allow_credentials: required_bool(source, "IS_ALLOWED_CREDENTIALS")?,
            redis_host: optional(source, "REDIS_HOST", "localhost"),
            redis_port: optional_port(source, "REDIS_PORT", 6379)?,
            redis_db: optional_parsed(source, "REDIS_DB", 0)?,
            email_sender: optional(source, "EMAIL_SENDER", "noreply@yourdomain.com"),
            smtp_server: optional(source, "SMTP_SERVER", "smtp.gmail.com"),
            smtp_port: optional_port(source, "SMTP_PORT", 587)?,
            smtp_tls: optional_bool(source, "SMTP_TLS", true)?,
            email_username: optional(source, "EMAIL_USERNAME", ""),
            email_password: optional_secret(source, "EMAIL_PASSWORD", ""),
        };

        config.validate(strict)?;
        Ok(config)
    }

    /// Load from discovered `.env` files and the process environment.
    /// Strict mode is derived from `ENVIRONMENT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = EnvSource::discover(std::path::Path::new("."))?;
        let environment = Environment::parse_lenient(source.get("ENVIRONMENT").as_deref());
        Self::load(&source, environment.is_production())
    }

    fn validate(&self, strict: bool) -> Result<(), ConfigError> {
        if self.server_workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BACKEND_SERVER_WORKERS",
                reason: "worker count must be at least 1",
            });
        }

        if self.db_max_pool_con > self.db_pool_size {
            return Err(ConfigError::InvalidValue {
                key: "DB_MAX_POOL_CON",
                reason: "must not exceed DB_POOL_SIZE",
            });
        }

        if strict {
            check_secret(&self.postgres_password, "POSTGRES_PASSWORD")?;
            check_secret(&self.jwt_secret_key, "JWT_SECRET_KEY")?;
            check_secret(&self.hashing_salt, "HASHING_SALT")?;
            check_secret(&self.api_token, "API_TOKEN")?;
            check_secret(&self.auth_token, "AUTH_TOKEN")?;
            check_secret(&self.data_gov_api_key, "DATA_GOV_API_KEY")?;
            check_secret(&self.email_password, "EMAIL_PASSWORD")?;
            check_secret(&self.jwt_device_secret, "JWT_DEVICE_SECRET")?;
        }

        Ok(())
    }

    /// Database connection URL, recomputed from its constituent fields.
    /// Wrapped because it embeds the password.
    pub fn database_url(&self) -> SecretString {
        SecretString::from(format!(
            "{}://{}:{}@{}:{}/{}",
            self.postgres_schema,
            self.postgres_username,
            self.postgres_password.expose_secret(),
            self.postgres_host,
            self.postgres_port,
            self.postgres_db,
        ))
    }

    /// Access token lifetime: the three components summed as seconds.
    /// Saturates rather than overflowing on absurd component values.
    pub fn access_token_ttl(&self) -> Duration {
        let secs = self
            .jwt_min
            .saturating_mul(60)
            .saturating_add(self.jwt_hour.saturating_mul(3600))
            .saturating_add(self.jwt_day.saturating_mul(86_400));
        Duration::from_secs(secs)
    }

    /// Refresh token lifetime.
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.jwt_refresh_token_days.saturating_mul(86_400))
    }

    /// The `"host:port"` server bind address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }
}

fn required(source: &EnvSource, key: &'static str) -> Result<String, ConfigError> {
    source.get(key).ok_or(ConfigError::MissingKey(key))
}

fn optional(source: &EnvSource, key: &'static str, default: &str) -> String {
    source.get(key).unwrap_or_else(|| default.to_string())
}

fn required_secret(source: &EnvSource, key: &'static str) -> Result<SecretString, ConfigError> {
    required(source, key).map(SecretString::from)
}

fn optional_secret(source: &EnvSource, key: &'static str, default: &str) -> SecretString {
    SecretString::from(optional(source, key, default))
}

fn parse_bool(raw: &str, key: &'static str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::TypeMismatch {
            key,
            expected: "a boolean (true/1/yes or false/0/no)",
        }),
    }
}

fn required_bool(source: &EnvSource, key: &'static str) -> Result<bool, ConfigError> {
    parse_bool(&required(source, key)?, key)
}

fn optional_bool(source: &EnvSource, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match source.get(key) {
        Some(raw) => parse_bool(&raw, key),
        None => Ok(default),
    }
}

fn parse_int<T: std::str::FromStr>(raw: &str, key: &'static str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::TypeMismatch {
        key,
        expected: "an integer",
    })
}

fn required_parsed<T: std::str::FromStr>(
    source: &EnvSource,
    key: &'static str,
) -> Result<T, ConfigError> {
    parse_int(&required(source, key)?, key)
}

fn optional_parsed<T: std::str::FromStr>(
    source: &EnvSource,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match source.get(key) {
        Some(raw) => parse_int(&raw, key),
        None => Ok(default),
    }
}

fn parse_port(raw: &str, key: &'static str) -> Result<u16, ConfigError> {
    let value: i64 = parse_int(raw, key)?;
    if !(1..=65_535).contains(&value) {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "must be a valid TCP port (1-65535)",
        });
    }
    Ok(value as u16)
}

fn required_port(source: &EnvSource, key: &'static str) -> Result<u16, ConfigError> {
    parse_port(&required(source, key)?, key)
}

fn required_algorithm(source: &EnvSource, key: &'static str) -> Result<JwtAlgorithm, ConfigError> {
    JwtAlgorithm::parse(&required(source, key)?, key)
}

fn optional_port(source: &EnvSource, key: &'static str, default: u16) -> Result<u16, ConfigError> {
    match source.get(key) {
        Some(raw) => parse_port(&raw, key),
        None => Ok(default),
    }
}

fn check_secret(secret: &SecretString, key: &'static str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "secret must not be empty in production",
        });
    }
    if is_placeholder(value) {
        return Err(ConfigError::InvalidValue {
            key,
            reason: "secret still holds a placeholder value",
        });
    }
    Ok(())
}

/// Recognize template values left over from a config checked into source
/// control ("YOUR-JWT-SECRET-KEY", "changeme", ...). The device-secret
/// loader default counts: it must be overridden before production.
fn is_placeholder(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    upper.starts_with("YOUR-")
        || upper.starts_with("YOUR_")
        || matches!(
            upper.as_str(),
            "CHANGEME" | "CHANGE_ME" | "CHANGE-ME" | "SECRET" | "PASSWORD" | "DEVICE-SECRET-KEY"
        )
}
