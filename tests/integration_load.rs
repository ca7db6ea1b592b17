//! Integration tests for configuration loading
//!
//! These exercise the full path: real `.env` files on disk, overlay
//! selection, and validation, without touching the process environment.

use std::path::Path;

use mandi_config::{AppConfig, ConfigError, Environment, EnvSource, JwtAlgorithm};
use secrecy::ExposeSecret;

const BASE_ENV: &str = "\
# deployment configuration
ENVIRONMENT=development
DEBUG=true

BACKEND_SERVER_HOST=0.0.0.0
BACKEND_SERVER_PORT=8001
BACKEND_SERVER_WORKERS=4

POSTGRES_SCHEMA=postgresql
POSTGRES_USERNAME=postgres
POSTGRES_PASSWORD=pw
POSTGRES_HOST=db
POSTGRES_PORT=5432
POSTGRES_DB=my_db
DB_TIMEOUT=30
DB_POOL_SIZE=100
DB_MAX_POOL_CON=80
DB_POOL_OVERFLOW=20
IS_DB_ECHO_LOG=true
IS_DB_EXPIRE_ON_COMMIT=false
IS_DB_FORCE_ROLLBACK=false

API_TOKEN=dev-api-token
AUTH_TOKEN=dev-auth-token
JWT_SECRET_KEY=dev-signing-key
JWT_SUBJECT=access
JWT_TOKEN_PREFIX=Bearer
JWT_ALGORITHM=HS256
JWT_MIN=60
JWT_HOUR=23
JWT_DAY=6

HASHING_ALGORITHM_LAYER_1=bcrypt
HASHING_ALGORITHM_LAYER_2=argon2
HASHING_SALT=dev-salt

DATA_GOV_API_KEY=dev-gov-key
DATA_GOV_URL=https://api.data.gov.in/resource
IS_ALLOWED_CREDENTIALS=true

REDIS_HOST=cache
REDIS_PORT=6380
REDIS_DB=1

EMAIL_SENDER=noreply@mandi.example
SMTP_SERVER=smtp.mandi.example
SMTP_PORT=465
SMTP_TLS=yes
EMAIL_USERNAME=mailer
EMAIL_PASSWORD=mail-pw
";

fn source_from(dir: &Path, files: &[(&str, &str)]) -> EnvSource {
    let mut env_source = EnvSource::empty();
    for (name, contents) in files {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        assert!(env_source.load_file(&path).unwrap());
    }
    env_source
}

#[test]
fn full_env_file_loads_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let env_source = source_from(dir.path(), &[(".env", BASE_ENV)]);

    let config = AppConfig::load(&env_source, false).unwrap();

    assert_eq!(config.environment, Environment::Development);
    assert!(config.debug);
    assert_eq!(config.server_addr(), "0.0.0.0:8001");
    assert_eq!(config.server_workers, 4);
    assert_eq!(
        config.database_url().expose_secret(),
        "postgresql://postgres:pw@db:5432/my_db"
    );
    assert_eq!(config.db_timeout_secs, 30);
    assert!(config.db_echo_log);
    assert_eq!(config.jwt_algorithm, JwtAlgorithm::HS256);
    assert_eq!(config.access_token_ttl().as_secs(), 602_400);
    assert_eq!(config.hashing_layer_1, "bcrypt");
    assert_eq!(config.hashing_layer_2, "argon2");
    assert_eq!(config.redis_port, 6380);
    assert_eq!(config.redis_db, 1);
    assert_eq!(config.smtp_port, 465);
    assert!(config.smtp_tls);
}

#[test]
fn overlay_file_shadows_base_values() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = "POSTGRES_HOST=db.internal\nBACKEND_SERVER_PORT=9000\n";
    let env_source = source_from(dir.path(), &[(".env", BASE_ENV), (".env.development", overlay)]);

    let config = AppConfig::load(&env_source, false).unwrap();

    assert_eq!(config.postgres_host, "db.internal");
    assert_eq!(config.server_port, 9000);
    // untouched base values survive
    assert_eq!(config.postgres_db, "my_db");
}

#[test]
fn placeholder_secret_fails_only_in_strict_mode() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = "ENVIRONMENT=production\nJWT_SECRET_KEY=YOUR-JWT-SECRET-KEY\n";
    let env_source = source_from(dir.path(), &[(".env", BASE_ENV), (".env.production", overlay)]);

    let err = AppConfig::load(&env_source, true).unwrap_err();
    match err {
        ConfigError::InvalidValue { key, .. } => assert_eq!(key, "JWT_SECRET_KEY"),
        other => panic!("expected InvalidValue, got {other:?}"),
    }

    assert!(AppConfig::load(&env_source, false).is_ok());
}

#[test]
fn secret_values_never_appear_in_error_messages() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = "JWT_SECRET_KEY=YOUR-JWT-SECRET-KEY\n";
    let env_source = source_from(dir.path(), &[(".env", BASE_ENV), (".env.production", overlay)]);

    let err = AppConfig::load(&env_source, true).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("JWT_SECRET_KEY"));
    assert!(!message.contains("YOUR-JWT-SECRET-KEY"));
}

#[test]
fn full_deployment_env_file_is_accepted() {
    // every key the original deployment layout writes, device and
    // government-API settings included, loads without an unknown-key error
    let dir = tempfile::tempdir().unwrap();
    let extras = "\
JWT_FORGOT_PASSWORD_SUBJECT=reset
JWT_MAX_DEVICES=3
JWT_IP_CHECK_ENABLED=true
JWT_DEVICE_SECRET=dev-device-secret
JWT_REFRESH_TOKEN_EXPIRATION_TIME=14
JWT_SUSPICIOUS_ACTIVITY_MONITORING=false
JWT_ANDROID_DATA_COLLECTION=false
";
    let contents = format!("{BASE_ENV}{extras}");
    let env_source = source_from(dir.path(), &[(".env", &contents)]);

    let config = AppConfig::load(&env_source, false).unwrap();

    assert_eq!(config.api_token.expose_secret(), "dev-api-token");
    assert_eq!(config.auth_token.expose_secret(), "dev-auth-token");
    assert_eq!(config.data_gov_api_key.expose_secret(), "dev-gov-key");
    assert_eq!(config.data_gov_url, "https://api.data.gov.in/resource");
    assert!(config.allow_credentials);
    assert_eq!(config.jwt_forgot_password_subject, "reset");
    assert_eq!(config.jwt_max_devices, 3);
    assert!(config.jwt_ip_check_enabled);
    assert_eq!(config.jwt_refresh_token_days, 14);
    assert!(!config.jwt_suspicious_activity_monitoring);
    assert!(!config.jwt_android_data_collection);
}

#[test]
fn misspelled_file_key_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let contents = format!("{BASE_ENV}POSTGRESS_PORT=5432\n");
    let env_source = source_from(dir.path(), &[(".env", &contents)]);

    let err = AppConfig::load(&env_source, false).unwrap_err();
    match err {
        ConfigError::UnknownKey(key) => assert_eq!(key, "POSTGRESS_PORT"),
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn missing_required_key_names_it() {
    let dir = tempfile::tempdir().unwrap();
    let trimmed: String = BASE_ENV
        .lines()
        .filter(|line| !line.starts_with("POSTGRES_PASSWORD="))
        .map(|line| format!("{line}\n"))
        .collect();
    let env_source = source_from(dir.path(), &[(".env", &trimmed)]);

    let err = AppConfig::load(&env_source, false).unwrap_err();
    assert!(matches!(err, ConfigError::MissingKey("POSTGRES_PASSWORD")));
}

#[test]
fn discover_selects_overlay_by_environment() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), BASE_ENV).unwrap();
    std::fs::write(dir.path().join(".env.development"), "POSTGRES_HOST=dev-db\n").unwrap();
    std::fs::write(dir.path().join(".env.production"), "POSTGRES_HOST=prod-db\n").unwrap();

    let env_source = EnvSource::discover(dir.path()).unwrap();
    // ENVIRONMENT=development in the base file picks .env.development
    assert_eq!(env_source.get("POSTGRES_HOST").as_deref(), Some("dev-db"));
}
