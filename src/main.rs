//! mandi-config - Configuration bootstrap for the mandi backend API
//!
//! Loads and validates the deployment configuration before anything else
//! starts. Downstream components (database pool, token issuer, cache and
//! mail clients, the server itself) take their fields from the
//! [`AppConfig`] produced here; an invalid configuration aborts startup.

use std::path::Path;

use mandi_config::{AppConfig, Environment, EnvSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mandi_config=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Log a summary of the loaded configuration. Secret fields stay out.
fn log_summary(config: &AppConfig) {
    tracing::info!(
        "{} v{} ({})",
        AppConfig::TITLE,
        AppConfig::VERSION,
        config.environment.as_str()
    );
    tracing::info!("Server: {} ({} workers)", config.server_addr(), config.server_workers);
    tracing::info!(
        "Database: {}@{}:{}/{} (pool {}, max {}, overflow {})",
        config.postgres_username,
        config.postgres_host,
        config.postgres_port,
        config.postgres_db,
        config.db_pool_size,
        config.db_max_pool_con,
        config.db_pool_overflow,
    );
    tracing::info!(
        "Auth: {} tokens, lifetime {}s",
        config.jwt_algorithm.as_str(),
        config.access_token_ttl().as_secs()
    );
    tracing::info!("Cache: {}:{}/{}", config.redis_host, config.redis_port, config.redis_db);
    tracing::info!(
        "Email: {} via {}:{} (TLS: {})",
        config.email_sender,
        config.smtp_server,
        config.smtp_port,
        config.smtp_tls
    );
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let source = EnvSource::discover(Path::new("."))?;
    let environment = Environment::parse_lenient(source.get("ENVIRONMENT").as_deref());

    tracing::info!("Environment set to: {}", environment.as_str());

    let config = AppConfig::load(&source, environment.is_production())?;
    log_summary(&config);

    tracing::info!("Configuration is valid");
    Ok(())
}
