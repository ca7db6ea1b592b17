//! Error handling module
//!
//! Configuration errors are startup-fatal: the process must not serve
//! traffic with an incomplete or invalid configuration, so none of these
//! are retried. Messages carry the key name and the rule violated, never
//! the raw value, so secret material cannot leak through error paths.

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required key had no value and no default.
    #[error("Missing environment variable: {0}")]
    MissingKey(&'static str),

    /// The raw string could not be coerced into the declared type.
    #[error("Invalid value for environment variable {key}: expected {expected}")]
    TypeMismatch {
        key: &'static str,
        expected: &'static str,
    },

    /// Coercion succeeded but a validated invariant was violated.
    #[error("Invalid value for environment variable {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        reason: &'static str,
    },

    /// A key in an env file matched no known configuration field.
    #[error("Unknown configuration key in env file: {0}")]
    UnknownKey(String),

    /// An env file exists but could not be read or parsed.
    #[error("Failed to read env file {path}: {source}")]
    EnvFile {
        path: std::path::PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}
