//! mandi-config Library
//!
//! Typed environment configuration for the mandi backend API. One
//! validated, immutable [`AppConfig`] is produced at process start and
//! handed to every component that needs it; nothing reads the environment
//! after that.

pub mod config;
pub mod error;
pub mod source;

pub use config::{AppConfig, Environment, JwtAlgorithm};
pub use error::ConfigError;
pub use source::EnvSource;
