//! Environment source module
//!
//! Wraps the raw key-value inputs the loader consumes: one or two `.env`
//! files plus the process environment. Precedence, lowest to highest:
//! base `.env` file, environment-specific overlay file, process
//! environment. File parsing is delegated to `dotenvy` (`KEY=VALUE` lines,
//! `#` comments and blank lines ignored); the process environment is never
//! mutated.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::config::Environment;
use crate::error::ConfigError;

/// A string-keyed mapping of raw configuration values.
///
/// Keys that came from an env file are tracked separately so the loader
/// can reject unknown file keys while leaving the process environment
/// (which legitimately carries unrelated variables) alone.
#[derive(Default)]
pub struct EnvSource {
    values: HashMap<String, String>,
    file_keys: BTreeSet<String>,
    use_process_env: bool,
}

// Raw values may hold secrets; debug output shows keys only.
impl std::fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSource")
            .field("file_keys", &self.file_keys)
            .field("use_process_env", &self.use_process_env)
            .finish_non_exhaustive()
    }
}

impl EnvSource {
    /// An empty source that ignores the process environment. Test seam.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a source from explicit pairs, ignoring the process
    /// environment. The pairs are treated as file-sourced.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut source = Self::default();
        for (key, value) in pairs {
            source.insert(key.into(), value.into());
        }
        source
    }

    /// Enable process-environment lookups, which shadow file values.
    pub fn with_process_env(mut self) -> Self {
        self.use_process_env = true;
        self
    }

    /// Parse an env file and merge it in, shadowing earlier file values.
    /// A missing file is not an error; a malformed one is.
    pub fn load_file(&mut self, path: &Path) -> Result<bool, ConfigError> {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(false);
            }
            Err(source) => {
                return Err(ConfigError::EnvFile {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        for item in iter {
            let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                path: path.to_path_buf(),
                source,
            })?;
            self.insert(key, value);
        }

        tracing::info!("Loaded environment file: {}", path.display());
        Ok(true)
    }

    /// Build the full source for a project root: base `.env`, then the
    /// overlay file selected by `ENVIRONMENT`, then the process
    /// environment on top.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        let mut source = Self::default().with_process_env();

        if !source.load_file(&root.join(".env"))? {
            tracing::info!("No .env file found; using process environment only");
        }

        let environment = Environment::parse_lenient(source.get("ENVIRONMENT").as_deref());
        let overlay = root.join(environment.env_file());
        source.load_file(&overlay)?;

        Ok(source)
    }

    /// Look up a raw value. Process environment wins over file values.
    pub fn get(&self, key: &str) -> Option<String> {
        if self.use_process_env {
            if let Ok(value) = std::env::var(key) {
                return Some(value);
            }
        }
        self.values.get(key).cloned()
    }

    /// Keys that were read from env files, in sorted order.
    pub fn file_keys(&self) -> impl Iterator<Item = &str> {
        self.file_keys.iter().map(String::as_str)
    }

    fn insert(&mut self, key: String, value: String) {
        self.file_keys.insert(key.clone());
        self.values.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_tracks_file_keys() {
        let source = EnvSource::from_pairs([("DEBUG", "true"), ("POSTGRES_HOST", "db")]);
        let keys: Vec<&str> = source.file_keys().collect();
        assert_eq!(keys, vec!["DEBUG", "POSTGRES_HOST"]);
        assert_eq!(source.get("DEBUG").as_deref(), Some("true"));
        assert_eq!(source.get("MISSING"), None);
    }

    #[test]
    fn later_values_shadow_earlier_ones() {
        let mut source = EnvSource::from_pairs([("POSTGRES_HOST", "base")]);
        source.insert("POSTGRES_HOST".into(), "overlay".into());
        assert_eq!(source.get("POSTGRES_HOST").as_deref(), Some("overlay"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = EnvSource::empty();
        let loaded = source.load_file(&dir.path().join(".env")).unwrap();
        assert!(!loaded);
    }

    #[test]
    fn env_file_comments_and_blank_lines_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# comment\n\nPOSTGRES_HOST=db\n").unwrap();

        let mut source = EnvSource::empty();
        assert!(source.load_file(&path).unwrap());
        assert_eq!(source.get("POSTGRES_HOST").as_deref(), Some("db"));
        assert_eq!(source.file_keys().count(), 1);
    }
}
