//! # World Configuration
//!
//! Loaded once at engine startup from a TOML file.
//!
//! ```toml
//! initial_column_capacity = 256
//! validate_on_mutation = false
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Tuning knobs for a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EcsConfig {
    /// Rows reserved in every column when an archetype is created.
    ///
    /// Zero means columns allocate on the first insert.
    pub initial_column_capacity: usize,
    /// Run [`World::validate`](crate::World::validate) after every
    /// structural change.
    pub validate_on_mutation: bool,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            initial_column_capacity: 0,
            validate_on_mutation: cfg!(debug_assertions),
        }
    }
}

impl EcsConfig {
    /// Parses a configuration from TOML text. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Config`] if the text is not valid TOML or
    /// contains unknown keys.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        toml::from_str(text).map_err(|err| EcsError::Config(err.to_string()))
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| EcsError::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = EcsConfig::from_toml_str("").unwrap();
        assert_eq!(config, EcsConfig::default());
    }

    #[test]
    fn test_config_parse() {
        let config = EcsConfig::from_toml_str(
            "initial_column_capacity = 64\nvalidate_on_mutation = true\n",
        )
        .unwrap();
        assert_eq!(config.initial_column_capacity, 64);
        assert!(config.validate_on_mutation);
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let err = EcsConfig::from_toml_str("column_capacity = 3").unwrap_err();
        assert!(matches!(err, EcsError::Config(_)));
    }

    #[test]
    fn test_config_missing_file() {
        let err = EcsConfig::load("/definitely/not/here/tessera.toml").unwrap_err();
        assert!(matches!(err, EcsError::Config(_)));
    }
}
