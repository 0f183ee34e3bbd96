//! Project configuration: database location and model declarations.
//!
//! # Example YAML
//!
//! ```yaml
//! database: database.db
//! models:
//!   - name: Person
//!     fields:
//!       - { name: name, type: text }
//!       - { name: age, type: integer, default: 0 }
//!   - name: Pet
//!     fields:
//!       - { name: owner, type: integer, references: Person }
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use recordkit_core::{ModelDecl, Registry};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SqliteError};

/// File name looked up when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "recordkit.yaml";

/// Database file used when the configuration names none.
pub const DEFAULT_DATABASE: &str = "database.db";

fn default_database() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE)
}

/// Top-level project configuration.
///
/// # Examples
///
/// ```
/// use recordkit_sqlite::ProjectConfig;
///
/// let yaml = "models:\n  - name: Person\n    fields:\n      - { name: name, type: str }\n";
/// let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.database.to_str(), Some("database.db"));
/// assert!(config.registry().unwrap().get("Person").is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// SQLite database file, relative to the working directory.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Record types, parents before their subtypes.
    #[serde(default)]
    pub models: Vec<ModelDecl>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            models: Vec::new(),
        }
    }
}

impl ProjectConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](SqliteError::IoError) if the file cannot be read,
    /// or [`YamlError`](SqliteError::YamlError) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Builds the registry described by `models`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](SqliteError::ConfigError) when no models are
    /// declared, or the declaration error otherwise.
    pub fn registry(&self) -> Result<Registry> {
        if self.models.is_empty() {
            return Err(SqliteError::ConfigError(
                "no models are declared".to_string(),
            ));
        }
        Ok(Registry::from_models(&self.models)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
database: people.db
models:
  - name: Person
    fields:
      - { name: name, type: text, max_length: 40 }
      - { name: age, type: integer, default: 0 }
  - name: Pet
    fields:
      - { name: owner, type: integer, references: Person, nullable: true }
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: ProjectConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.database, PathBuf::from("people.db"));
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.models[1].fields[0].references.as_deref(), Some("Person"));
        assert!(config.models[1].fields[0].nullable);
    }

    #[test]
    fn test_registry_from_config() {
        let config: ProjectConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        let registry = config.registry().unwrap();
        let person = registry.get("Person").unwrap();
        assert_eq!(
            person.field("name").unwrap().metadata(),
            vec!["VARCHAR(40)", "NOT NULL"]
        );
        assert_eq!(registry.tables().len(), 2);
    }

    #[test]
    fn test_empty_models_is_an_error() {
        let config = ProjectConfig::default();
        assert!(matches!(config.registry(), Err(SqliteError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let yaml = "models:\n  - name: Person\n    fields:\n      - { name: tags, type: list }\n";
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.registry().unwrap_err();
        assert!(err.to_string().contains("unsupported type: list"));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let original: ProjectConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = ProjectConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, SqliteError::IoError(_)));
    }
}
