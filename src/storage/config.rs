//! Board configuration
//!
//! The board reads `tasks/config.yaml`: the ordered column list (name, label,
//! color) and settings (auto-increment ids, default column for new tasks).
//! Unlike resource headers this file is machine-shaped YAML, so it goes
//! through serde rather than the restricted header codec.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Result, StoreError};
use super::file::write_atomic;

/// One column of the board, in board order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub color: String,
}

impl ColumnSpec {
    fn new(name: &str, label: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub auto_increment_id: bool,
    pub default_column: String,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            auto_increment_id: true,
            default_column: "backlog".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub columns: Vec<ColumnSpec>,
    pub settings: BoardSettings,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            columns: vec![
                ColumnSpec::new("backlog", "Backlog", "#6b7280"),
                ColumnSpec::new("todo", "To Do", "#3b82f6"),
                ColumnSpec::new("in-progress", "In Progress", "#f59e0b"),
                ColumnSpec::new("review", "Review", "#8b5cf6"),
                ColumnSpec::new("done", "Done", "#10b981"),
            ],
            settings: BoardSettings::default(),
        }
    }
}

impl BoardConfig {
    /// Loads the config, falling back to the default board when the file does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(StoreError::io("read", path, e)),
        };

        let config: BoardConfig = serde_yaml::from_str(&text).map_err(|e| StoreError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate(path)?;
        Ok(config)
    }

    /// Writes the config through the same temp+rename path as every other
    /// file, so a crash never leaves a torn `config.yaml` behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).map_err(|e| StoreError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        write_atomic(path, &yaml)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.columns.is_empty() {
            return Err(StoreError::Config {
                path: path.to_path_buf(),
                reason: "at least one column is required".to_string(),
            });
        }
        // "comments" is reserved: the comment tree lives next to the columns
        if let Some(col) = self.columns.iter().find(|c| c.name == "comments") {
            return Err(StoreError::Config {
                path: path.to_path_buf(),
                reason: format!("column name is reserved: {}", col.name),
            });
        }
        Ok(())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// The configured default column, falling back to the first column when
    /// the setting points at a column that does not exist.
    pub fn default_column(&self) -> &str {
        if self.has_column(&self.settings.default_column) {
            &self.settings.default_column
        } else {
            &self.columns[0].name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_default_board() {
        let dir = TempDir::new().unwrap();
        let config = BoardConfig::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, BoardConfig::default());
        assert_eq!(config.default_column(), "backlog");
        assert_eq!(config.columns.len(), 5);
    }

    #[test]
    fn parses_hand_written_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "columns:\n  - name: open\n    label: \"Open\"\n    color: \"#111111\"\n  - name: closed\n    label: \"Closed\"\n\nsettings:\n  auto_increment_id: true\n  default_column: open\n",
        )
        .unwrap();

        let config = BoardConfig::load(&path).unwrap();
        assert_eq!(
            config.column_names().collect::<Vec<_>>(),
            vec!["open", "closed"]
        );
        assert_eq!(config.default_column(), "open");
        assert_eq!(config.columns[1].color, "");
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        let config = BoardConfig::default();
        config.save(&path).unwrap();
        assert_eq!(BoardConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn save_lands_atomically_without_temp_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "columns:\n  - name: stale\n    label: Stale\n").unwrap();

        BoardConfig::default().save(&path).unwrap();

        assert_eq!(BoardConfig::load(&path).unwrap(), BoardConfig::default());
        assert!(!dir.path().join("config.tmp").exists());
    }

    #[test]
    fn unknown_default_column_falls_back_to_first() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "columns:\n  - name: a\n    label: A\nsettings:\n  default_column: zzz\n",
        )
        .unwrap();
        let config = BoardConfig::load(&path).unwrap();
        assert_eq!(config.default_column(), "a");
    }

    #[test]
    fn empty_columns_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "columns: []\n").unwrap();
        assert!(matches!(
            BoardConfig::load(&path).unwrap_err(),
            StoreError::Config { .. }
        ));
    }

    #[test]
    fn reserved_column_name_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "columns:\n  - name: comments\n    label: C\n").unwrap();
        assert!(matches!(
            BoardConfig::load(&path).unwrap_err(),
            StoreError::Config { .. }
        ));
    }

    #[test]
    fn garbled_yaml_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "columns: [unclosed\n").unwrap();
        assert!(matches!(
            BoardConfig::load(&path).unwrap_err(),
            StoreError::Config { .. }
        ));
    }
}
