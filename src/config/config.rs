use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::data::pagination::DEFAULT_PAGE_SIZE;
use crate::debouncer::DEFAULT_SEARCH_DEBOUNCE_MS;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows per page when the URL does not say otherwise
    pub default_page_size: usize,

    /// Page sizes offered to the user
    pub page_size_options: Vec<usize>,

    /// Quiet time after the last keystroke before a search is committed
    pub search_debounce_ms: u64,

    /// Non-empty searches this short are not committed
    pub min_search_length: usize,

    /// Drop selected records that disappear when the data is replaced
    pub prune_selection_on_data_change: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show row numbers in the printed table
    pub show_row_numbers: bool,

    /// Longer cell values are cut to this many characters
    pub max_column_width: usize,

    /// Text printed for null or missing values
    pub null_placeholder: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            page_size_options: vec![5, 10, 15, 20, 50, 100],
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            min_search_length: 0,
            prune_selection_on_data_change: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_row_numbers: false,
            max_column_width: 40,
            null_placeholder: String::new(),
        }
    }
}

impl Config {
    /// Load config from the default location, writing the defaults there on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        Self::load_from_path(&config_path)
    }

    /// Load and validate a config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate();
        debug!(target: "config", "Loaded config from {}", path.display());
        Ok(config)
    }

    /// Replace values that cannot work with their defaults
    pub fn validate(&mut self) {
        let defaults = TableConfig::default();
        if self.table.default_page_size == 0 {
            warn!(
                target: "config",
                "default_page_size = 0 is invalid, using {}",
                defaults.default_page_size
            );
            self.table.default_page_size = defaults.default_page_size;
        }

        let before = self.table.page_size_options.len();
        self.table.page_size_options.retain(|size| *size > 0);
        if self.table.page_size_options.len() != before {
            warn!(target: "config", "Dropped page size option 0");
        }
        if self.table.page_size_options.is_empty() {
            self.table.page_size_options = defaults.page_size_options;
        }

        if self.display.max_column_width == 0 {
            warn!(target: "config", "max_column_width = 0 is invalid, using 40");
            self.display.max_column_width = DisplayConfig::default().max_column_width;
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::get_config_path()?)
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("table-state").join("config.toml"))
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# table-state configuration file
# Location: ~/.config/table-state/config.toml (Linux)
#           ~/Library/Application Support/table-state/config.toml (macOS)
#           %APPDATA%\table-state\config.toml (Windows)

[table]
# Rows per page when no size is given
default_page_size = 10

# Page sizes offered to the user
page_size_options = [5, 10, 15, 20, 50, 100]

# Milliseconds to wait after the last keystroke before searching
search_debounce_ms = 300

# Searches this short (but not empty) are not run
min_search_length = 0

# Forget selected records that are gone after the data is replaced
prune_selection_on_data_change = true

[display]
# Number the printed rows
show_row_numbers = false

# Cut longer cell values to this many characters
max_column_width = 40

# Text shown for null or missing values
null_placeholder = ""
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.table.default_page_size, 10);
        assert_eq!(config.table.search_debounce_ms, 300);
        assert!(config.table.prune_selection_on_data_change);
        assert!(!config.display.show_row_numbers);
    }

    #[test]
    fn test_commented_default_matches_default() {
        let parsed: Config = toml::from_str(&Config::create_default_with_comments()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[table]\ndefault_page_size = 25\n").unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.table.default_page_size, 25);
        assert_eq!(config.table.search_debounce_ms, 300);
        assert_eq!(config.display, DisplayConfig::default());
    }

    #[test]
    fn test_invalid_values_are_corrected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[table]\ndefault_page_size = 0\npage_size_options = [0]\n[display]\nmax_column_width = 0\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.table.default_page_size, 10);
        assert_eq!(config.table.page_size_options, vec![5, 10, 15, 20, 50, 100]);
        assert_eq!(config.display.max_column_width, 40);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.display.null_placeholder = "-".to_string();
        config.save_to_path(&path).unwrap();
        assert_eq!(Config::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[table\n").unwrap();
        assert!(Config::load_from_path(&path).is_err());
    }
}
