use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{
    DEFAULT_CONFIG_PATH, DEFAULT_DB_PATH, DEFAULT_INPUT_PATH, DEFAULT_LOG_DIR,
};
use crate::error::{MaintenanceError, Result};

pub const DB_PATH_ENV: &str = "GYM_DB_PATH";
pub const INPUT_PATH_ENV: &str = "GYM_INPUT_PATH";

/// Runtime settings. Precedence: defaults < TOML file < environment < CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub input_path: PathBuf,
    pub logging: LoggingConfig,
    pub import: ImportConfig,
    pub diagnose: DiagnoseConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Labels expected in the secondary header row, in column order
    /// (remaining days, phone, member number, name). Empty disables the check.
    pub expected_headers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiagnoseConfig {
    pub sample_limit: usize,
    pub anomaly_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            logging: LoggingConfig::default(),
            import: ImportConfig::default(),
            diagnose: DiagnoseConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: "gym_maint.log".to_string(),
        }
    }
}

impl Default for DiagnoseConfig {
    fn default() -> Self {
        Self {
            sample_limit: 5,
            anomaly_limit: 10,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `gym_maint.toml` if it exists.
    ///
    /// An explicitly requested file must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
                Self::default()
            }
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MaintenanceError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment values using the supplied lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup(DB_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.db_path = PathBuf::from(db);
        }
        if let Some(input) = lookup(INPUT_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.input_path = PathBuf::from(input);
        }
    }

    /// Apply CLI flags, which win over every other source.
    pub fn with_overrides(mut self, db_path: Option<PathBuf>, input_path: Option<PathBuf>) -> Self {
        if let Some(db) = db_path {
            self.db_path = db;
        }
        if let Some(input) = input_path {
            self.input_path = input;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        let headers = &self.import.expected_headers;
        if !headers.is_empty() && headers.len() != 4 {
            return Err(MaintenanceError::Config(format!(
                "import.expected_headers must list exactly 4 labels, got {}",
                headers.len()
            )));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(MaintenanceError::Config("db_path must not be empty".to_string()));
        }
        Ok(())
    }
}
