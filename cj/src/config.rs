//! Configuration for custjob

use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database holding all tables
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Path of the delimited output file, overwritten on each run
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Records per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("custjob")
        .join("custjob.db")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("new_customers.csv")
}

fn default_chunk_size() -> usize {
    crate::DEFAULT_CHUNK_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            output_path: default_output_path(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            return Ok(config);
        }

        // Try default locations
        let default_paths = [
            Some(PathBuf::from(".custjob.yml")),
            dirs::config_dir().map(|p| p.join("custjob").join("config.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        Ok(Config::default())
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
