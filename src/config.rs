use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::estimate::RootPolicy;

pub const MAX_DEGREE: usize = 8;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_uploads_path")]
    pub uploads_path: PathBuf,
    #[serde(default = "default_timestamps_path")]
    pub timestamps_path: PathBuf,
    #[serde(default = "default_total_files")]
    pub total_files: u64,
    #[serde(default = "default_degree")]
    pub degree: usize,
    #[serde(default)]
    pub root_policy: RootPolicy,
    #[serde(default = "default_plot_dir")]
    pub plot_dir: PathBuf,
}

fn default_uploads_path() -> PathBuf {
    PathBuf::from("data").join("uploads.txt")
}
fn default_timestamps_path() -> PathBuf {
    PathBuf::from("data").join("timestamps.txt")
}
fn default_total_files() -> u64 {
    100
}
fn default_degree() -> usize {
    2
}
fn default_plot_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uploads_path: default_uploads_path(),
            timestamps_path: default_timestamps_path(),
            total_files: default_total_files(),
            degree: default_degree(),
            root_policy: RootPolicy::default(),
            plot_dir: default_plot_dir(),
        }
    }
}

impl Config {
    /// Load from the user config directory, falling back to defaults when no
    /// file exists there.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("upload-eta")
            .join("config.toml")
    }

    /// Clamp values a hand-edited file may have pushed out of range.
    pub fn validate(&mut self) {
        self.degree = self.degree.clamp(1, MAX_DEGREE);
    }
}
