use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, RunnerError};
use sqlguard_core::analyzer::repair::DEFAULT_LIMIT;

pub const CONFIG_FILE: &str = "sqlguard.toml";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: String,
    pub schema: SchemaConfig,
    #[serde(default)]
    pub queries: QueriesConfig,
    #[serde(default)]
    pub repair: RepairConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct SchemaConfig {
    /// A `.sql` DDL file, a `.json` snapshot, or a directory of either
    pub path: PathBuf,
    /// Seconds a loaded catalog stays fresh
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueriesConfig {
    pub path: Option<PathBuf>,
    pub src: Option<Vec<PathBuf>>,
}

#[derive(Debug, Deserialize)]
pub struct RepairConfig {
    pub limit: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

fn default_ttl() -> u64 {
    60
}

impl SchemaConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    pub fn find_and_load(start_dir: &Path) -> Result<(Self, PathBuf)> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::load(&config_path)?;
                return Ok((config, current_dir));
            }

            if !current_dir.pop() {
                return Err(RunnerError::ConfigNotFound(start_dir.to_path_buf()));
            }
        }
    }

    /// Loads and validates a config file. Relative paths are resolved
    /// against the directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        resolve(&mut self.schema.path);
        if let Some(path) = self.queries.path.as_mut() {
            resolve(path);
        }
        for path in self.queries.src.iter_mut().flatten() {
            resolve(path);
        }
        resolve(&mut self.output.path);
    }

    fn validate(&self) -> Result<()> {
        if !self.schema.path.exists() {
            return Err(RunnerError::InvalidPath(self.schema.path.clone()));
        }

        if let Some(path) = &self.queries.path {
            if !path.exists() {
                return Err(RunnerError::InvalidPath(path.clone()));
            }
        }

        if let Some(src_paths) = &self.queries.src {
            for path in src_paths {
                if !path.exists() {
                    return Err(RunnerError::InvalidPath(path.clone()));
                }
            }
        }

        if let Some(parent) = self.output.path.parent() {
            if !parent.exists() {
                return Err(RunnerError::InvalidPath(parent.to_path_buf()));
            }
        }

        Ok(())
    }

    /// Every directory or file a watcher should observe.
    pub fn watched_paths(&self) -> Vec<&Path> {
        let mut paths = vec![self.schema.path.as_path()];
        paths.extend(self.queries.path.as_deref());
        paths.extend(self.queries.src.iter().flatten().map(PathBuf::as_path));
        paths
    }
}
