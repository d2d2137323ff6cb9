use std::path::PathBuf;
use thiserror::Error;

use crate::config::CONFIG_FILE;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Config file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("Analysis error: {0}")]
    Analyzer(#[from] sqlguard_core::analyzer::error::AnalyzerError),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0} queries have blocking issues")]
    ChecksFailed(usize),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

impl RunnerError {
    /// Message for terminal output. Analyzer errors carry their own suggestion.
    pub fn report(&self) -> String {
        match self {
            Self::Analyzer(err) => err.report(),
            Self::ConfigNotFound(dir) => format!(
                "No {} found in {} or its parent directories\n\
                     Suggestion: Run 'sqlguard init' to create a new config file.",
                CONFIG_FILE,
                dir.display()
            ),
            Self::ChecksFailed(_) => format!(
                "{}\n\
                     Suggestion: Run 'sqlguard run' to repair what can be repaired.",
                self
            ),
            _ => self.to_string(),
        }
    }
}
