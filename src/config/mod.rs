//! Configuration for the retention job.
//!
//! The job is configured via an optional TOML file, with support for
//! environment variable interpolation using `${VAR_NAME}` syntax. Command-line
//! arguments are applied on top of the file before validation.
//!
//! # Example
//!
//! ```toml
//! [github]
//! token = "${GITHUB_TOKEN}"
//! owner = "acme"
//! repo = "widgets"
//!
//! [retention]
//! keep_count = 10
//! min_age_days = 30
//! ```

mod github;
mod observability;
mod retention;
mod retry;

use std::path::Path;

pub use github::*;
pub use observability::*;
pub use retention::*;
pub use retry::*;
use serde::{Deserialize, Serialize};

/// Root configuration for the retention job.
///
/// All sections are optional with defaults, so a config file is only needed
/// for settings the command line does not cover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// GitHub API connection and target repository.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Retention policy applied to the repository's workflow runs.
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Log output configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    ///
    /// The result is not validated: callers apply command-line overrides
    /// first and then call [`Config::validate`].
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: Config = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.github.validate()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR}` references, ignoring anything after a `#` on the line.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("static regex is valid");
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            result.push_str(&value);

            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}
