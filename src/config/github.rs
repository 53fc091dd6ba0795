use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ConfigError, RetryConfig};

/// GitHub API connection settings and the repository to clean up.
///
/// `owner`, `repo` and `token` are usually supplied on the command line (or
/// through `${GITHUB_TOKEN}` expansion), so they default to empty and are only
/// checked by [`GitHubConfig::validate`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubConfig {
    /// Base URL of the REST API. Override for GitHub Enterprise Server.
    /// Default: `https://api.github.com`
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Token used for both listing and deleting runs.
    /// Needs `actions: write` on the target repository.
    #[serde(default)]
    pub token: String,

    /// Repository owner (user or organization).
    #[serde(default)]
    pub owner: String,

    /// Repository name.
    #[serde(default)]
    pub repo: String,

    /// Runs requested per listing page (GitHub caps this at 100).
    /// Default: 100
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Timeout applied to every individual HTTP request, in seconds.
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of DELETE requests in flight at once.
    /// Default: 4
    #[serde(default = "default_delete_concurrency")]
    pub delete_concurrency: usize,

    /// Retry behavior for rate limits and transient server errors.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: String::new(),
            owner: String::new(),
            repo: String::new(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
            delete_concurrency: default_delete_concurrency(),
            retry: RetryConfig::default(),
        }
    }
}

// Keep the token out of debug output.
impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("token", &if self.token.is_empty() { "" } else { "****" })
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("per_page", &self.per_page)
            .field("timeout_secs", &self.timeout_secs)
            .field("delete_concurrency", &self.delete_concurrency)
            .field("retry", &self.retry)
            .finish()
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_delete_concurrency() -> usize {
    4
}

/// Largest page size the GitHub REST API accepts.
const MAX_PER_PAGE: u32 = 100;

impl GitHubConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(ConfigError::Validation(
                "A repository is required: pass OWNER and REPO or set github.owner and github.repo"
                    .into(),
            ));
        }

        if self.token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "A GitHub token is required: pass --token, set GITHUB_TOKEN, or set github.token"
                    .into(),
            ));
        }

        url::Url::parse(&self.api_url).map_err(|e| {
            ConfigError::Validation(format!("github.api_url '{}' is invalid: {e}", self.api_url))
        })?;

        if self.per_page == 0 || self.per_page > MAX_PER_PAGE {
            return Err(ConfigError::Validation(format!(
                "github.per_page must be between 1 and {MAX_PER_PAGE}, got {}",
                self.per_page
            )));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "github.timeout_secs must be at least 1".into(),
            ));
        }

        if self.delete_concurrency == 0 {
            return Err(ConfigError::Validation(
                "github.delete_concurrency must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    /// `owner/repo`, for logging.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
