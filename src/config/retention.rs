//! Workflow run retention configuration.
//!
//! # Example
//!
//! ```toml
//! [retention]
//! keep_count = 10
//! min_age_days = 30
//! scope = "per_workflow"
//!
//! [retention.safety]
//! dry_run = false
//! max_deletes_per_run = 1000
//! ```

use serde::{Deserialize, Serialize};

use crate::retention::RetentionPolicy;

/// Retention policy for a repository's workflow runs.
///
/// A run is only ever deleted once it is at least `min_age_days` old. Of the
/// runs that are old enough, the `keep_count` most recent are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionConfig {
    /// Number of most recent old-enough runs to keep.
    /// Applies to the whole repository or to each workflow, see `scope`.
    /// Default: 0 (delete every old-enough run)
    #[serde(default)]
    pub keep_count: u32,

    /// Minimum age, in whole days since the run was last updated, before a
    /// run may be deleted.
    /// Default: 30
    #[serde(default = "default_min_age_days")]
    pub min_age_days: u32,

    /// Whether `keep_count` counts across the repository or per workflow.
    /// Default: flat
    #[serde(default)]
    pub scope: RetentionScope,

    /// Safety settings to prevent accidental data loss.
    #[serde(default)]
    pub safety: RetentionSafety,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            keep_count: 0,
            min_age_days: default_min_age_days(),
            scope: RetentionScope::default(),
            safety: RetentionSafety::default(),
        }
    }
}

fn default_min_age_days() -> u32 {
    30
}

/// What `keep_count` is counted against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionScope {
    /// Keep the `keep_count` most recent old-enough runs of the whole
    /// repository, regardless of which workflow produced them.
    #[default]
    Flat,
    /// Keep the `keep_count` most recent old-enough runs of every workflow
    /// file separately.
    PerWorkflow,
}

impl std::fmt::Display for RetentionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetentionScope::Flat => write!(f, "flat"),
            RetentionScope::PerWorkflow => write!(f, "per_workflow"),
        }
    }
}

/// Safety settings for retention runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetentionSafety {
    /// If true, log what would be deleted without actually deleting.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Maximum number of runs to delete per invocation.
    /// The most recent candidates are deleted first; the remainder is left
    /// for the next invocation.
    /// Set to 0 for unlimited.
    /// Default: 0
    #[serde(default)]
    pub max_deletes_per_run: u64,
}

impl RetentionConfig {
    /// The decision parameters for the retention engine.
    pub fn policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            keep_count: self.keep_count,
            min_age_days: self.min_age_days,
            scope: self.scope,
        }
    }
}

impl RetentionSafety {
    /// The batch cap, or `None` when unlimited.
    pub fn max_deletes(&self) -> Option<usize> {
        match self.max_deletes_per_run {
            0 => None,
            n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }
}
