//! Workflow run records as returned by the GitHub Actions API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GitHub's numeric workflow run identifier.
pub type RunId = u64;

/// A single workflow run.
///
/// Only `id`, `path` and `updated_at` take part in retention decisions; the
/// remaining fields are carried for log output. Unknown fields in the API
/// payload are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Unique run identifier, used for the delete call.
    pub id: RunId,

    /// Path of the workflow file that defines this run
    /// (e.g. `.github/workflows/ci.yml`). Runs are grouped by this value.
    pub path: String,

    /// When the run last changed state.
    pub updated_at: DateTime<Utc>,

    /// Workflow display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Run status (`completed`, `in_progress`, ...).
    #[serde(default)]
    pub status: Option<String>,

    /// Per-workflow run counter.
    #[serde(default)]
    pub run_number: Option<u64>,
}

impl WorkflowRun {
    pub fn new(id: RunId, path: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            path: path.into(),
            updated_at,
            name: None,
            status: None,
            run_number: None,
        }
    }
}
