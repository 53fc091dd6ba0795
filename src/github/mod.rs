//! GitHub Actions API access.
//!
//! The retention job only depends on the two traits defined here:
//! - [`RunSource`] lists a repository's workflow runs as a lazy stream
//! - [`DeletionSink`] deletes a batch of runs and reports which succeeded
//!
//! [`GitHubClient`] implements both against the GitHub REST API.

mod client;
mod error;
pub mod retry;

use async_trait::async_trait;
pub use client::GitHubClient;
pub use error::{GitHubError, GitHubResult};
use futures::stream::BoxStream;

use crate::models::{RunId, WorkflowRun};

/// A lazy, single-use stream of workflow runs, most recent first.
pub type RunStream<'a> = BoxStream<'a, GitHubResult<WorkflowRun>>;

/// Produces every workflow run of a repository.
///
/// Implementations may page internally; consumers see one logical sequence
/// and can filter it with `TryStreamExt::try_filter` before collecting.
pub trait RunSource: Send + Sync {
    fn list_workflow_runs(&self) -> RunStream<'_>;
}

/// Deletes workflow runs.
#[async_trait]
pub trait DeletionSink: Send + Sync {
    /// Attempt to delete every run in `runs`.
    ///
    /// Returns the ids that were deleted. Failures for individual runs are
    /// logged and reflected by omission, not returned as errors.
    async fn delete_runs(&self, runs: &[WorkflowRun]) -> GitHubResult<Vec<RunId>>;
}
