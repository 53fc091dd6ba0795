//! Retention decisions for workflow runs.
//!
//! Given every run of a repository, the engine:
//! 1. Drops runs that are younger than the minimum age
//! 2. Orders the remaining runs most recent first
//! 3. Keeps the `keep_count` most recent runs, either across the whole
//!    repository or per workflow file
//! 4. Returns everything else as deletion candidates
//!
//! The engine is pure: it never performs I/O and takes `now` as an argument.
//! Fetching runs and deleting them is done by [`crate::job`].

mod engine;

pub use engine::{RetentionDecision, RetentionPolicy, WorkflowSummary, group_by_path};
