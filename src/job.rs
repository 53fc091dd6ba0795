//! One retention pass over a repository.
//!
//! The pass:
//! 1. Streams every workflow run from the [`RunSource`], dropping runs that
//!    are too young as pages arrive
//! 2. Asks the retention engine which of the remaining runs to delete
//! 3. Hands the whole batch to the [`DeletionSink`] in one call
//! 4. Fails if a non-empty batch produced no deletions at all
//!
//! Nothing here retries; transport retries live in the GitHub client and any
//! other failure aborts the pass.

use chrono::{DateTime, Utc};
use futures::{TryStreamExt, future};
use thiserror::Error;

use crate::{
    config::RetentionConfig,
    github::{DeletionSink, GitHubError, RunSource},
    models::WorkflowRun,
};

/// Results from a single retention pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RetentionRunResult {
    /// Runs returned by the source.
    pub listed: usize,
    /// Runs old enough to be considered.
    pub eligible: usize,
    /// Old-enough runs kept by the count rule.
    pub kept: usize,
    /// Runs selected for deletion.
    pub candidates: usize,
    /// Runs handed to the sink (or that would have been, in dry-run mode).
    pub attempted: usize,
    /// Candidates left for a later pass because of `max_deletes_per_run`.
    pub deferred: usize,
    /// Runs the sink confirmed as deleted.
    pub deleted: usize,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl RetentionRunResult {
    /// Check if any runs were deleted.
    pub fn has_deletions(&self) -> bool {
        self.deleted > 0
    }

    /// Runs that were attempted but not confirmed.
    pub fn failed(&self) -> usize {
        if self.dry_run {
            0
        } else {
            self.attempted.saturating_sub(self.deleted)
        }
    }
}

#[derive(Debug, Error)]
pub enum RetentionError {
    /// The sink accepted a non-empty batch but deleted nothing. Usually a
    /// token without `actions: write` or a wrong repository.
    #[error(
        "The action could not delete any workflows ({attempted} attempted). Please review your parameters."
    )]
    NothingDeleted { attempted: usize },

    #[error(transparent)]
    Source(GitHubError),

    #[error(transparent)]
    Sink(GitHubError),
}

/// Run a single retention pass against `source` and `sink`.
///
/// `now` is the reference instant for run ages.
pub async fn run_retention<S, D>(
    source: &S,
    sink: &D,
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> Result<RetentionRunResult, RetentionError>
where
    S: RunSource + ?Sized,
    D: DeletionSink + ?Sized,
{
    let policy = config.policy();
    let dry_run = config.safety.dry_run;

    tracing::info!(
        keep_count = policy.keep_count,
        min_age_days = policy.min_age_days,
        scope = %policy.scope,
        dry_run = dry_run,
        "Applying workflow run retention"
    );

    let mut listed = 0usize;
    let eligible: Vec<WorkflowRun> = source
        .list_workflow_runs()
        .inspect_ok(|_| listed += 1)
        .try_filter(|run| future::ready(policy.is_age_eligible(run, now)))
        .try_collect()
        .await
        .map_err(RetentionError::Source)?;

    let decision = policy.decide(eligible, now);

    for workflow in &decision.workflows {
        tracing::debug!(
            path = %workflow.path,
            eligible = workflow.eligible,
            kept = workflow.kept,
            deleted = workflow.deleted,
            "Workflow retention"
        );
    }

    let mut result = RetentionRunResult {
        listed,
        eligible: decision.eligible,
        kept: decision.kept,
        candidates: decision.to_delete.len(),
        dry_run,
        ..Default::default()
    };

    tracing::info!(
        count = result.candidates,
        listed = result.listed,
        eligible = result.eligible,
        kept = result.kept,
        "{} workflow runs to be deleted",
        result.candidates
    );

    if decision.is_empty() {
        return Ok(result);
    }

    let batch_len = config
        .safety
        .max_deletes()
        .map_or(decision.to_delete.len(), |max| max.min(decision.to_delete.len()));
    let batch = &decision.to_delete[..batch_len];
    result.attempted = batch.len();
    result.deferred = decision.to_delete.len() - batch.len();

    if result.deferred > 0 {
        tracing::info!(
            deferred = result.deferred,
            max_deletes_per_run = config.safety.max_deletes_per_run,
            "Deletion cap reached, remaining runs left for the next pass"
        );
    }

    if dry_run {
        for run in batch {
            tracing::info!(
                run_id = run.id,
                path = %run.path,
                updated_at = %run.updated_at,
                "DRY RUN: Would delete workflow run"
            );
        }
        return Ok(result);
    }

    let deleted = sink.delete_runs(batch).await.map_err(RetentionError::Sink)?;
    result.deleted = deleted.len();

    if deleted.is_empty() {
        return Err(RetentionError::NothingDeleted {
            attempted: result.attempted,
        });
    }

    if result.failed() > 0 {
        tracing::warn!(
            failed = result.failed(),
            attempted = result.attempted,
            "Some workflow runs could not be deleted"
        );
    }

    tracing::info!(
        count = result.deleted,
        "{} workflow runs successfully deleted",
        result.deleted
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use futures::{StreamExt, stream};

    use super::*;
    use crate::{
        config::{RetentionSafety, RetentionScope},
        github::{GitHubResult, RunStream},
        models::RunId,
    };

    const CI: &str = ".github/workflows/ci.yml";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn run(id: RunId, days_old: i64) -> WorkflowRun {
        WorkflowRun::new(id, CI, now() - Duration::days(days_old))
    }

    struct FakeSource {
        runs: Vec<WorkflowRun>,
        fail_with: Option<fn() -> GitHubError>,
    }

    impl FakeSource {
        fn new(runs: Vec<WorkflowRun>) -> Self {
            Self {
                runs,
                fail_with: None,
            }
        }
    }

    impl RunSource for FakeSource {
        fn list_workflow_runs(&self) -> RunStream<'_> {
            let mut items: Vec<GitHubResult<WorkflowRun>> =
                self.runs.iter().cloned().map(Ok).collect();
            if let Some(make_error) = self.fail_with {
                items.push(Err(make_error()));
            }
            stream::iter(items).boxed()
        }
    }

    /// Confirms every run whose id passes `confirm`, records each batch.
    struct FakeSink {
        confirm: fn(RunId) -> bool,
        batches: Mutex<Vec<Vec<RunId>>>,
    }

    impl FakeSink {
        fn new(confirm: fn(RunId) -> bool) -> Self {
            Self {
                confirm,
                batches: Mutex::new(Vec::new()),
            }
        }

        fn batches(&self) -> Vec<Vec<RunId>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeletionSink for FakeSink {
        async fn delete_runs(&self, runs: &[WorkflowRun]) -> GitHubResult<Vec<RunId>> {
            let ids: Vec<RunId> = runs.iter().map(|r| r.id).collect();
            self.batches.lock().unwrap().push(ids.clone());
            Ok(ids.into_iter().filter(|id| (self.confirm)(*id)).collect())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl DeletionSink for FailingSink {
        async fn delete_runs(&self, _runs: &[WorkflowRun]) -> GitHubResult<Vec<RunId>> {
            Err(GitHubError::Unauthorized {
                status: 401,
                message: "Bad credentials".into(),
            })
        }
    }

    fn config(keep_count: u32, min_age_days: u32) -> RetentionConfig {
        RetentionConfig {
            keep_count,
            min_age_days,
            ..Default::default()
        }
    }

    #[test]
    fn test_failed_with_over_reporting_sink() {
        let result = RetentionRunResult {
            attempted: 2,
            deleted: 3,
            ..Default::default()
        };
        assert_eq!(result.failed(), 0);
    }

    #[tokio::test]
    async fn test_keep_two_of_five_deletes_three_oldest() {
        let source = FakeSource::new((1..=5).map(|id| run(id, 30 + id as i64)).collect());
        let sink = FakeSink::new(|_| true);

        let result = run_retention(&source, &sink, &config(2, 30), now())
            .await
            .unwrap();

        assert_eq!(sink.batches(), vec![vec![3, 4, 5]]);
        assert_eq!(result.listed, 5);
        assert_eq!(result.eligible, 5);
        assert_eq!(result.kept, 2);
        assert_eq!(result.candidates, 3);
        assert_eq!(result.deleted, 3);
        assert_eq!(result.failed(), 0);
        assert!(result.has_deletions());
    }

    #[tokio::test]
    async fn test_young_runs_are_never_sent_to_sink() {
        let source = FakeSource::new(vec![run(1, 10), run(2, 45)]);
        let sink = FakeSink::new(|_| true);

        let result = run_retention(&source, &sink, &config(0, 30), now())
            .await
            .unwrap();

        assert_eq!(sink.batches(), vec![vec![2]]);
        assert_eq!(result.listed, 2);
        assert_eq!(result.eligible, 1);
    }

    #[tokio::test]
    async fn test_nothing_to_delete_skips_sink() {
        let source = FakeSource::new((1..=3).map(|id| run(id, 40)).collect());
        let sink = FakeSink::new(|_| true);

        let result = run_retention(&source, &sink, &config(3, 30), now())
            .await
            .unwrap();

        assert!(sink.batches().is_empty());
        assert_eq!(result.candidates, 0);
        assert_eq!(result.attempted, 0);
        assert!(!result.has_deletions());
    }

    #[tokio::test]
    async fn test_zero_confirmed_deletions_is_fatal() {
        let source = FakeSource::new((1..=4).map(|id| run(id, 40)).collect());
        let sink = FakeSink::new(|_| false);

        let err = run_retention(&source, &sink, &config(1, 30), now())
            .await
            .unwrap_err();

        assert!(matches!(err, RetentionError::NothingDeleted { attempted: 3 }));
        assert!(err.to_string().contains("could not delete any workflows"));
    }

    #[tokio::test]
    async fn test_partial_success_is_not_fatal() {
        let source = FakeSource::new((1..=4).map(|id| run(id, 40 + id as i64)).collect());
        let sink = FakeSink::new(|id| id % 2 == 0);

        let result = run_retention(&source, &sink, &config(0, 30), now())
            .await
            .unwrap();

        assert_eq!(result.attempted, 4);
        assert_eq!(result.deleted, 2);
        assert_eq!(result.failed(), 2);
    }

    #[tokio::test]
    async fn test_source_error_propagates() {
        let source = FakeSource {
            runs: vec![run(1, 40)],
            fail_with: Some(|| GitHubError::NotFound("Not Found".into())),
        };
        let sink = FakeSink::new(|_| true);

        let err = run_retention(&source, &sink, &config(0, 30), now())
            .await
            .unwrap_err();

        assert!(matches!(err, RetentionError::Source(GitHubError::NotFound(_))));
        assert_eq!(err.to_string(), "Not found: Not Found");
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn test_sink_error_propagates() {
        let source = FakeSource::new(vec![run(1, 40)]);

        let err = run_retention(&source, &FailingSink, &config(0, 30), now())
            .await
            .unwrap_err();

        assert!(matches!(err, RetentionError::Sink(GitHubError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_sink() {
        let source = FakeSource::new((1..=3).map(|id| run(id, 40)).collect());
        let sink = FakeSink::new(|_| true);
        let config = RetentionConfig {
            safety: RetentionSafety {
                dry_run: true,
                ..Default::default()
            },
            ..config(0, 30)
        };

        let result = run_retention(&source, &sink, &config, now()).await.unwrap();

        assert!(sink.batches().is_empty());
        assert!(result.dry_run);
        assert_eq!(result.attempted, 3);
        assert_eq!(result.deleted, 0);
        assert_eq!(result.failed(), 0);
    }

    #[tokio::test]
    async fn test_max_deletes_caps_batch() {
        let source = FakeSource::new((1..=6).map(|id| run(id, 30 + id as i64)).collect());
        let sink = FakeSink::new(|_| true);
        let config = RetentionConfig {
            safety: RetentionSafety {
                max_deletes_per_run: 2,
                ..Default::default()
            },
            ..config(1, 30)
        };

        let result = run_retention(&source, &sink, &config, now()).await.unwrap();

        assert_eq!(sink.batches(), vec![vec![2, 3]]);
        assert_eq!(result.candidates, 5);
        assert_eq!(result.attempted, 2);
        assert_eq!(result.deferred, 3);
    }

    #[tokio::test]
    async fn test_per_workflow_scope() {
        let release = ".github/workflows/release.yml";
        let source = FakeSource::new(vec![
            run(1, 31),
            WorkflowRun::new(2, release, now() - Duration::days(32)),
            run(3, 33),
            WorkflowRun::new(4, release, now() - Duration::days(34)),
        ]);
        let sink = FakeSink::new(|_| true);
        let config = RetentionConfig {
            scope: RetentionScope::PerWorkflow,
            ..config(1, 30)
        };

        let result = run_retention(&source, &sink, &config, now()).await.unwrap();

        assert_eq!(sink.batches(), vec![vec![3, 4]]);
        assert_eq!(result.kept, 2);
    }
}
