use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::{
    config::RetentionScope,
    models::{RunId, WorkflowRun},
    time,
};

/// Decision parameters for a retention pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Most recent old-enough runs to keep (globally or per workflow).
    pub keep_count: u32,
    /// Whole days since last update before a run may be deleted.
    pub min_age_days: u32,
    /// What `keep_count` is counted against.
    pub scope: RetentionScope,
}

/// Per-workflow breakdown of a decision, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub path: String,
    /// Old-enough runs of this workflow.
    pub eligible: usize,
    /// Old-enough runs that survive.
    pub kept: usize,
    /// Runs selected for deletion.
    pub deleted: usize,
}

/// The outcome of applying a [`RetentionPolicy`] to a set of runs.
#[derive(Debug, Clone, Default)]
pub struct RetentionDecision {
    /// Runs to delete, most recent first.
    pub to_delete: Vec<WorkflowRun>,
    /// Number of runs that met the age threshold.
    pub eligible: usize,
    /// Number of old-enough runs kept by the count rule.
    pub kept: usize,
    /// Breakdown per workflow path, in order of first appearance.
    pub workflows: Vec<WorkflowSummary>,
}

impl RetentionDecision {
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty()
    }

    pub fn run_ids(&self) -> Vec<RunId> {
        self.to_delete.iter().map(|run| run.id).collect()
    }
}

impl RetentionPolicy {
    /// Whether `run` is old enough to be considered for deletion at `now`.
    ///
    /// Runs dated in the future count as zero days old.
    pub fn is_age_eligible(&self, run: &WorkflowRun, now: DateTime<Utc>) -> bool {
        time::elapsed_days(run.updated_at, now) >= u64::from(self.min_age_days)
    }

    /// Select the runs to delete.
    ///
    /// `runs` may arrive in any order and may already be age-filtered; the
    /// age check is idempotent. A repeated id is dropped, keeping its first
    /// occurrence. Eligible runs are stable-sorted by
    /// `updated_at` descending before the count rule is applied, so runs
    /// with equal timestamps keep their input order.
    pub fn decide<I>(&self, runs: I, now: DateTime<Utc>) -> RetentionDecision
    where
        I: IntoIterator<Item = WorkflowRun>,
    {
        let mut seen = HashSet::new();
        let mut eligible: Vec<WorkflowRun> = runs
            .into_iter()
            .filter(|run| seen.insert(run.id) && self.is_age_eligible(run, now))
            .collect();
        eligible.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let keep = usize::try_from(self.keep_count).unwrap_or(usize::MAX);
        let groups = group_by_path(&eligible);

        let kept_ids: HashSet<RunId> = match self.scope {
            RetentionScope::Flat => eligible.iter().take(keep).map(|run| run.id).collect(),
            RetentionScope::PerWorkflow => groups
                .iter()
                .flat_map(|(_, runs)| runs.iter().take(keep).map(|run| run.id))
                .collect(),
        };

        let workflows = groups
            .iter()
            .map(|(path, runs)| {
                let kept = runs.iter().filter(|run| kept_ids.contains(&run.id)).count();
                WorkflowSummary {
                    path: (*path).to_string(),
                    eligible: runs.len(),
                    kept,
                    deleted: runs.len() - kept,
                }
            })
            .collect();

        let eligible_count = eligible.len();
        let to_delete: Vec<WorkflowRun> = eligible
            .into_iter()
            .filter(|run| !kept_ids.contains(&run.id))
            .collect();

        RetentionDecision {
            eligible: eligible_count,
            kept: eligible_count - to_delete.len(),
            to_delete,
            workflows,
        }
    }
}

/// Group runs by workflow path.
///
/// Groups are returned in order of each path's first appearance; runs inside
/// a group keep their relative input order.
pub fn group_by_path(runs: &[WorkflowRun]) -> Vec<(&str, Vec<&WorkflowRun>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<&WorkflowRun>)> = Vec::new();

    for run in runs {
        let slot = *index.entry(run.path.as_str()).or_insert_with(|| {
            groups.push((run.path.as_str(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(run);
    }

    groups
}
