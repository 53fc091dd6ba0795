use std::{
    collections::HashSet,
    sync::atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, future, stream};
use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Deserialize;
use url::Url;

use super::{
    DeletionSink, GitHubError, GitHubResult, RunSource, RunStream, retry::with_retry,
};
use crate::{
    config::{GitHubConfig, RetryConfig},
    models::{RunId, WorkflowRun},
};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION_HEADER: &str = "x-github-api-version";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// One page of `GET /repos/{owner}/{repo}/actions/runs`.
#[derive(Debug, Deserialize)]
struct RunsPage {
    total_count: u64,
    workflow_runs: Vec<WorkflowRun>,
}

/// GitHub REST client scoped to a single repository.
pub struct GitHubClient {
    http: Client,
    runs_url: Url,
    per_page: u32,
    delete_concurrency: usize,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Build a client from validated configuration.
    ///
    /// Every request carries the configured timeout, the bearer token and
    /// the API version headers.
    pub fn new(config: &GitHubConfig) -> GitHubResult<Self> {
        let runs_url = runs_url(&config.api_url, &config.owner, &config.repo)?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| GitHubError::InvalidToken("contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            GITHUB_API_VERSION_HEADER,
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        let http = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            runs_url,
            per_page: config.per_page.max(1),
            delete_concurrency: config.delete_concurrency.max(1),
            retry: config.retry.clone(),
        })
    }

    async fn fetch_page(&self, page: u32) -> GitHubResult<RunsPage> {
        let response = with_retry(&self.retry, "list_workflow_runs", || {
            self.http
                .get(self.runs_url.clone())
                .query(&[("per_page", self.per_page), ("page", page)])
                .send()
        })
        .await?;

        let response = ensure_success(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| GitHubError::Decode(e.to_string()))
    }

    /// Delete one run.
    ///
    /// A 404 after a retried attempt means an earlier attempt went through
    /// even though its response was lost, so it counts as deleted.
    async fn delete_run(&self, id: RunId) -> GitHubResult<()> {
        let url = self.run_url(id)?;
        let attempts = AtomicU32::new(0);
        let response = with_retry(&self.retry, "delete_workflow_run", || {
            attempts.fetch_add(1, Ordering::Relaxed);
            self.http.delete(url.clone()).send()
        })
        .await?;

        if response.status() == StatusCode::NOT_FOUND && attempts.load(Ordering::Relaxed) > 1 {
            tracing::debug!(run_id = id, "Run already gone after retry");
            return Ok(());
        }

        ensure_success(response).await?;
        Ok(())
    }

    fn run_url(&self, id: RunId) -> GitHubResult<Url> {
        let mut url = self.runs_url.clone();
        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidUrl(self.runs_url.to_string()))?
            .push(&id.to_string());
        Ok(url)
    }
}

/// `{api_url}/repos/{owner}/{repo}/actions/runs`, keeping any path prefix
/// of `api_url` (GitHub Enterprise Server uses `/api/v3`).
fn runs_url(api_url: &str, owner: &str, repo: &str) -> GitHubResult<Url> {
    let mut url =
        Url::parse(api_url).map_err(|e| GitHubError::InvalidUrl(format!("{api_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| GitHubError::InvalidUrl(api_url.to_string()))?
        .pop_if_empty()
        .extend(["repos", owner, repo, "actions", "runs"]);
    Ok(url)
}

async fn ensure_success(response: Response) -> GitHubResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GitHubError::from_response(status, &body))
}

/// Paging cursor for [`RunSource::list_workflow_runs`].
struct PageCursor {
    page: u32,
    seen: u64,
}

impl RunSource for GitHubClient {
    /// Page through the runs, newest first.
    ///
    /// Pages are addressed by number, so a run created mid-listing shifts
    /// the last run of one page onto the next. Repeated ids are dropped.
    fn list_workflow_runs(&self) -> RunStream<'_> {
        let first = Some(PageCursor { page: 1, seen: 0 });
        let mut yielded = HashSet::new();

        stream::try_unfold(first, move |cursor| async move {
            let Some(cursor) = cursor else {
                return Ok::<_, GitHubError>(None);
            };

            let page = self.fetch_page(cursor.page).await?;
            let received = page.workflow_runs.len() as u64;
            let seen = cursor.seen + received;

            tracing::debug!(
                page = cursor.page,
                received = received,
                seen = seen,
                total_count = page.total_count,
                "Fetched workflow runs page"
            );

            let exhausted = received == 0
                || received < u64::from(self.per_page)
                || seen >= page.total_count;
            let next = if exhausted {
                None
            } else {
                Some(PageCursor {
                    page: cursor.page + 1,
                    seen,
                })
            };

            let runs = stream::iter(
                page.workflow_runs
                    .into_iter()
                    .map(Ok::<WorkflowRun, GitHubError>),
            );
            Ok(Some((runs, next)))
        })
        .try_flatten()
        .try_filter(move |run| future::ready(yielded.insert(run.id)))
        .boxed()
    }
}

#[async_trait]
impl DeletionSink for GitHubClient {
    async fn delete_runs(&self, runs: &[WorkflowRun]) -> GitHubResult<Vec<RunId>> {
        let ids: Vec<RunId> = runs.iter().map(|run| run.id).collect();
        let results: Vec<(RunId, GitHubResult<()>)> = stream::iter(ids)
            .map(|id| async move { (id, self.delete_run(id).await) })
            .buffered(self.delete_concurrency)
            .collect()
            .await;

        let mut deleted = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(()) => {
                    tracing::debug!(run_id = id, "Deleted workflow run");
                    deleted.push(id);
                }
                Err(e) => {
                    tracing::warn!(run_id = id, error = %e, "Failed to delete workflow run");
                }
            }
        }

        Ok(deleted)
    }
}
