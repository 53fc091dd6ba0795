use std::{path::PathBuf, process::ExitCode};

use chrono::Utc;
use clap::Parser;
use run_retention::{
    config::{Config, ConfigError, LogFormat, RetentionScope},
    github::GitHubClient,
    job::{RetentionRunResult, run_retention},
    observability, report,
};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Delete old GitHub Actions workflow runs",
    long_about = None
)]
struct Args {
    /// Repository owner (user or organization)
    owner: Option<String>,

    /// Repository name
    repo: Option<String>,

    /// Number of old-enough runs to keep, most recent first
    keep_count: Option<u32>,

    /// Minimum age in days before a run may be deleted
    min_age_days: Option<u32>,

    /// Path to a TOML config file; command-line values take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GitHub token with `actions: write` on the repository
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Apply the keep count to each workflow file separately
    #[arg(long)]
    per_workflow: bool,

    /// Log what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Delete at most this many runs per invocation (0 = unlimited)
    #[arg(long)]
    max_deletes: Option<u64>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Args {
    /// Load the config file, if any, and layer command-line values on top.
    fn into_config(self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        let github = &mut config.github;
        if let Some(owner) = self.owner {
            github.owner = owner;
        }
        if let Some(repo) = self.repo {
            github.repo = repo;
        }
        if let Some(token) = self.token {
            github.token = token;
        }
        if let Some(api_url) = self.api_url {
            github.api_url = api_url;
        }

        let retention = &mut config.retention;
        if let Some(keep_count) = self.keep_count {
            retention.keep_count = keep_count;
        }
        if let Some(min_age_days) = self.min_age_days {
            retention.min_age_days = min_age_days;
        }
        if self.per_workflow {
            retention.scope = RetentionScope::PerWorkflow;
        }
        if self.dry_run {
            retention.safety.dry_run = true;
        }
        if let Some(max_deletes) = self.max_deletes {
            retention.safety.max_deletes_per_run = max_deletes;
        }

        if let Some(format) = self.log_format {
            config.logging.format = format;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            report::report_failure(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = observability::init_tracing(&config.logging) {
        eprintln!("Warning: {e}");
    }

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        report::report_failure(&e.to_string());
        return ExitCode::FAILURE;
    }

    match run(&config).await {
        Ok(result) => {
            tracing::info!(
                repository = %config.github.repository(),
                listed = result.listed,
                candidates = result.candidates,
                deleted = result.deleted,
                deferred = result.deferred,
                dry_run = result.dry_run,
                "Retention pass complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(
                repository = %config.github.repository(),
                error = %e,
                "Retention pass failed"
            );
            report::report_failure(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &Config) -> Result<RetentionRunResult, Box<dyn std::error::Error>> {
    let client = GitHubClient::new(&config.github)?;

    tracing::info!(
        repository = %config.github.repository(),
        api_url = %config.github.api_url,
        "Starting workflow run retention"
    );

    let result = run_retention(&client, &client, &config.retention, Utc::now()).await?;
    Ok(result)
}
