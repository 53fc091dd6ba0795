//! Retention policy for GitHub Actions workflow runs.
//!
//! Lists every workflow run of a repository, keeps the most recent ones, and
//! deletes the rest once they are old enough. Meant to run as a one-shot job,
//! typically on a schedule.

pub mod config;
pub mod github;
pub mod job;
pub mod models;
pub mod observability;
pub mod report;
pub mod retention;
pub mod time;

#[cfg(test)]
mod tests;
