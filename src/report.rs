//! Failure reporting for the process outcome.
//!
//! Inside GitHub Actions a failure is also emitted as an `::error::` workflow
//! command so it shows up as an annotation on the run.

/// Whether the process is running as a GitHub Actions step.
pub fn running_in_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true")
}

/// Format `message` as an Actions `::error::` workflow command.
pub fn error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}

/// Surface a fatal error where the invoking environment will see it.
pub fn report_failure(message: &str) {
    if running_in_actions() {
        println!("{}", error_annotation(message));
    } else {
        eprintln!("Error: {message}");
    }
}
