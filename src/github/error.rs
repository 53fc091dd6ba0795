use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("GitHub rejected the credentials ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("GitHub API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode GitHub response: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Error body returned by the GitHub REST API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GitHubError {
    /// Build an error from a non-success response status and body.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    trimmed.to_string()
                }
            });

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GitHubError::Unauthorized {
                status: status.as_u16(),
                message,
            },
            StatusCode::NOT_FOUND => GitHubError::NotFound(message),
            _ => GitHubError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }
}

pub type GitHubResult<T> = Result<T, GitHubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_extracted() {
        let err = GitHubError::from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"message":"Bad credentials","documentation_url":"https://docs.github.com/rest"}"#,
        );
        assert!(matches!(err, GitHubError::Unauthorized { status: 401, .. }));
        assert_eq!(
            err.to_string(),
            "GitHub rejected the credentials (401): Bad credentials"
        );
    }

    #[test]
    fn test_not_found() {
        let err = GitHubError::from_response(StatusCode::NOT_FOUND, r#"{"message":"Not Found"}"#);
        assert!(matches!(err, GitHubError::NotFound(ref m) if m == "Not Found"));
    }

    #[test]
    fn test_plain_text_body() {
        let err = GitHubError::from_response(StatusCode::BAD_GATEWAY, "upstream exploded\n");
        assert_eq!(err.to_string(), "GitHub API error (502): upstream exploded");
    }

    #[test]
    fn test_empty_body_uses_reason() {
        let err = GitHubError::from_response(StatusCode::CONFLICT, "");
        assert_eq!(err.to_string(), "GitHub API error (409): Conflict");
    }
}
