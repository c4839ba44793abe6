use axum::http::StatusCode;

/// Failures talking to an upstream HTTP service (GitHub API, completions endpoint).
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("upstream request failed: {0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    #[error("failed to read upstream response body: {0}")]
    Body(#[from] axum::Error),
    #[error("upstream returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
}
