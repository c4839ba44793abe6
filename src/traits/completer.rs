//! Completion trait
//!
//! A completer produces the agent's reply to the user's message. The bridge
//! frames whatever it returns; errors are reported to the user as a
//! `copilot_errors` event carrying the error's display text.

use crate::errors::UpstreamError;
use async_trait::async_trait;

/// A finished reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Upstream request id, when the backend reports one.
    pub request_id: Option<String>,
    pub content: String,
}

impl Completion {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            request_id: None,
            content: content.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The backend reported a failure; the message is shown to the user verbatim.
    #[error("{0}")]
    Backend(String),
    #[error("completion response contained no choices")]
    EmptyResponse,
    #[error(transparent)]
    Upstream(UpstreamError),
}

impl From<UpstreamError> for CompletionError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { message, .. } => CompletionError::Backend(message),
            other => CompletionError::Upstream(other),
        }
    }
}

/// Produces the agent's reply for a verified request.
///
/// # Arguments
/// * `message` - The user's latest message
/// * `token` - The user's GitHub token, forwarded to the backend
#[async_trait]
pub trait Completer: std::fmt::Debug + Send + Sync {
    async fn complete(&self, message: &str, token: &str) -> Result<Completion, CompletionError>;
}
