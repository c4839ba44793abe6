//! Request verification trait
//!
//! Every request from the Copilot platform is signed. A verifier decides
//! whether the signature matches the body and, if so, decodes the payload.

use crate::errors::UpstreamError;
use crate::payload::CopilotPayload;
use async_trait::async_trait;

/// Outcome of verifying an inbound request.
#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    /// The signature matched; carries the decoded payload.
    Valid(CopilotPayload),
    /// The signature was missing, malformed, made with an unknown key or did not match.
    Invalid,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid(_))
    }
}

/// Failures that prevented a verdict from being reached.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("failed to fetch verification keys: {0}")]
    KeyFetch(#[from] UpstreamError),
    #[error("verified request body is not a valid payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),
}

/// Checks the authenticity of a request from the Copilot platform.
///
/// All arguments come straight from the request. Missing headers arrive as
/// empty strings; implementations are expected to report those as
/// [`Verification::Invalid`] rather than fail.
///
/// # Arguments
/// * `body` - The raw request body bytes, exactly as received
/// * `signature` - Value of the `github-public-key-signature` header
/// * `key_id` - Value of the `github-public-key-identifier` header
/// * `token` - Value of the `X-Github-Token` header, used to authenticate key lookups
#[async_trait]
pub trait RequestVerifier: std::fmt::Debug + Send + Sync {
    async fn verify(
        &self,
        body: &[u8],
        signature: &str,
        key_id: &str,
        token: &str,
    ) -> Result<Verification, VerifyError>;
}
