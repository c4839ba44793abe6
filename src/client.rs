//! HTTP client abstraction for calls to upstream services
//!
//! The verifier and the completers talk to GitHub through this trait, so a
//! mock client can stand in for the network in tests.
use crate::errors::UpstreamError;
use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Upper bound on upstream response bodies we are willing to buffer.
const MAX_UPSTREAM_BODY_BYTES: usize = 16 * 1024 * 1024;

/// User agent sent on every outbound request. GitHub rejects requests without one.
pub const USER_AGENT: &str = concat!("copilot-bridge/", env!("CARGO_PKG_VERSION"));

pub type HyperClient = Client<
    hyper_tls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
    axum::body::Body,
>;

#[async_trait]
pub trait HttpClient: std::fmt::Debug + Send + Sync {
    async fn request(
        &self,
        req: axum::extract::Request,
    ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait]
impl HttpClient for HyperClient {
    async fn request(
        &self,
        req: axum::extract::Request,
    ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
        self.request(req)
            .await
            .map(|res| res.into_response())
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)
    }
}

pub fn create_hyper_client(
    pool_idle_timeout: Duration,
    pool_max_idle_per_host: usize,
) -> HyperClient {
    let https = hyper_tls::HttpsConnector::new();

    tracing::debug!(
        "HTTP client pool config: idle_timeout={}s, max_idle_per_host={}",
        pool_idle_timeout.as_secs(),
        pool_max_idle_per_host
    );

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(pool_idle_timeout)
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_timer(hyper_util::rt::TokioTimer::new())
        .build(https)
}

/// Sends `req`, requires a 2xx status and decodes the body as JSON.
///
/// Returns the response headers alongside the decoded body.
pub async fn send_json<C, T>(
    client: &C,
    req: axum::extract::Request,
) -> Result<(HeaderMap, T), UpstreamError>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let response = client
        .request(req)
        .await
        .map_err(UpstreamError::Transport)?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), MAX_UPSTREAM_BODY_BYTES).await?;

    if !status.is_success() {
        return Err(UpstreamError::Status {
            status,
            message: upstream_error_message(&body),
        });
    }

    Ok((headers, serde_json::from_slice(&body)?))
}

/// Pulls a human readable message out of an upstream error body.
///
/// OpenAI-style bodies carry `{"error": {"message": ..}}`, the GitHub API
/// uses `{"message": ..}`. Anything else is returned as text.
fn upstream_error_message(body: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(|m| m.as_str());
        if let Some(message) = message {
            return message.to_owned();
        }
    }
    String::from_utf8_lossy(body).trim().to_owned()
}
