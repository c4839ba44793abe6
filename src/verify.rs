//! Signature verification against GitHub's published Copilot keys
//!
//! The Copilot platform signs each request body with ECDSA P-256 / SHA-256.
//! The signature arrives base64-encoded (DER) in `github-public-key-signature`,
//! and `github-public-key-identifier` names the key used. Public keys are
//! listed at `{github_api_url}/meta/public_keys/copilot_api` and cached here
//! by identifier; the list is re-fetched when an unknown identifier shows up, at
//! most once per refresh cooldown.
use crate::client::{HttpClient, USER_AGENT, send_json};
use crate::errors::UpstreamError;
use crate::payload::CopilotPayload;
use crate::traits::{RequestVerifier, Verification, VerifyError};
use async_trait::async_trait;
use axum::http::header;
use base64::{Engine as _, prelude::BASE64_STANDARD};
use dashmap::DashMap;
use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier as _};
use p256::pkcs8::DecodePublicKey as _;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};
use url::Url;

const KEYS_PATH: &str = "meta/public_keys/copilot_api";

/// Minimum time between two key list fetches triggered by unknown identifiers.
pub const DEFAULT_REFRESH_COOLDOWN: Duration = Duration::from_secs(60);

/// Response of the GitHub meta keys endpoint.
#[derive(Debug, Clone, Deserialize)]
struct PublicKeys {
    public_keys: Vec<PublicKey>,
}

#[derive(Debug, Clone, Deserialize)]
struct PublicKey {
    key_identifier: String,
    /// PEM encoded SubjectPublicKeyInfo.
    key: String,
    #[serde(default)]
    is_current: bool,
}

/// Verifies requests using the keys GitHub publishes for Copilot extensions.
#[derive(Debug, Clone)]
pub struct GitHubKeyVerifier<C: HttpClient> {
    http_client: C,
    github_api_url: Url,
    keys: Arc<DashMap<String, VerifyingKey>>,
    last_refresh: Arc<Mutex<Option<Instant>>>,
    refresh_cooldown: Duration,
}

impl<C: HttpClient> GitHubKeyVerifier<C> {
    pub fn new(http_client: C, github_api_url: Url) -> Self {
        Self {
            http_client,
            github_api_url,
            keys: Arc::new(DashMap::new()),
            last_refresh: Arc::new(Mutex::new(None)),
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
        }
    }

    pub fn with_refresh_cooldown(mut self, refresh_cooldown: Duration) -> Self {
        self.refresh_cooldown = refresh_cooldown;
        self
    }

    /// Number of keys currently cached.
    pub fn cached_keys(&self) -> usize {
        self.keys.len()
    }

    /// Looks up `key_id`, refreshing the key list from GitHub on a miss unless
    /// a refresh already happened within the cooldown.
    async fn key(&self, key_id: &str, token: &str) -> Result<Option<VerifyingKey>, UpstreamError> {
        if let Some(key) = self.keys.get(key_id) {
            return Ok(Some(key.value().clone()));
        }

        {
            let mut last_refresh = self.last_refresh.lock().await;
            if let Some(at) = *last_refresh
                && at.elapsed() < self.refresh_cooldown
            {
                debug!("Key list refreshed recently, not fetching again");
                return Ok(None);
            }
            // Stamped before fetching so a failing endpoint is not retried on every request.
            *last_refresh = Some(Instant::now());
        }

        self.refresh_keys(token).await?;
        Ok(self.keys.get(key_id).map(|key| key.value().clone()))
    }

    #[instrument(skip(self, token))]
    async fn refresh_keys(&self, token: &str) -> Result<(), UpstreamError> {
        let url = self.github_api_url.join(KEYS_PATH)?;
        debug!("Fetching verification keys from {}", url);

        let mut builder = axum::http::Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT);
        if !token.is_empty() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = builder.body(axum::body::Body::empty())?;

        let (_, keys): (_, PublicKeys) = send_json(&self.http_client, req).await?;
        for entry in keys.public_keys {
            match VerifyingKey::from_public_key_pem(&entry.key) {
                Ok(key) => {
                    debug!(
                        key_id = %entry.key_identifier,
                        is_current = entry.is_current,
                        "Caching verification key"
                    );
                    self.keys.insert(entry.key_identifier, key);
                }
                Err(e) => warn!(
                    key_id = %entry.key_identifier,
                    "Skipping unparseable verification key: {}", e
                ),
            }
        }
        Ok(())
    }
}

/// Checks a base64 DER signature over `body`.
fn signature_matches(key: &VerifyingKey, body: &[u8], signature: &str) -> bool {
    let Ok(der) = BASE64_STANDARD.decode(signature.trim()) else {
        debug!("Signature is not valid base64");
        return false;
    };
    let Ok(signature) = Signature::from_der(&der) else {
        debug!("Signature is not a DER encoded ECDSA signature");
        return false;
    };
    key.verify(body, &signature).is_ok()
}

#[async_trait]
impl<C: HttpClient> RequestVerifier for GitHubKeyVerifier<C> {
    #[instrument(skip_all, fields(key_id = %key_id))]
    async fn verify(
        &self,
        body: &[u8],
        signature: &str,
        key_id: &str,
        token: &str,
    ) -> Result<Verification, VerifyError> {
        if signature.is_empty() || key_id.is_empty() {
            debug!("Missing signature or key identifier");
            return Ok(Verification::Invalid);
        }

        let Some(key) = self.key(key_id, token).await? else {
            debug!("No published key with this identifier");
            return Ok(Verification::Invalid);
        };

        if !signature_matches(&key, body, signature) {
            return Ok(Verification::Invalid);
        }

        let payload: CopilotPayload =
            serde_json::from_slice(body).map_err(VerifyError::MalformedPayload)?;
        Ok(Verification::Valid(payload))
    }
}
