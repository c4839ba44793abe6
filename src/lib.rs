//! copilot-bridge - a webhook bridge for Copilot agent extensions
//!
//! This library receives signed requests from the Copilot platform, verifies them,
//! answers the user's message through a completion backend and frames the reply as
//! Copilot events.

use axum::Router;
use axum::routing::get;
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use bon::Builder;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub mod client;
pub mod completion;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod payload;
pub mod traits;
pub mod verify;

use client::HttpClient;
use completion::{CopilotCompletion, GreetingResponder, ResponseMode};
use handlers::{agent_message_handler, welcome};
use traits::{Completer, RequestVerifier};
use verify::GitHubKeyVerifier;

/// Settings for the default GitHub-backed verifier and completers.
#[derive(Debug, Clone, Builder)]
pub struct BridgeOptions {
    #[builder(default)]
    pub mode: ResponseMode,
    #[builder(default = completion::DEFAULT_MODEL.to_string(), into)]
    pub model: String,
    /// Chat completions endpoint used in [`ResponseMode::Completion`].
    pub completions_url: Url,
    /// Base of the GitHub REST API. Must end in `/`.
    pub github_api_url: Url,
    #[builder(default = Duration::from_secs(90))]
    pub pool_idle_timeout: Duration,
    #[builder(default = 100)]
    pub pool_max_idle_per_host: usize,
}

/// The application state: the two capabilities every request goes through
#[derive(Clone, Debug)]
pub struct AppState {
    pub verifier: Arc<dyn RequestVerifier>,
    pub completer: Arc<dyn Completer>,
}

impl AppState {
    /// Create a new AppState from explicit capabilities (useful for testing)
    pub fn new(verifier: Arc<dyn RequestVerifier>, completer: Arc<dyn Completer>) -> Self {
        Self {
            verifier,
            completer,
        }
    }

    /// Create an AppState backed by GitHub, sharing one Hyper client between
    /// verification and completion
    pub fn from_options(options: &BridgeOptions) -> Self {
        let http_client = client::create_hyper_client(
            options.pool_idle_timeout,
            options.pool_max_idle_per_host,
        );
        Self::with_client(options, http_client)
    }

    /// Create an AppState backed by GitHub with a custom HTTP client
    pub fn with_client<T: HttpClient + Clone + 'static>(
        options: &BridgeOptions,
        http_client: T,
    ) -> Self {
        let verifier = Arc::new(GitHubKeyVerifier::new(
            http_client.clone(),
            options.github_api_url.clone(),
        ));
        let completer: Arc<dyn Completer> = match options.mode {
            ResponseMode::Completion => Arc::new(CopilotCompletion::new(
                http_client,
                options.completions_url.clone(),
                options.model.clone(),
            )),
            ResponseMode::Greeting => Arc::new(GreetingResponder::new(
                http_client,
                options.github_api_url.clone(),
            )),
        };
        info!("Answering requests in {:?} mode", options.mode);
        Self::new(verifier, completer)
    }
}

/// Build the main router for the bridge
/// This creates routes for:
/// - `GET /` - Static welcome message
/// - `POST /` - The Copilot agent endpoint
#[instrument(skip(state))]
pub fn build_router(state: AppState) -> Router {
    info!("Building router");
    Router::new()
        .route("/", get(welcome).post(agent_message_handler))
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// # Parameters
/// - `prefix`: A string prefix for the metrics, either a string literal or an owned string.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}
