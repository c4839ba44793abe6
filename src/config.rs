//! Configuration parsing and validation for the bridge
//!
//! This module handles command-line argument parsing and validation using clap.
//! Every option can also be set through a `COPILOT_BRIDGE_*` environment variable.
use anyhow::anyhow;
use clap::Parser;
use copilot_bridge::BridgeOptions;
use copilot_bridge::completion::{DEFAULT_MODEL, ResponseMode};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the bridge will listen.
    #[arg(short = 'p', long, env = "COPILOT_BRIDGE_PORT", default_value_t = 3000)]
    pub port: u16,

    /// How verified requests are answered.
    #[arg(long, env = "COPILOT_BRIDGE_MODE", value_enum, default_value_t = ResponseMode::Completion)]
    pub mode: ResponseMode,

    /// The model requested from the completions endpoint.
    #[arg(long, env = "COPILOT_BRIDGE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// The chat completions endpoint.
    #[arg(
        long,
        env = "COPILOT_BRIDGE_COMPLETIONS_URL",
        default_value = "https://api.githubcopilot.com/chat/completions"
    )]
    pub completions_url: Url,

    /// Base URL of the GitHub REST API, used for verification keys and user lookups.
    #[arg(
        long,
        env = "COPILOT_BRIDGE_GITHUB_API_URL",
        default_value = "https://api.github.com/"
    )]
    pub github_api_url: Url,

    /// Whether to serve Prometheus metrics on a separate port.
    #[arg(short = 'm', long, env = "COPILOT_BRIDGE_METRICS", default_value_t = false)]
    pub metrics: bool,

    /// The port on which the metrics server will listen.
    #[arg(long, env = "COPILOT_BRIDGE_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// The prefix to use for metrics.
    #[arg(long, env = "COPILOT_BRIDGE_METRICS_PREFIX", default_value = "copilot_bridge")]
    pub metrics_prefix: String,

    /// Maximum number of idle HTTP connections to keep alive per upstream host.
    #[arg(long, env = "COPILOT_BRIDGE_POOL_MAX_IDLE_PER_HOST", default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, env = "COPILOT_BRIDGE_POOL_IDLE_TIMEOUT_SECS", default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

impl Config {
    pub fn validate(mut self) -> Result<Self, anyhow::Error> {
        if self.metrics && self.metrics_port == self.port {
            return Err(anyhow!(
                "Metrics port {} clashes with the bridge port",
                self.metrics_port
            ));
        }
        // Url::join drops the last path segment of a base without a trailing slash.
        if !self.github_api_url.path().ends_with('/') {
            let path = format!("{}/", self.github_api_url.path());
            self.github_api_url.set_path(&path);
        }
        Ok(self)
    }

    pub fn bridge_options(&self) -> BridgeOptions {
        BridgeOptions::builder()
            .mode(self.mode)
            .model(self.model.clone())
            .completions_url(self.completions_url.clone())
            .github_api_url(self.github_api_url.clone())
            .pool_idle_timeout(Duration::from_secs(self.pool_idle_timeout_secs))
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["copilot-bridge"])
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.mode, ResponseMode::Completion);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(!config.metrics);
    }

    #[test]
    fn test_greeting_mode_flag() {
        let config = Config::try_parse_from(["copilot-bridge", "--mode", "greeting"]).unwrap();
        assert_eq!(config.bridge_options().mode, ResponseMode::Greeting);
    }

    #[test]
    fn test_metrics_port_must_differ() {
        let config = Config::try_parse_from([
            "copilot-bridge",
            "--metrics",
            "--port",
            "9090",
            "--metrics-port",
            "9090",
        ])
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_url_gains_trailing_slash() {
        let config = Config::try_parse_from([
            "copilot-bridge",
            "--github-api-url",
            "https://ghe.example.com/api/v3",
        ])
        .unwrap()
        .validate()
        .unwrap();

        assert_eq!(
            config.github_api_url.join("user").unwrap().as_str(),
            "https://ghe.example.com/api/v3/user"
        );
    }
}
