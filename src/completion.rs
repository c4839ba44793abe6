//! Default completers
//!
//! - [`CopilotCompletion`] asks the Copilot chat completions endpoint to answer the
//!   user's message, authenticating as the user.
//! - [`GreetingResponder`] looks the user up on the GitHub API and greets them by
//!   login, repeating their question. Useful to check an extension is wired up
//!   before pointing it at a model.
use crate::client::{HttpClient, USER_AGENT, send_json};
use crate::errors::UpstreamError;
use crate::traits::{Completer, Completion, CompletionError};
use async_trait::async_trait;
use axum::http::header;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_ID_HEADER: &str = "x-request-id";

/// How the bridge answers verified requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Forward the message to the chat completions endpoint.
    #[default]
    Completion,
    /// Greet the authenticated user and echo their question.
    Greeting,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Answers messages with the Copilot chat completions API.
#[derive(Debug, Clone)]
pub struct CopilotCompletion<C: HttpClient> {
    http_client: C,
    endpoint: Url,
    model: String,
}

impl<C: HttpClient> CopilotCompletion<C> {
    pub fn new(http_client: C, endpoint: Url, model: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint,
            model: model.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> Completer for CopilotCompletion<C> {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, message: &str, token: &str) -> Result<Completion, CompletionError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": message}],
            "stream": false,
        });

        let req = axum::http::Request::builder()
            .method("POST")
            .uri(self.endpoint.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .body(axum::body::Body::from(body.to_string()))
            .map_err(UpstreamError::from)?;

        let (headers, response): (_, ChatCompletionResponse) =
            send_json(&self.http_client, req).await?;

        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        debug!(?request_id, "Received completion");

        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::EmptyResponse)?
            .message
            .content
            .unwrap_or_default();

        Ok(Completion {
            request_id,
            content,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GitHubUser {
    login: String,
}

/// Greets the user by GitHub login and repeats their question back.
#[derive(Debug, Clone)]
pub struct GreetingResponder<C: HttpClient> {
    http_client: C,
    github_api_url: Url,
}

impl<C: HttpClient> GreetingResponder<C> {
    pub fn new(http_client: C, github_api_url: Url) -> Self {
        Self {
            http_client,
            github_api_url,
        }
    }
}

#[async_trait]
impl<C: HttpClient> Completer for GreetingResponder<C> {
    #[instrument(skip_all)]
    async fn complete(&self, message: &str, token: &str) -> Result<Completion, CompletionError> {
        let url = self.github_api_url.join("user").map_err(UpstreamError::from)?;
        let req = axum::http::Request::builder()
            .method("GET")
            .uri(url.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::ACCEPT, "application/vnd.github+json")
            .header(header::USER_AGENT, USER_AGENT)
            .body(axum::body::Body::empty())
            .map_err(UpstreamError::from)?;

        let (_, user): (_, GitHubUser) = send_json(&self.http_client, req).await?;
        debug!(login = %user.login, "Resolved user");

        Ok(Completion::new(format!(
            "Welcome {}! It looks like you asked the following question, \"{}\". ",
            user.login, message
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockHttpClient;
    use axum::http::StatusCode;

    fn completion(client: MockHttpClient) -> CopilotCompletion<MockHttpClient> {
        CopilotCompletion::new(
            client,
            "https://api.githubcopilot.com/chat/completions".parse().unwrap(),
            DEFAULT_MODEL,
        )
    }

    #[tokio::test]
    async fn test_completion_forwards_message_and_token() {
        let client = MockHttpClient::new(
            StatusCode::OK,
            r#"{"choices": [{"message": {"role": "assistant", "content": "Paris."}}]}"#,
        );
        let completer = completion(client.clone());

        let result = completer
            .complete("What is the capital of France?", "gho_token")
            .await
            .unwrap();
        assert_eq!(result.content, "Paris.");

        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.method, "POST");
        assert_eq!(request.uri, "https://api.githubcopilot.com/chat/completions");
        assert!(
            request
                .headers
                .contains(&("authorization".to_string(), "Bearer gho_token".to_string()))
        );

        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "What is the capital of France?"}],
                "stream": false
            })
        );
    }

    #[tokio::test]
    async fn test_completion_surfaces_backend_error_message() {
        let client = MockHttpClient::new(
            StatusCode::GATEWAY_TIMEOUT,
            r#"{"error": {"message": "upstream timeout"}}"#,
        );
        let err = completion(client).complete("hi", "t").await.unwrap_err();

        assert!(matches!(err, CompletionError::Backend(_)));
        assert_eq!(err.to_string(), "upstream timeout");
    }

    #[tokio::test]
    async fn test_completion_without_choices_is_an_error() {
        let client = MockHttpClient::new(StatusCode::OK, r#"{"choices": []}"#);
        let err = completion(client).complete("hi", "t").await.unwrap_err();

        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_null_content_becomes_empty_reply() {
        let client = MockHttpClient::new(
            StatusCode::OK,
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        );
        let result = completion(client).complete("hi", "t").await.unwrap();

        assert_eq!(result.content, "");
    }

    #[tokio::test]
    async fn test_greeting_uses_login_and_echoes_question() {
        let client = MockHttpClient::new(StatusCode::OK, r#"{"login": "octocat", "id": 1}"#);
        let responder =
            GreetingResponder::new(client.clone(), "https://api.github.com/".parse().unwrap());

        let result = responder.complete("How do I rebase?", "gho_token").await.unwrap();

        assert_eq!(
            result.content,
            "Welcome octocat! It looks like you asked the following question, \"How do I rebase?\". "
        );
        let requests = client.get_requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].uri, "https://api.github.com/user");
    }

    #[tokio::test]
    async fn test_greeting_with_bad_token_fails() {
        let client = MockHttpClient::new(
            StatusCode::UNAUTHORIZED,
            r#"{"message": "Bad credentials"}"#,
        );
        let responder = GreetingResponder::new(client, "https://api.github.com/".parse().unwrap());

        let err = responder.complete("hi", "nope").await.unwrap_err();
        assert_eq!(err.to_string(), "Bad credentials");
    }
}
