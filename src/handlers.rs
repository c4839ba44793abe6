/// Axum handlers for the bridge
use crate::AppState;
use crate::events::{CopilotError, ack_event, done_event, errors_event, text_event};
use crate::payload::get_user_message;
use crate::traits::{Verification, VerifyError};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument, warn};

pub const WELCOME_MESSAGE: &str = "Welcome to my Copilot Extension!";

pub const UNVERIFIED_MESSAGE: &str = "Request could not be verified";

pub const MALFORMED_PAYLOAD_MESSAGE: &str = "Request payload could not be parsed";

const TOKEN_HEADER: &str = "x-github-token";

const SIGNATURE_HEADER: &str = "github-public-key-signature";

const KEY_ID_HEADER: &str = "github-public-key-identifier";

/// Missing or non-UTF-8 headers read as empty strings.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn plain_text(status: StatusCode, body: &'static str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

#[instrument]
pub async fn welcome() -> &'static str {
    WELCOME_MESSAGE
}

/// The agent endpoint: verify the request, answer the user's message and
/// return the reply as a sequence of Copilot events.
#[instrument(skip_all)]
pub async fn agent_message_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let token = header_str(&headers, TOKEN_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let key_id = header_str(&headers, KEY_ID_HEADER);
    debug!("Received agent request body of size: {}", body.len());

    let payload = match state.verifier.verify(&body, signature, key_id, token).await {
        Ok(Verification::Valid(payload)) => payload,
        Ok(Verification::Invalid) => {
            error!("Request verification failed");
            return plain_text(StatusCode::UNAUTHORIZED, UNVERIFIED_MESSAGE);
        }
        Err(VerifyError::MalformedPayload(e)) => {
            warn!("Verified request carried an unparseable payload: {}", e);
            return plain_text(StatusCode::BAD_REQUEST, MALFORMED_PAYLOAD_MESSAGE);
        }
        Err(e) => {
            error!("Request verification failed: {}", e);
            return plain_text(StatusCode::UNAUTHORIZED, UNVERIFIED_MESSAGE);
        }
    };

    let message = get_user_message(&payload);
    info!(
        thread_id = payload.copilot_thread_id.as_deref().unwrap_or_default(),
        "Answering verified request"
    );

    match state.completer.complete(message, token).await {
        Ok(completion) => {
            debug!(request_id = ?completion.request_id, "Completion succeeded");
            format!(
                "{}{}{}",
                ack_event(),
                text_event(&completion.content),
                done_event()
            )
            .into_response()
        }
        Err(e) => {
            error!("Completion failed: {}", e);
            errors_event(&[CopilotError::processing(e.to_string())]).into_response()
        }
    }
}
