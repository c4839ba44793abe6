//! Copilot agent event framing
//!
//! Responses to the Copilot platform are server-sent events. Each frame is a
//! `data:` line holding a chat.completion.chunk-shaped JSON object, followed
//! by a blank line. Errors use a dedicated `copilot_errors` event.
//!
//! A successful reply is `ack_event() + text_event(..) + done_event()`.
use serde::{Deserialize, Serialize};

/// Which part of the agent produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Agent,
    Function,
    Reference,
}

/// One record of a `copilot_errors` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopilotError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
    pub identifier: String,
}

impl CopilotError {
    /// Error raised while the agent was producing its answer.
    pub fn processing(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Agent,
            code: "PROCESSING_ERROR".to_string(),
            message: message.into(),
            identifier: "processing_error".to_string(),
        }
    }
}

/// A chat.completion.chunk frame. Fields serialize in declaration order, which
/// follows the order the Copilot SDK writes them in.
#[derive(Debug, Serialize)]
struct ChunkFrame<'a> {
    choices: [ChunkChoice<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChunkChoice<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    finish_reason: Option<&'a str>,
    delta: Delta<'a>,
}

#[derive(Debug, Serialize)]
struct Delta<'a> {
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

fn data_frame(choice: ChunkChoice<'_>) -> String {
    let frame = ChunkFrame { choices: [choice] };
    // Borrowed strings and integers always serialize.
    let data = serde_json::to_string(&frame).unwrap_or_default();
    format!("data: {data}\n\n")
}

/// Acknowledges the request before any content is sent.
pub fn ack_event() -> String {
    data_frame(ChunkChoice {
        index: None,
        finish_reason: None,
        delta: Delta {
            content: Some(""),
            role: Some("assistant"),
        },
    })
}

/// A chunk of assistant text.
pub fn text_event(content: &str) -> String {
    data_frame(ChunkChoice {
        index: Some(0),
        finish_reason: None,
        delta: Delta {
            content: Some(content),
            role: Some("assistant"),
        },
    })
}

/// Marks the end of the reply.
pub fn done_event() -> String {
    let stop = data_frame(ChunkChoice {
        index: Some(0),
        finish_reason: Some("stop"),
        delta: Delta {
            content: None,
            role: None,
        },
    });
    format!("{stop}data: [DONE]\n\n")
}

pub fn errors_event(errors: &[CopilotError]) -> String {
    // Serializing plain strings and unit enums cannot fail.
    let errors = serde_json::to_string(errors).unwrap_or_default();
    format!("event: copilot_errors\ndata: {errors}\n\n")
}
