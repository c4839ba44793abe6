//! Capability seams for the bridge
//!
//! The request handler only talks to these traits. Default implementations
//! backed by the GitHub and Copilot APIs live in [`crate::verify`] and
//! [`crate::completion`]; tests substitute their own.
//!
//! - **RequestVerifier**: checks the signature of an inbound request and decodes its payload
//! - **Completer**: turns the user's message into the agent's reply

mod completer;
mod request_verifier;

pub use completer::{Completer, Completion, CompletionError};
pub use request_verifier::{RequestVerifier, Verification, VerifyError};
