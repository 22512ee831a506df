use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed message for the last-resort branch: a 2xx response whose envelope
/// carries neither a model nor errors.
pub const OPAQUE_FAILURE_MESSAGE: &str = "Something went wrong";

/// Normalized failure surfaced by the gateway and consumed by controllers.
///
/// Controllers never branch on the variant beyond extracting the messages;
/// every failure terminates in one transient notice per message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GatewayError {
    /// Network or transport failure before a usable response arrived.
    #[error("{0}")]
    Transport(String),
    /// Structured validation/business rejection from the backend, in the
    /// order the backend returned the messages.
    #[error("{}", messages.join("; "))]
    Rejected { messages: Vec<String> },
    /// A 2xx response with no usable payload.
    #[error("{OPAQUE_FAILURE_MESSAGE}")]
    Opaque,
    /// Client-side precondition failed; no network call was made.
    #[error("{0}")]
    Precondition(String),
}

impl GatewayError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        GatewayError::Transport(err.to_string())
    }

    /// The ordered human-readable messages to surface, one notice each.
    pub fn messages(&self) -> Vec<String> {
        match self {
            GatewayError::Transport(message) => vec![message.clone()],
            GatewayError::Rejected { messages } => messages.clone(),
            GatewayError::Opaque => vec![OPAQUE_FAILURE_MESSAGE.to_string()],
            GatewayError::Precondition(message) => vec![message.clone()],
        }
    }
}
