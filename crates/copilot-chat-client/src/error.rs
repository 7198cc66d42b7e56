use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by the chat client.
///
/// Anything returned as an error ends the current turn. Conditions the client
/// can absorb (missing entity fields, unknown activity kinds) never show up here.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {message}")]
    Connection { message: String },
    #[error("Invalid configuration: {message}")]
    Config { message: String },
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },
    #[error("Agent service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Malformed activity stream: {message}")]
    MalformedStream { message: String },
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<copilot_chat_core::CoreError> for ClientError {
    fn from(err: copilot_chat_core::CoreError) -> Self {
        Self::MalformedStream {
            message: err.message,
        }
    }
}
