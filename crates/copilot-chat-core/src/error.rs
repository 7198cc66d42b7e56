use thiserror::Error;

impl CoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        let msg = format!("Failed to parse activity JSON: {err}");
        Self::new(msg)
    }
}

#[derive(Error, Debug)]
#[error("Copilot chat error: {message}")]
pub struct CoreError {
    pub message: String,
}

pub type Result<T> = std::result::Result<T, CoreError>;
