pub mod activity;
pub mod citation;
pub mod error;
pub mod event;
pub mod types;

pub use error::{CoreError, Result};

/// Re-export to ensure the same type is used
pub use serde_json::Value as JsonValue;
