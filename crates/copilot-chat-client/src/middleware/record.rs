//! Debug capture of raw activities.
//!
//! [`ActivityRecorder`] passes activities through untouched and keeps a JSON
//! snapshot of the current turn on disk, rewritten after every activity so
//! the file is useful even when a turn is interrupted.

use super::ActivityTransformer;
use crate::stream::ActivityStream;
use copilot_chat_core::JsonValue;
use copilot_chat_core::activity::Activity;
use futures::StreamExt;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Longest text prefix kept per captured activity, in characters.
const TEXT_PREVIEW_CHARS: usize = 200;

/// Summary of one activity as written to the capture file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapturedActivity {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub text: Option<String>,
    pub channel_data: JsonValue,
    pub entities: Vec<JsonValue>,
    pub attachments: Option<Vec<JsonValue>>,
    pub value: Option<JsonValue>,
}

impl From<&Activity> for CapturedActivity {
    fn from(activity: &Activity) -> Self {
        Self {
            activity_type: activity.activity_type.to_string(),
            text: activity
                .text
                .as_deref()
                .filter(|text| !text.is_empty())
                .map(|text| text.chars().take(TEXT_PREVIEW_CHARS).collect()),
            channel_data: activity
                .channel_data
                .clone()
                .unwrap_or_else(|| JsonValue::Object(Default::default())),
            entities: activity.entities().to_vec(),
            attachments: activity.attachments.clone(),
            value: activity.value.clone(),
        }
    }
}

/// Records every activity of the most recent turn to a JSON file.
///
/// Each call to [`ActivityTransformer::transform`] starts a new capture, so
/// the file always holds a single turn. Write failures are logged and never
/// interrupt the stream.
#[derive(Debug)]
pub struct ActivityRecorder {
    path: PathBuf,
    captured: Mutex<Vec<CapturedActivity>>,
}

impl ActivityRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            captured: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Activities captured for the current turn.
    pub fn captured(&self) -> Vec<CapturedActivity> {
        self.captured
            .lock()
            .map(|captured| captured.clone())
            .unwrap_or_default()
    }

    fn reset(&self) {
        if let Ok(mut captured) = self.captured.lock() {
            captured.clear();
        }
    }

    fn record(&self, activity: &Activity) {
        let snapshot = match self.captured.lock() {
            Ok(mut captured) => {
                captured.push(CapturedActivity::from(activity));
                serde_json::to_string_pretty(&*captured)
            }
            Err(_) => return,
        };

        let result = snapshot
            .map_err(std::io::Error::from)
            .and_then(|json| std::fs::write(&self.path, json));
        if let Err(err) = result {
            log::warn!(
                "Failed to write activity capture to {}: {}",
                self.path.display(),
                err
            );
        }
    }
}

impl ActivityTransformer for ActivityRecorder {
    fn transform<'a>(&'a self, stream: ActivityStream<'a>) -> ActivityStream<'a> {
        self.reset();
        Box::pin(stream.inspect(move |item| {
            if let Ok(activity) = item {
                self.record(activity);
            }
        }))
    }
}
