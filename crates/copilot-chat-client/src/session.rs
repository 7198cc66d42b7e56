//! A chat session: one conversation plus the transcript shown to the user.

use crate::conversation::Conversation;
use crate::error::ClientError;
use crate::subscriber::IntoSubscribers;
use crate::transport::Transport;
use crate::turn::TurnResult;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Messages exchanged in the current chat, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Conversation plus transcript, started lazily.
///
/// The first [`ChatSession::ask`] after construction or after
/// [`ChatSession::new_chat`] runs the start handshake; its welcome message
/// becomes the first assistant entry.
pub struct ChatSession<T: Transport> {
    conversation: Conversation<T>,
    transcript: Transcript,
}

impl<T: Transport> ChatSession<T> {
    pub fn new(conversation: Conversation<T>) -> Self {
        Self {
            conversation,
            transcript: Transcript::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation<T> {
        &self.conversation
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Starts the conversation if none is active and returns the welcome
    /// message of a fresh start.
    pub async fn ensure_started(&mut self) -> Result<Option<String>, ClientError> {
        if self.conversation.is_started() {
            return Ok(None);
        }
        let welcome = self.conversation.start().await?;
        if let Some(text) = &welcome {
            self.transcript.push(Role::Assistant, text.clone());
        }
        Ok(welcome)
    }

    /// Records `text` as the user's message and runs one turn.
    ///
    /// On success the rendered HTML answer is appended to the transcript. On
    /// failure the transcript keeps only the user's message.
    pub async fn ask(
        &mut self,
        text: &str,
        subscribers: impl IntoSubscribers,
    ) -> Result<TurnResult, ClientError> {
        self.ensure_started().await?;
        self.transcript.push(Role::User, text);

        let result = self.conversation.run_turn(text, subscribers).await?;
        self.transcript.push(Role::Assistant, result.html.clone());
        Ok(result)
    }

    /// Drops the transcript and the conversation.
    pub fn new_chat(&mut self) {
        info!("Starting a new chat");
        self.transcript.clear();
        self.conversation.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.push(Role::Assistant, "Welcome");
        transcript.push(Role::User, "Hi");
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries()[0].role, Role::Assistant);
        assert_eq!(transcript.last().map(|e| e.content.as_str()), Some("Hi"));

        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let entry = TranscriptEntry {
            role: Role::User,
            content: "Hi".into(),
        };
        assert_eq!(
            serde_json::to_value(entry).unwrap(),
            serde_json::json!({"role": "user", "content": "Hi"})
        );
    }
}
