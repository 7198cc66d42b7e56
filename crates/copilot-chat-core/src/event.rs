use crate::citation::CitationMetadata;
use serde::{Deserialize, Serialize};

/// Output event kinds emitted while a turn is streamed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputEventType {
    Status,
    Thought,
    SearchResult,
    ContentDelta,
    FinalContent,
    CitationMap,
    Suggestion,
    EndOfTurn,
}

/// Ephemeral progress message, superseded by the next one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub text: String,
}

/// One reasoning step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThoughtEvent {
    pub text: String,
    /// Short label derived from the upstream task identifier
    pub task: String,
    pub state: String,
}

/// External source discovered during the turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultEvent {
    /// Position within its batch; citation ids refer back to it
    pub index: usize,
    pub url: String,
    pub title: String,
    #[serde(rename = "sourceId")]
    pub source_id: String,
}

/// Incremental answer fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDeltaEvent {
    pub delta: String,
}

/// Complete answer delivered in one shot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalContentEvent {
    pub text: String,
}

/// Citation metadata discovered on a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationMapEvent {
    pub citations: CitationMetadata,
}

/// Suggested follow-up actions, comma-joined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionEvent {
    pub text: String,
}

/// Terminal marker for the turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndOfTurnEvent {}

/// Union of all events a turn can produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputEvent {
    Status(StatusEvent),
    Thought(ThoughtEvent),
    SearchResult(SearchResultEvent),
    ContentDelta(ContentDeltaEvent),
    FinalContent(FinalContentEvent),
    CitationMap(CitationMapEvent),
    Suggestion(SuggestionEvent),
    EndOfTurn(EndOfTurnEvent),
}

impl OutputEvent {
    /// Get the event type
    pub fn event_type(&self) -> OutputEventType {
        match self {
            OutputEvent::Status(_) => OutputEventType::Status,
            OutputEvent::Thought(_) => OutputEventType::Thought,
            OutputEvent::SearchResult(_) => OutputEventType::SearchResult,
            OutputEvent::ContentDelta(_) => OutputEventType::ContentDelta,
            OutputEvent::FinalContent(_) => OutputEventType::FinalContent,
            OutputEvent::CitationMap(_) => OutputEventType::CitationMap,
            OutputEvent::Suggestion(_) => OutputEventType::Suggestion,
            OutputEvent::EndOfTurn(_) => OutputEventType::EndOfTurn,
        }
    }

    pub fn status(text: impl Into<String>) -> Self {
        OutputEvent::Status(StatusEvent { text: text.into() })
    }

    pub fn thought(
        text: impl Into<String>,
        task: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        OutputEvent::Thought(ThoughtEvent {
            text: text.into(),
            task: task.into(),
            state: state.into(),
        })
    }

    pub fn content_delta(delta: impl Into<String>) -> Self {
        OutputEvent::ContentDelta(ContentDeltaEvent {
            delta: delta.into(),
        })
    }

    pub fn final_content(text: impl Into<String>) -> Self {
        OutputEvent::FinalContent(FinalContentEvent { text: text.into() })
    }

    pub fn citation_map(citations: CitationMetadata) -> Self {
        OutputEvent::CitationMap(CitationMapEvent { citations })
    }

    pub fn suggestion(text: impl Into<String>) -> Self {
        OutputEvent::Suggestion(SuggestionEvent { text: text.into() })
    }

    pub fn end_of_turn() -> Self {
        OutputEvent::EndOfTurn(EndOfTurnEvent {})
    }

    /// Returns `true` for the event that closes a turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OutputEvent::EndOfTurn(_))
    }
}
