//! Classification of raw activities into [`OutputEvent`]s.
//!
//! Every recognised activity shape maps to a fixed set of events; anything
//! else produces nothing. Entity payloads arrive with inconsistent key casing,
//! so each shape resolves its fields through one lookup table below.

use copilot_chat_core::JsonValue;
use copilot_chat_core::activity::{Activity, ActivityType};
use copilot_chat_core::citation::{CitationMetadata, CitationRecord};
use copilot_chat_core::event::{OutputEvent, SearchResultEvent};
use log::trace;
use serde_json::Map;

/// Status text emitted when the service ends the conversation.
pub const CONVERSATION_ENDED: &str = "Conversation ended.";

const TASK_PREFIX: &str = "P:";
const TASK_SUFFIX: &str = "-InvokeServer";

const STREAM_TYPE: &str = "streamType";
const CHUNK_TYPE: &str = "chunkType";

const SEARCH_URL_KEYS: &[&str] = &["Url", "url"];
const SEARCH_TITLE_KEYS: &[&str] = &["Name", "name"];
const SEARCH_SOURCE_KEYS: &[&str] = &["SourceId", "sourceId"];

const CITATION_ID_KEYS: &[&str] = &["@id", "id"];
const CITATION_URL_KEYS: &[&str] = &["url", "Url", "uri", "sameAs"];
const CITATION_TITLE_KEYS: &[&str] = &["name", "title", "Name"];

/// Maps one activity to the events it produces, in emission order.
///
/// An end-of-conversation activity yields a status followed by
/// [`OutputEvent::EndOfTurn`]; callers stop reading after that.
pub fn classify(activity: &Activity) -> Vec<OutputEvent> {
    let mut events = Vec::new();
    match &activity.activity_type {
        ActivityType::Event => classify_event(activity, &mut events),
        ActivityType::Typing => classify_typing(activity, &mut events),
        ActivityType::Message => classify_message(activity, &mut events),
        ActivityType::EndOfConversation => {
            events.push(OutputEvent::status(CONVERSATION_ENDED));
            events.push(OutputEvent::end_of_turn());
        }
        ActivityType::Other(kind) => trace!("Ignoring activity of kind {kind}"),
    }
    events
}

/// Short label for an upstream task identifier.
///
/// Keeps the part after the last `:` (or, failing that, the last `.`) and
/// strips the planner prefix and server-invocation suffix.
pub fn task_label(task_id: &str) -> String {
    let tail = match task_id.rsplit_once(':') {
        Some((_, tail)) => tail,
        None => task_id.rsplit_once('.').map_or(task_id, |(_, tail)| tail),
    };
    let tail = tail.strip_prefix(TASK_PREFIX).unwrap_or(tail);
    tail.strip_suffix(TASK_SUFFIX).unwrap_or(tail).to_owned()
}

fn classify_event(activity: &Activity, events: &mut Vec<OutputEvent>) {
    let Some(value) = activity.value.as_ref().and_then(JsonValue::as_object) else {
        return;
    };

    if let Some(thought) = non_empty_str(value.get("thought")) {
        let task_id = non_empty_str(value.get("taskDialogId")).unwrap_or_default();
        let state = non_empty_str(value.get("state")).unwrap_or_default();
        events.push(OutputEvent::thought(thought, task_label(task_id), state));
    }

    let results = value
        .get("observation")
        .and_then(|observation| observation.get("search_result"))
        .and_then(|search| search.get("search_results"))
        .and_then(JsonValue::as_array);
    for (index, result) in results.into_iter().flatten().enumerate() {
        if let Some(result) = search_result(index, result) {
            events.push(OutputEvent::SearchResult(result));
        }
    }
}

fn classify_typing(activity: &Activity, events: &mut Vec<OutputEvent>) {
    let Some(text) = activity.non_empty_text() else {
        return;
    };
    if activity.channel_str(STREAM_TYPE) == Some("informative") {
        events.push(OutputEvent::status(text));
    } else if activity.channel_str(CHUNK_TYPE) == Some("delta") {
        events.push(OutputEvent::content_delta(text));
    } else {
        trace!(
            "Ignoring typing activity with streamType={:?} chunkType={:?}",
            activity.channel_str(STREAM_TYPE),
            activity.channel_str(CHUNK_TYPE)
        );
    }
}

fn classify_message(activity: &Activity, events: &mut Vec<OutputEvent>) {
    let citations: CitationMetadata = activity.entities().iter().filter_map(citation_entity).collect();
    if !citations.is_empty() {
        events.push(OutputEvent::citation_map(citations));
    }

    if let Some(text) = activity.non_empty_text() {
        // Streamed answers repeat their text on a message tagged with another
        // stream type; only untagged or final messages carry the answer.
        let is_final = !activity.has_channel_field(STREAM_TYPE)
            || activity.channel_str(STREAM_TYPE) == Some("final");
        if is_final {
            events.push(OutputEvent::final_content(text));
        }
    }

    if let Some(actions) = &activity.suggested_actions {
        let titles = actions.titles();
        if !titles.is_empty() {
            events.push(OutputEvent::suggestion(titles.join(", ")));
        }
    }
}

fn search_result(index: usize, result: &JsonValue) -> Option<SearchResultEvent> {
    let result = result.as_object()?;
    Some(SearchResultEvent {
        index,
        url: first_str(result, SEARCH_URL_KEYS).to_owned(),
        title: first_str(result, SEARCH_TITLE_KEYS).to_owned(),
        source_id: first_str(result, SEARCH_SOURCE_KEYS).to_owned(),
    })
}

/// Resolves a schema.org `Claim`/citation entity into its id and link metadata.
fn citation_entity(entity: &JsonValue) -> Option<(String, CitationRecord)> {
    let entity = entity.as_object()?;
    let entity_type = first_str(entity, &["type"]);
    if !(entity_type.contains("Claim") || entity_type.to_lowercase().contains("citation")) {
        return None;
    }

    let id = first_str(entity, CITATION_ID_KEYS);
    if id.is_empty() {
        return None;
    }
    let record = CitationRecord::new(
        first_str(entity, CITATION_URL_KEYS),
        first_str(entity, CITATION_TITLE_KEYS),
    );
    Some((id.to_owned(), record))
}

/// First non-empty string value among `keys`, or `""`.
fn first_str<'a>(object: &'a Map<String, JsonValue>, keys: &[&str]) -> &'a str {
    keys.iter()
        .find_map(|key| non_empty_str(object.get(*key)))
        .unwrap_or_default()
}

fn non_empty_str(value: Option<&JsonValue>) -> Option<&str> {
    value
        .and_then(JsonValue::as_str)
        .filter(|value| !value.is_empty())
}
