//! Inbound activity records as delivered by the agent service.
//!
//! Activities follow the Bot Framework schema. Only the fields the client reads
//! are modelled; everything else on the wire is ignored during decoding.

use crate::JsonValue;
use crate::types::ids::{ActivityId, ConversationId};
use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit `null` as the type's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Activity kinds.
///
/// The set is open on the wire. Kinds the client does not act on decode to
/// [`ActivityType::Other`] and keep their original spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    Message,
    Typing,
    Event,
    EndOfConversation,
    Other(String),
}

impl ActivityType {
    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::Message => "message",
            ActivityType::Typing => "typing",
            ActivityType::Event => "event",
            ActivityType::EndOfConversation => "endOfConversation",
            ActivityType::Other(kind) => kind,
        }
    }
}

impl From<String> for ActivityType {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "message" => ActivityType::Message,
            "typing" => ActivityType::Typing,
            "event" => ActivityType::Event,
            "endOfConversation" => ActivityType::EndOfConversation,
            _ => ActivityType::Other(kind),
        }
    }
}

impl From<ActivityType> for String {
    fn from(kind: ActivityType) -> Self {
        match kind {
            ActivityType::Other(kind) => kind,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the conversation an activity belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationAccount {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: ConversationId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConversationAccount {
    pub fn new(id: impl Into<ConversationId>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// A follow-up action offered by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardAction {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    /// Kept as raw JSON; only string titles are shown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

impl CardAction {
    pub fn im_back(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            action_type: Some("imBack".to_string()),
            value: Some(JsonValue::String(title.clone())),
            title: Some(JsonValue::String(title)),
        }
    }

    /// The title, when it is a string.
    pub fn title(&self) -> Option<&str> {
        self.title.as_ref().and_then(JsonValue::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedActions {
    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<CardAction>,
}

impl SuggestedActions {
    /// Titles of all actions that carry a non-empty title, in order.
    pub fn titles(&self) -> Vec<&str> {
        self.actions
            .iter()
            .filter_map(CardAction::title)
            .filter(|title| !title.is_empty())
            .collect()
    }
}

/// A single activity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ActivityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<SuggestedActions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<ConversationAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<JsonValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Activity {
    pub fn new(activity_type: ActivityType) -> Self {
        Self {
            activity_type,
            id: None,
            text: None,
            channel_data: None,
            entities: None,
            suggested_actions: None,
            conversation: None,
            name: None,
            value: None,
            attachments: None,
            timestamp: None,
        }
    }

    /// Outgoing user message for the given conversation.
    pub fn message(text: impl Into<String>, conversation_id: &ConversationId) -> Self {
        Self::new(ActivityType::Message)
            .with_text(text)
            .with_conversation(conversation_id.clone())
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_id(mut self, id: impl Into<ActivityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_channel_data(mut self, channel_data: JsonValue) -> Self {
        self.channel_data = Some(channel_data);
        self
    }

    pub fn with_entities(mut self, entities: Vec<JsonValue>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_suggested_actions(mut self, actions: Vec<CardAction>) -> Self {
        self.suggested_actions = Some(SuggestedActions { actions });
        self
    }

    pub fn with_conversation(mut self, id: impl Into<ConversationId>) -> Self {
        self.conversation = Some(ConversationAccount::new(id));
        self
    }

    pub fn with_value(mut self, value: JsonValue) -> Self {
        self.value = Some(value);
        self
    }

    /// The text payload, if present and non-empty.
    pub fn non_empty_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.is_empty())
    }

    /// Reads a string field from the channel-specific metadata bag.
    ///
    /// Returns `None` when the bag is absent, not an object, or the field is
    /// missing, null or not a string.
    pub fn channel_str(&self, key: &str) -> Option<&str> {
        self.channel_data
            .as_ref()
            .and_then(|data| data.as_object())
            .and_then(|data| data.get(key))
            .and_then(JsonValue::as_str)
    }

    /// Returns `true` if the channel bag carries a non-null value for `key`.
    pub fn has_channel_field(&self, key: &str) -> bool {
        self.channel_data
            .as_ref()
            .and_then(|data| data.as_object())
            .and_then(|data| data.get(key))
            .is_some_and(|value| !value.is_null())
    }

    pub fn entities(&self) -> &[JsonValue] {
        self.entities.as_deref().unwrap_or(&[])
    }

    /// The conversation id carried by this activity, if any.
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation
            .as_ref()
            .map(|conversation| &conversation.id)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_kinds_round_trip_their_spelling() {
        let activity = Activity::from_json(r#"{"type":"conversationUpdate"}"#).unwrap();
        assert_eq!(
            activity.activity_type,
            ActivityType::Other("conversationUpdate".to_string())
        );
        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json, json!({"type": "conversationUpdate"}));
    }

    #[test]
    fn channel_fields_tolerate_non_object_bags() {
        let activity = Activity::new(ActivityType::Typing).with_channel_data(json!("opaque"));
        assert_eq!(activity.channel_str("streamType"), None);
        assert!(!activity.has_channel_field("streamType"));

        let activity = Activity::new(ActivityType::Message)
            .with_channel_data(json!({"streamType": null, "chunkType": "delta"}));
        assert!(!activity.has_channel_field("streamType"));
        assert_eq!(activity.channel_str("chunkType"), Some("delta"));
    }

    #[test]
    fn empty_conversation_ids_are_ignored() {
        let activity = Activity::from_json(r#"{"type":"message","conversation":{"id":""}}"#).unwrap();
        assert!(activity.conversation_id().is_none());

        let activity = Activity::from_json(r#"{"type":"event","conversation":{"id":"c-1"}}"#).unwrap();
        assert_eq!(activity.conversation_id().map(|id| id.as_str()), Some("c-1"));
    }

    #[test]
    fn suggested_action_titles_skip_blanks() {
        let activity = Activity::new(ActivityType::Message).with_suggested_actions(vec![
            CardAction::im_back("Yes"),
            CardAction {
                action_type: None,
                title: None,
                value: None,
            },
            CardAction::im_back("No"),
        ]);
        let titles = activity.suggested_actions.as_ref().unwrap().titles();
        assert_eq!(titles, vec!["Yes", "No"]);
    }
}
