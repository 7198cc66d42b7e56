#[cfg(test)]
mod tests {
    use copilot_chat_core::activity::{Activity, ActivityType};
    use copilot_chat_core::citation::{
        CitationMetadata, CitationRecord, clean_citations, format_references_html,
        format_references_text,
    };
    use copilot_chat_core::error::CoreError;
    use copilot_chat_core::event::{OutputEvent, OutputEventType};
    use serde_json::json;

    const RAW_ANSWER: &str =
        "Answer\u{e200}cite\u{e202}turn1search0\u{e201} more\u{e200}cite\u{e202}turn1search0\u{e201}.";

    #[test]
    fn test_plain_cleanup_without_metadata() {
        let (cleaned, citations) = clean_citations(RAW_ANSWER, false, &CitationMetadata::new());

        assert_eq!(cleaned, "Answer[1] more[1].");
        assert_eq!(citations.len(), 1);
        let citation = &citations[&1];
        assert_eq!(citation.id, "turn1search0");
        assert_eq!(citation.url, "");
        assert_eq!(citation.title, "Source 1");
    }

    #[test]
    fn test_html_cleanup_with_metadata() {
        let mut metadata = CitationMetadata::new();
        metadata.insert(
            "turn1search0".to_string(),
            CitationRecord::new("https://x", "X"),
        );

        let (cleaned, citations) = clean_citations(RAW_ANSWER, true, &metadata);
        let link = r#"<a href="https://x" target="_blank" style="text-decoration:none;color:#0066cc;"><sup>[1]</sup></a>"#;
        assert_eq!(cleaned, format!("Answer{link} more{link}."));

        let footer = format_references_html(&citations);
        assert!(footer.contains(r#"<a href="https://x" target="_blank" style="color:#0066cc;">[1] X</a>"#));
        assert!(footer.starts_with("<div"));
        assert!(footer.ends_with("</div>"));
    }

    #[test]
    fn test_text_footer() {
        let mut metadata = CitationMetadata::new();
        metadata.insert(
            "turn1search0".to_string(),
            CitationRecord::new("https://x", "X"),
        );
        let (_, citations) = clean_citations(RAW_ANSWER, false, &metadata);
        assert_eq!(format_references_text(&citations), "References:\n[1] X <https://x>\n");
    }

    #[test]
    fn test_activity_decoding() {
        let json = r#"{
            "type": "typing",
            "id": "a-1",
            "text": "Searching",
            "channelData": {"streamType": "informative", "streamSequence": 1},
            "conversation": {"id": "conv-1"},
            "from": {"id": "bot", "role": "bot"}
        }"#;
        let activity = Activity::from_json(json).unwrap();

        assert_eq!(activity.activity_type, ActivityType::Typing);
        assert_eq!(activity.non_empty_text(), Some("Searching"));
        assert_eq!(activity.channel_str("streamType"), Some("informative"));
        assert_eq!(activity.conversation_id().unwrap(), "conv-1");
        assert!(activity.entities().is_empty());
    }

    #[test]
    fn test_null_suggested_actions_list() {
        let activity = Activity::from_json(
            r#"{"type":"message","text":"Done","suggestedActions":{"actions":null}}"#,
        )
        .unwrap();

        assert_eq!(activity.non_empty_text(), Some("Done"));
        assert!(activity.suggested_actions.unwrap().titles().is_empty());
    }

    #[test]
    fn test_non_string_action_titles_are_ignored() {
        let activity = Activity::from_json(
            r#"{"type":"message","suggestedActions":{"actions":[
                {"type":"imBack","title":5},
                {"type":"imBack","title":{"text":"nested"}},
                {"type":"imBack","title":"Show more"}
            ]}}"#,
        )
        .unwrap();

        let actions = activity.suggested_actions.unwrap();
        assert_eq!(actions.actions.len(), 3);
        assert_eq!(actions.actions[0].title(), None);
        assert_eq!(actions.titles(), vec!["Show more"]);
    }

    #[test]
    fn test_null_conversation_id() {
        let activity = Activity::from_json(
            r#"{"type":"typing","text":"Thinking","conversation":{"id":null}}"#,
        )
        .unwrap();

        assert_eq!(activity.activity_type, ActivityType::Typing);
        assert!(activity.conversation.is_some());
        assert!(activity.conversation_id().is_none());
    }

    #[test]
    fn test_end_of_conversation_kind() {
        let activity = Activity::from_json(r#"{"type":"endOfConversation"}"#).unwrap();
        assert_eq!(activity.activity_type, ActivityType::EndOfConversation);
        assert_eq!(activity.activity_type.to_string(), "endOfConversation");
    }

    #[test]
    fn test_malformed_activity() {
        let err: CoreError = Activity::from_json("{not json").unwrap_err();
        assert!(err.to_string().starts_with("Copilot chat error: Failed to parse activity JSON"));
    }

    #[test]
    fn test_output_event_serialization() {
        let event = OutputEvent::thought("Looking up quests", "list_quests", "inProgress");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            json!({
                "type": "THOUGHT",
                "text": "Looking up quests",
                "task": "list_quests",
                "state": "inProgress"
            })
        );

        let end: OutputEvent = serde_json::from_value(json!({"type": "END_OF_TURN"})).unwrap();
        assert_eq!(end.event_type(), OutputEventType::EndOfTurn);
        assert!(end.is_terminal());
    }

    #[test]
    fn test_citation_map_event_serialization() {
        let mut citations = CitationMetadata::new();
        citations.insert("c1".to_string(), CitationRecord::new("https://a", "A"));
        let event = OutputEvent::citation_map(citations);

        let json = serde_json::to_string(&event).unwrap();
        let back: OutputEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
