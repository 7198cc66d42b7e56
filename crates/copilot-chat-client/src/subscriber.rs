use crate::error::ClientError;
use crate::turn::TurnResult;
use copilot_chat_core::event::{OutputEvent, SearchResultEvent, ThoughtEvent};
use std::sync::Arc;

/// Observer of a turn as it is driven by [`crate::Conversation::run_turn`].
///
/// Every method has an empty default, so implementors only override the
/// callbacks they render.
#[allow(unused_variables)]
#[async_trait::async_trait]
pub trait TurnSubscriber: Send + Sync {
    /// Called for every event, before the typed callback.
    async fn on_event(&self, event: &OutputEvent) {}

    async fn on_status(&self, status: &str) {}

    /// `thoughts` holds every thought of the turn so far, `thought` included.
    async fn on_thought(&self, thought: &ThoughtEvent, thoughts: &[ThoughtEvent]) {}

    async fn on_search_result(&self, result: &SearchResultEvent) {}

    /// Called after each content change with the plain-text preview of the
    /// whole answer so far.
    async fn on_content_changed(&self, preview: &str) {}

    async fn on_suggestion(&self, suggestion: &str) {}

    async fn on_turn_failed(&self, error: &ClientError) {}

    async fn on_turn_finalized(&self, result: &TurnResult) {}
}

/// Conversion into the list of subscribers notified during a turn.
pub trait IntoSubscribers {
    fn into_subscribers(self) -> Vec<Arc<dyn TurnSubscriber>>;
}

impl IntoSubscribers for () {
    fn into_subscribers(self) -> Vec<Arc<dyn TurnSubscriber>> {
        Vec::new()
    }
}

impl IntoSubscribers for Arc<dyn TurnSubscriber> {
    fn into_subscribers(self) -> Vec<Arc<dyn TurnSubscriber>> {
        vec![self]
    }
}

impl IntoSubscribers for Vec<Arc<dyn TurnSubscriber>> {
    fn into_subscribers(self) -> Vec<Arc<dyn TurnSubscriber>> {
        self
    }
}
