use crate::error::ClientError;
use crate::stream::ActivityStream;
use copilot_chat_core::types::ConversationId;

/// Source of activity streams from the agent service.
///
/// Implementations only move activities; classifying them is the job of
/// [`crate::decode`]. Errors yielded inside a stream end the turn that
/// consumes it.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Opens a new conversation. The returned activities carry the welcome
    /// message and, on at least one of them, the new conversation id.
    async fn start_conversation(&self) -> Result<ActivityStream<'static>, ClientError>;

    /// Sends `text` as the user's next message and streams the reply.
    async fn ask_question(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ActivityStream<'static>, ClientError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn start_conversation(&self) -> Result<ActivityStream<'static>, ClientError> {
        (**self).start_conversation().await
    }

    async fn ask_question(
        &self,
        text: &str,
        conversation_id: &ConversationId,
    ) -> Result<ActivityStream<'static>, ClientError> {
        (**self).ask_question(text, conversation_id).await
    }
}
