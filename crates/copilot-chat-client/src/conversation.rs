use crate::decode;
use crate::error::ClientError;
use crate::middleware::{ActivityTransformer, TransformerChain};
use crate::stream::{ActivityStream, OutputStream};
use crate::subscriber::{IntoSubscribers, TurnSubscriber};
use crate::transport::Transport;
use crate::turn::{TurnAccumulator, TurnResult};
use copilot_chat_core::event::OutputEvent;
use copilot_chat_core::types::ConversationId;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;

/// Content emitted in place of a reply when no conversation has been started.
pub const NO_ACTIVE_CONVERSATION: &str = "Error: No active conversation.";

/// One conversation with the agent service.
///
/// A conversation is started once with [`Conversation::start`] and then driven
/// one turn at a time. Sending borrows the conversation mutably for as long as
/// the reply stream lives, so turns cannot overlap.
pub struct Conversation<T: Transport> {
    transport: T,
    conversation_id: Option<ConversationId>,
    transformers: TransformerChain,
}

struct DemuxState<'a> {
    activities: ActivityStream<'a>,
    pending: VecDeque<OutputEvent>,
    finished: bool,
}

impl<T: Transport> Conversation<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            conversation_id: None,
            transformers: TransformerChain::new(),
        }
    }

    /// Resumes an existing conversation without a handshake.
    pub fn with_conversation_id(mut self, conversation_id: impl Into<ConversationId>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Adds a transformer applied to the raw activities of every turn.
    pub fn with_transformer<A: ActivityTransformer + 'static>(mut self, transformer: A) -> Self {
        self.transformers = std::mem::take(&mut self.transformers).push(transformer);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.conversation_id.is_some()
    }

    /// Forgets the current conversation; the next [`Conversation::start`]
    /// opens a new one.
    pub fn reset(&mut self) {
        if let Some(id) = self.conversation_id.take() {
            info!("Leaving conversation {id}");
        }
    }

    /// Runs the start handshake and returns the welcome message.
    ///
    /// The welcome message is every non-empty activity text, one per line.
    /// Returns `Ok(None)` when the handshake carried no text. A handshake that
    /// never names a conversation is not an error here; the next send reports
    /// it instead.
    pub async fn start(&mut self) -> Result<Option<String>, ClientError> {
        self.conversation_id = None;
        let mut activities = self.transport.start_conversation().await?;
        let mut welcome = String::new();

        while let Some(activity) = activities.try_next().await? {
            if self.conversation_id.is_none() {
                if let Some(id) = activity.conversation_id() {
                    info!("Started conversation {id}");
                    self.conversation_id = Some(id.clone());
                }
            }
            if let Some(text) = activity.non_empty_text() {
                welcome.push_str(text);
                welcome.push('\n');
            }
        }

        if self.conversation_id.is_none() {
            warn!("Start handshake did not provide a conversation id");
        }
        let welcome = welcome.trim();
        Ok((!welcome.is_empty()).then(|| welcome.to_owned()))
    }

    fn require_conversation_id(&self) -> Result<ConversationId, ClientError> {
        self.conversation_id
            .clone()
            .ok_or_else(|| ClientError::connection("no active conversation"))
    }

    /// Sends `text` and streams the classified reply.
    ///
    /// The stream ends when the transport ends, right after an
    /// [`OutputEvent::EndOfTurn`], or after the first error. Without an active
    /// conversation it yields a single error [`OutputEvent::ContentDelta`].
    pub fn send_message<'a>(&'a mut self, text: impl Into<String>) -> OutputStream<'a> {
        let conversation_id = match self.require_conversation_id() {
            Ok(id) => id,
            Err(err) => {
                warn!("Cannot send message: {err}");
                return stream::iter([Ok(OutputEvent::content_delta(NO_ACTIVE_CONVERSATION))]).boxed();
            }
        };

        let this: &'a Self = self;
        let text = text.into();
        let activities = stream::once(async move {
            this.transport.ask_question(&text, &conversation_id).await
        })
        .try_flatten()
        .boxed();

        let state = DemuxState {
            activities: this.transformers.apply(activities),
            pending: VecDeque::new(),
            finished: false,
        };

        stream::unfold(state, |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    if event.is_terminal() {
                        state.pending.clear();
                        state.finished = true;
                    }
                    return Some((Ok(event), state));
                }
                if state.finished {
                    return None;
                }
                match state.activities.next().await {
                    Some(Ok(activity)) => {
                        let events = decode::classify(&activity);
                        debug!(
                            "Activity {} produced {} event(s)",
                            activity.activity_type,
                            events.len()
                        );
                        state.pending.extend(events);
                    }
                    Some(Err(err)) => {
                        state.finished = true;
                        return Some((Err(err), state));
                    }
                    None => return None,
                }
            }
        })
        .boxed()
    }

    /// Sends `text`, drives the reply to completion and renders it.
    ///
    /// Subscribers see every event as it arrives. On a transport or stream
    /// error they get [`TurnSubscriber::on_turn_failed`] and the error is
    /// returned.
    pub async fn run_turn(
        &mut self,
        text: impl Into<String>,
        subscribers: impl IntoSubscribers,
    ) -> Result<TurnResult, ClientError> {
        let subscribers = subscribers.into_subscribers();
        let mut turn = TurnAccumulator::new();
        let mut events = self.send_message(text);

        while let Some(item) = events.next().await {
            match item {
                Ok(event) => {
                    turn.apply(&event);
                    notify(&subscribers, &event, &turn).await;
                }
                Err(err) => {
                    for subscriber in &subscribers {
                        subscriber.on_turn_failed(&err).await;
                    }
                    return Err(err);
                }
            }
        }

        let result = turn.finish();
        for subscriber in &subscribers {
            subscriber.on_turn_finalized(&result).await;
        }
        Ok(result)
    }
}

async fn notify(subscribers: &[Arc<dyn TurnSubscriber>], event: &OutputEvent, turn: &TurnAccumulator) {
    if subscribers.is_empty() {
        return;
    }
    let preview = match event {
        OutputEvent::ContentDelta(_) | OutputEvent::FinalContent(_) => Some(turn.preview()),
        _ => None,
    };

    for subscriber in subscribers {
        subscriber.on_event(event).await;
        match event {
            OutputEvent::Status(e) => subscriber.on_status(&e.text).await,
            OutputEvent::Thought(e) => subscriber.on_thought(e, turn.thoughts()).await,
            OutputEvent::SearchResult(e) => subscriber.on_search_result(e).await,
            OutputEvent::Suggestion(e) => subscriber.on_suggestion(&e.text).await,
            OutputEvent::ContentDelta(_) | OutputEvent::FinalContent(_) => {
                if let Some(preview) = &preview {
                    subscriber.on_content_changed(preview).await;
                }
            }
            OutputEvent::CitationMap(_) | OutputEvent::EndOfTurn(_) => {}
        }
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Conversation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("transport", &self.transport)
            .field("conversation_id", &self.conversation_id)
            .field("transformers", &self.transformers)
            .finish()
    }
}
