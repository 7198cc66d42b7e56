use crate::error::ClientError;
use copilot_chat_core::activity::Activity;
use copilot_chat_core::event::OutputEvent;
use futures::stream::BoxStream;

pub type ActivityStream<'a> = BoxStream<'a, Result<Activity, ClientError>>;

pub type OutputStream<'a> = BoxStream<'a, Result<OutputEvent, ClientError>>;
