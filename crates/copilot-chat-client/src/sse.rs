//! Server-sent events decoding for activity streams.
//!
//! The agent service answers every request with `text/event-stream`. Each
//! activity arrives as one event:
//!
//! ```text
//! event: activity
//! data: {"type":"typing","text":"Searching..."}
//!
//! ```
//!
//! Events with any other name (the service closes with `event: end`) are
//! skipped.

use crate::error::ClientError;
use crate::stream::ActivityStream;
use bytes::Bytes;
use copilot_chat_core::activity::Activity;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::future;
use futures::stream::{self, Stream, StreamExt};

const ACTIVITY_EVENT: &str = "activity";

/// Appended to every body so a last event without a closing blank line is
/// still dispatched.
const END_OF_BODY: &[u8] = b"\n\n";

/// Decodes one SSE event into an activity.
///
/// Returns `None` for events that carry no activity; a data payload that is
/// not a valid activity is an error.
fn decode_event<E>(
    item: Result<Event, EventStreamError<E>>,
) -> Option<Result<Activity, ClientError>>
where
    E: Into<ClientError>,
{
    let event = match item {
        Ok(event) => event,
        Err(EventStreamError::Transport(err)) => return Some(Err(err.into())),
        Err(EventStreamError::Utf8(err)) => return Some(Err(malformed(err))),
        Err(EventStreamError::Parser(err)) => return Some(Err(malformed(err))),
    };
    if event.event != ACTIVITY_EVENT || event.data.trim().is_empty() {
        log::trace!("Skipping SSE event {:?}", event.event);
        return None;
    }
    Some(Activity::from_json(&event.data).map_err(ClientError::from))
}

fn malformed(err: impl std::fmt::Display) -> ClientError {
    ClientError::MalformedStream {
        message: err.to_string(),
    }
}

/// Turns an SSE response body into a stream of activities.
///
/// The stream ends after the body ends or after the first error.
pub fn activity_stream<S, E>(bytes: S) -> ActivityStream<'static>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    bytes
        .chain(stream::once(future::ready(Ok(Bytes::from_static(END_OF_BODY)))))
        .eventsource()
        .filter_map(|item| future::ready(decode_event(item)))
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}
