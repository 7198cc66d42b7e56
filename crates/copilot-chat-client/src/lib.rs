#![doc = include_str!("../README.md")]

pub mod config;
pub mod conversation;
pub mod decode;
pub mod error;
pub mod http;
pub mod middleware;
pub mod session;
pub mod sse;
pub(crate) mod stream;
pub mod subscriber;
pub mod transport;
pub mod turn;

pub use config::ConnectionSettings;
pub use conversation::Conversation;
pub use error::ClientError;
pub use http::{HttpTransport, HttpTransportBuilder};
pub use middleware::{ActivityStreamExt, ActivityTransformer, TransformerChain};
pub use session::{ChatSession, Role, Transcript};
pub use stream::{ActivityStream, OutputStream};
pub use subscriber::{IntoSubscribers, TurnSubscriber};
pub use transport::Transport;
pub use turn::{TurnAccumulator, TurnResult};

pub use copilot_chat_core as core;
