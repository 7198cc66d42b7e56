//! Middleware for activity stream transformation.
//!
//! Transformers sit between the transport and the decoder, so they see raw
//! activities before any classification happens. They can be chained to
//! inspect, filter, or rewrite a turn's activities.
//!
//! # Example
//!
//! ```rust,no_run
//! use copilot_chat_client::middleware::record::ActivityRecorder;
//! use copilot_chat_client::middleware::TransformerChain;
//!
//! let chain = TransformerChain::new().push(ActivityRecorder::new("/tmp/activities_debug.json"));
//! ```

pub mod record;

use crate::stream::ActivityStream;

/// A stream transformer that can modify, filter, or observe activity streams.
pub trait ActivityTransformer: Send + Sync {
    /// Transform an activity stream into another activity stream.
    fn transform<'a>(&'a self, stream: ActivityStream<'a>) -> ActivityStream<'a>;
}

/// Extension trait for chaining activity transformers.
pub trait ActivityStreamExt<'a>: Sized {
    /// Apply a transformer to this stream.
    fn with_transformer<T: ActivityTransformer>(self, transformer: &'a T) -> ActivityStream<'a>;
}

impl<'a> ActivityStreamExt<'a> for ActivityStream<'a> {
    fn with_transformer<T: ActivityTransformer>(self, transformer: &'a T) -> ActivityStream<'a> {
        transformer.transform(self)
    }
}

/// An ordered chain of activity transformers.
#[derive(Default)]
pub struct TransformerChain {
    transformers: Vec<Box<dyn ActivityTransformer>>,
}

impl TransformerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transformer to the chain.
    ///
    /// Transformers are applied in the order they are added.
    pub fn push<T: ActivityTransformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Apply all transformers in the chain to an activity stream.
    pub fn apply<'a>(&'a self, mut stream: ActivityStream<'a>) -> ActivityStream<'a> {
        for transformer in &self.transformers {
            stream = transformer.transform(stream);
        }
        stream
    }
}

impl std::fmt::Debug for TransformerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerChain")
            .field("len", &self.transformers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_chat_core::activity::{Activity, ActivityType};
    use futures::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTransformer {
        count: Arc<AtomicUsize>,
    }

    impl ActivityTransformer for CountingTransformer {
        fn transform<'a>(&'a self, stream: ActivityStream<'a>) -> ActivityStream<'a> {
            let count = &self.count;
            Box::pin(stream.map(move |activity| {
                count.fetch_add(1, Ordering::SeqCst);
                activity
            }))
        }
    }

    struct DropTyping;

    impl ActivityTransformer for DropTyping {
        fn transform<'a>(&'a self, stream: ActivityStream<'a>) -> ActivityStream<'a> {
            Box::pin(stream.filter(|activity| {
                let keep = !matches!(activity, Ok(a) if a.activity_type == ActivityType::Typing);
                futures::future::ready(keep)
            }))
        }
    }

    fn create_test_stream() -> ActivityStream<'static> {
        let activities = vec![
            Ok(Activity::new(ActivityType::Typing).with_text("Searching")),
            Ok(Activity::new(ActivityType::Message).with_text("Answer")),
        ];
        Box::pin(stream::iter(activities))
    }

    #[tokio::test]
    async fn transformer_sees_every_activity() {
        let transformer = CountingTransformer {
            count: Arc::new(AtomicUsize::new(0)),
        };
        let activities: Vec<_> = create_test_stream()
            .with_transformer(&transformer)
            .collect()
            .await;

        assert_eq!(activities.len(), 2);
        assert_eq!(transformer.count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn chain_applies_in_order() {
        let after_filter = Arc::new(AtomicUsize::new(0));
        let chain = TransformerChain::new().push(DropTyping).push(CountingTransformer {
            count: after_filter.clone(),
        });
        assert_eq!(chain.len(), 2);

        let activities: Vec<_> = chain.apply(create_test_stream()).collect().await;

        assert_eq!(activities.len(), 1);
        assert_eq!(after_filter.load(Ordering::SeqCst), 1);
    }
}
