use brewline_core::events::{Event, EventPublisher, EventStream, EventSubscriber};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

/// In-process fan-out of dashboard events.
///
/// Every subscriber gets its own receiver filtered to one topic. A slow
/// subscriber that falls more than `capacity` events behind skips the
/// missed ones instead of blocking publishers.
#[derive(Clone)]
pub struct BroadcastEventBus {
    tx: broadcast::Sender<Event>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

impl EventPublisher for BroadcastEventBus {
    fn publish(&self, event: Event) -> usize {
        let topic = event.topic.clone();
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!("Published {} event to {} subscribers", topic, receivers);
                receivers
            }
            // nobody listening
            Err(_) => 0,
        }
    }
}

impl EventSubscriber for BroadcastEventBus {
    fn subscribe(&self, topic: &str) -> EventStream {
        let topic = topic.to_string();
        let stream = BroadcastStream::new(self.tx.subscribe()).filter_map(move |msg| match msg {
            Ok(event) if event.topic == topic => Some(event),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Subscriber to {} lagged, skipped {} events", topic, skipped);
                None
            }
        });
        Box::pin(stream)
    }
}
