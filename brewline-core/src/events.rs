use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde::{Deserialize, Serialize};

/// A live update delivered to dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new<T: Serialize>(topic: &str, payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic: topic.to_string(),
            payload: serde_json::to_value(payload)?,
            occurred_at: Utc::now(),
        })
    }
}

/// Events for one topic. Dropping the stream ends the subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Event> + Send>>;

pub trait EventSubscriber: Send + Sync {
    fn subscribe(&self, topic: &str) -> EventStream;
}

pub trait EventPublisher: Send + Sync {
    /// Returns how many live subscribers saw the event.
    fn publish(&self, event: Event) -> usize;
}
