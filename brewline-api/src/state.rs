use std::sync::Arc;

use brewline_cart::DeliverySettings;
use brewline_core::events::{Event, EventPublisher, EventSubscriber};
use brewline_core::repository::{
    AnalyticsRepository, DeliverySettingsRepository, NotificationRepository, OrderRepository,
};
use brewline_order::PaymentOrderBroker;
use brewline_shared::pii::Masked;
use brewline_store::{
    BroadcastEventBus, DbClient, InMemoryDeliverySettingsRepository, InMemoryNotificationRepository,
    InMemoryOrderRepository, PgAnalyticsRepository, PgDeliverySettingsRepository, PgNotificationRepository,
    PgOrderRepository,
};
use serde::Serialize;

use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: Masked<String>,
    pub issuer: Option<String>,
}

/// Storage backends behind the handlers
#[derive(Clone)]
pub struct Repositories {
    pub settings: Arc<dyn DeliverySettingsRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub analytics: Arc<dyn AnalyticsRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn postgres(db: &DbClient) -> Self {
        Self {
            settings: Arc::new(PgDeliverySettingsRepository::new(db.pool.clone())),
            orders: Arc::new(PgOrderRepository::new(db.pool.clone())),
            analytics: Arc::new(PgAnalyticsRepository::new(db.pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(db.pool.clone())),
        }
    }

    pub fn in_memory(seed: Option<DeliverySettings>) -> Self {
        let orders = Arc::new(InMemoryOrderRepository::new());
        Self {
            settings: Arc::new(InMemoryDeliverySettingsRepository::new(seed)),
            orders: orders.clone(),
            analytics: orders,
            notifications: Arc::new(InMemoryNotificationRepository::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<PaymentOrderBroker>,
    /// Signs widget callbacks; same credential the broker authenticates with.
    pub gateway_secret: Masked<String>,
    pub repos: Repositories,
    pub publisher: Arc<dyn EventPublisher>,
    pub subscriber: Arc<dyn EventSubscriber>,
    pub sessions: SessionRegistry,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        broker: PaymentOrderBroker,
        gateway_secret: Masked<String>,
        repos: Repositories,
        events: BroadcastEventBus,
        auth: AuthConfig,
    ) -> Self {
        let events = Arc::new(events);
        Self {
            broker: Arc::new(broker),
            gateway_secret,
            repos,
            publisher: events.clone(),
            subscriber: events,
            sessions: SessionRegistry::new(),
            auth,
        }
    }

    /// Fire-and-forget publish; a payload that cannot be encoded is logged and dropped.
    pub fn publish<T: Serialize>(&self, topic: &str, payload: &T) {
        match Event::new(topic, payload) {
            Ok(event) => {
                self.publisher.publish(event);
            }
            Err(e) => tracing::error!("Failed to encode {} event: {}", topic, e),
        }
    }
}
