pub mod app_config;
pub mod database;
pub mod settings_repo;
pub mod order_repo;
pub mod dashboard_repo;
pub mod memory;
pub mod events;

pub use database::{DbClient, StoreError};
pub use settings_repo::PgDeliverySettingsRepository;
pub use order_repo::PgOrderRepository;
pub use dashboard_repo::{PgAnalyticsRepository, PgNotificationRepository};
pub use memory::{InMemoryDeliverySettingsRepository, InMemoryNotificationRepository, InMemoryOrderRepository};
pub use events::BroadcastEventBus;
