use async_trait::async_trait;
use brewline_cart::DeliverySettings;
use uuid::Uuid;

use crate::dashboard::{AnalyticsSummary, NewNotification, Notification};
use crate::order::{NewOrder, OrderRecord};
use crate::session::Role;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Repository trait for the delivery settings row
#[async_trait]
pub trait DeliverySettingsRepository: Send + Sync {
    /// The single active row, if any.
    async fn fetch_active(&self) -> Result<Option<DeliverySettings>, RepositoryError>;

    /// Replace the active row.
    async fn save(&self, settings: &DeliverySettings) -> Result<(), RepositoryError>;
}

/// Repository trait for order persistence
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderRecord, RepositoryError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepositoryError>;

    async fn find_by_gateway_order(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<OrderRecord>, RepositoryError>;

    /// Newest first. `None` lists every franchise.
    async fn list_orders(
        &self,
        franchise_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<OrderRecord>, RepositoryError>;
}

/// Repository trait behind the owner/admin dashboard charts
#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
    async fn summary(&self, franchise_id: Option<Uuid>) -> Result<AnalyticsSummary, RepositoryError>;
}

/// Repository trait for dashboard notifications
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn list_for_role(&self, role: Role, limit: i64) -> Result<Vec<Notification>, RepositoryError>;

    async fn create(&self, notification: &NewNotification) -> Result<Notification, RepositoryError>;

    /// `false` when no such notification exists.
    async fn mark_read(&self, id: Uuid) -> Result<bool, RepositoryError>;
}
