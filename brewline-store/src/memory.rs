//! Process-local repositories, used when no database is configured and in tests.

use std::collections::HashMap;

use async_trait::async_trait;
use brewline_cart::DeliverySettings;
use brewline_core::dashboard::{AnalyticsSummary, NewNotification, Notification, ProductSales};
use brewline_core::order::{NewOrder, OrderRecord};
use brewline_core::repository::{
    AnalyticsRepository, DeliverySettingsRepository, NotificationRepository, OrderRepository, RepositoryError,
};
use brewline_core::session::Role;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryDeliverySettingsRepository {
    settings: RwLock<Option<DeliverySettings>>,
}

impl InMemoryDeliverySettingsRepository {
    pub fn new(settings: Option<DeliverySettings>) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl DeliverySettingsRepository for InMemoryDeliverySettingsRepository {
    async fn fetch_active(&self) -> Result<Option<DeliverySettings>, RepositoryError> {
        Ok(self.settings.read().await.clone().filter(|s| s.active))
    }

    async fn save(&self, settings: &DeliverySettings) -> Result<(), RepositoryError> {
        *self.settings.write().await = Some(settings.clone());
        Ok(())
    }
}

/// Orders plus the analytics derived from them
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<OrderRecord>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderRecord, RepositoryError> {
        let mut orders = self.orders.write().await;
        if let Some(existing) = orders
            .iter()
            .find(|o| o.order.gateway_order_id == order.gateway_order_id)
        {
            return Ok(existing.clone());
        }

        let record = OrderRecord::paid(order.clone());
        orders.push(record.clone());
        Ok(record)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepositoryError> {
        Ok(self.orders.read().await.iter().find(|o| o.id == id).cloned())
    }

    async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<OrderRecord>, RepositoryError> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .find(|o| o.order.gateway_order_id == gateway_order_id)
            .cloned())
    }

    async fn list_orders(&self, franchise_id: Option<Uuid>, limit: i64) -> Result<Vec<OrderRecord>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .rev()
            .filter(|o| franchise_id.is_none() || o.order.franchise_id == franchise_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalyticsRepository for InMemoryOrderRepository {
    async fn summary(&self, franchise_id: Option<Uuid>) -> Result<AnalyticsSummary, RepositoryError> {
        let orders = self.orders.read().await;
        let scoped: Vec<&OrderRecord> = orders
            .iter()
            .filter(|o| franchise_id.is_none() || o.order.franchise_id == franchise_id)
            .collect();

        let revenue = scoped
            .iter()
            .fold(Decimal::ZERO, |acc, o| acc.saturating_add(o.order.total));

        let mut products: HashMap<&str, ProductSales> = HashMap::new();
        for line in scoped.iter().flat_map(|o| o.order.lines.iter()) {
            let entry = products.entry(line.product_id.as_str()).or_insert_with(|| ProductSales {
                product_id: line.product_id.clone(),
                name: line.name.clone(),
                quantity: 0,
                revenue: Decimal::ZERO,
            });
            entry.quantity = entry.quantity.saturating_add(i64::from(line.quantity));
            entry.revenue = entry
                .revenue
                .saturating_add(line.unit_price.saturating_mul(Decimal::from(line.quantity)));
        }

        let mut top: Vec<ProductSales> = products.into_values().collect();
        top.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.product_id.cmp(&b.product_id)));
        top.truncate(5);

        Ok(AnalyticsSummary::from_totals(scoped.len() as i64, revenue, top))
    }
}

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: RwLock<Vec<Notification>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn list_for_role(&self, role: Role, limit: i64) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .rev()
            .filter(|n| n.recipient_role == role)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn create(&self, notification: &NewNotification) -> Result<Notification, RepositoryError> {
        let created = Notification {
            id: Uuid::new_v4(),
            recipient_role: notification.recipient_role,
            title: notification.title.clone(),
            body: notification.body.clone(),
            read: false,
            created_at: Utc::now(),
        };
        self.notifications.write().await.push(created.clone());
        Ok(created)
    }

    async fn mark_read(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut notifications = self.notifications.write().await;
        match notifications.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
