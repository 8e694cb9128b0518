use async_trait::async_trait;
use brewline_core::dashboard::{AnalyticsSummary, NewNotification, Notification, ProductSales};
use brewline_core::repository::{AnalyticsRepository, NotificationRepository, RepositoryError};
use brewline_core::session::Role;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::StoreError;

const TOP_PRODUCTS: i64 = 5;

pub struct PgAnalyticsRepository {
    pool: PgPool,
}

impl PgAnalyticsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, franchise_id: Option<Uuid>) -> Result<AnalyticsSummary, StoreError> {
        let (orders_count, revenue): (i64, Decimal) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total), 0)
            FROM orders
            WHERE ($1::uuid IS NULL OR franchise_id = $1)
            "#,
        )
        .bind(franchise_id)
        .fetch_one(&self.pool)
        .await?;

        let top = sqlx::query_as::<_, ProductSalesRow>(
            r#"
            SELECT i.product_id,
                   MAX(i.name) AS name,
                   SUM(i.quantity)::BIGINT AS quantity,
                   SUM(i.unit_price * i.quantity) AS revenue
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE ($1::uuid IS NULL OR o.franchise_id = $1)
            GROUP BY i.product_id
            ORDER BY revenue DESC
            LIMIT $2
            "#,
        )
        .bind(franchise_id)
        .bind(TOP_PRODUCTS)
        .fetch_all(&self.pool)
        .await?;

        Ok(AnalyticsSummary::from_totals(
            orders_count,
            revenue,
            top.into_iter().map(Into::into).collect(),
        ))
    }
}

#[derive(sqlx::FromRow)]
struct ProductSalesRow {
    product_id: String,
    name: String,
    quantity: i64,
    revenue: Decimal,
}

impl From<ProductSalesRow> for ProductSales {
    fn from(row: ProductSalesRow) -> Self {
        Self {
            product_id: row.product_id,
            name: row.name,
            quantity: row.quantity,
            revenue: row.revenue,
        }
    }
}

#[async_trait]
impl AnalyticsRepository for PgAnalyticsRepository {
    async fn summary(&self, franchise_id: Option<Uuid>) -> Result<AnalyticsSummary, RepositoryError> {
        Ok(self.load(franchise_id).await?)
    }
}

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_role: String,
    title: String,
    body: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            recipient_role: row.recipient_role.parse::<Role>().map_err(StoreError::Malformed)?,
            title: row.title,
            body: row.body,
            read: row.read,
            created_at: row.created_at,
        })
    }
}

impl PgNotificationRepository {
    async fn for_role(&self, role: Role, limit: i64) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, recipient_role, title, body, read, created_at
            FROM notifications
            WHERE recipient_role = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(role.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn insert(&self, notification: &NewNotification) -> Result<Notification, StoreError> {
        let created = Notification {
            id: Uuid::new_v4(),
            recipient_role: notification.recipient_role,
            title: notification.title.clone(),
            body: notification.body.clone(),
            read: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_role, title, body, read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(created.id)
        .bind(created.recipient_role.as_str())
        .bind(&created.title)
        .bind(&created.body)
        .bind(created.read)
        .bind(created.created_at)
        .execute(&self.pool)
        .await?;

        Ok(created)
    }

    async fn set_read(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn list_for_role(&self, role: Role, limit: i64) -> Result<Vec<Notification>, RepositoryError> {
        Ok(self.for_role(role, limit).await?)
    }

    async fn create(&self, notification: &NewNotification) -> Result<Notification, RepositoryError> {
        Ok(self.insert(notification).await?)
    }

    async fn mark_read(&self, id: Uuid) -> Result<bool, RepositoryError> {
        Ok(self.set_read(id).await?)
    }
}
