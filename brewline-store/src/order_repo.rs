use std::collections::HashMap;

use async_trait::async_trait;
use brewline_core::order::{NewOrder, OrderLine, OrderRecord, OrderStatus};
use brewline_core::repository::{OrderRepository, RepositoryError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::StoreError;

const ORDER_COLUMNS: &str = "id, franchise_id, placed_by, status, subtotal, delivery_fee, total, currency, \
                             gateway_order_id, gateway_payment_id, created_at";

pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    franchise_id: Option<Uuid>,
    placed_by: String,
    status: String,
    subtotal: Decimal,
    delivery_fee: Decimal,
    total: Decimal,
    currency: String,
    gateway_order_id: String,
    gateway_payment_id: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: String,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    attributes: Value,
}

impl OrderRow {
    fn into_record(self, lines: Vec<OrderLine>) -> Result<OrderRecord, StoreError> {
        let status = self.status.parse::<OrderStatus>().map_err(StoreError::Malformed)?;
        Ok(OrderRecord {
            id: self.id,
            status,
            order: NewOrder {
                franchise_id: self.franchise_id,
                placed_by: self.placed_by,
                lines,
                subtotal: self.subtotal,
                delivery_fee: self.delivery_fee,
                total: self.total,
                currency: self.currency,
                gateway_order_id: self.gateway_order_id,
                gateway_payment_id: self.gateway_payment_id,
            },
            created_at: self.created_at,
        })
    }
}

impl PgOrderRepository {
    async fn insert(&self, order: &NewOrder) -> Result<OrderRecord, StoreError> {
        let record = OrderRecord::paid(order.clone());
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (id, franchise_id, placed_by, status, subtotal, delivery_fee, total, currency,
                                gateway_order_id, gateway_payment_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (gateway_order_id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(order.franchise_id)
        .bind(&order.placed_by)
        .bind(record.status.as_str())
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.total)
        .bind(&order.currency)
        .bind(&order.gateway_order_id)
        .bind(&order.gateway_payment_id)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            tracing::info!("Order for gateway order {} already saved", order.gateway_order_id);
            return self
                .by_gateway_order(&order.gateway_order_id)
                .await?
                .ok_or_else(|| StoreError::Malformed(format!("order {} vanished", order.gateway_order_id)));
        }

        for (position, line) in order.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, position, product_id, name, unit_price, quantity, attributes)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(record.id)
            .bind(position as i32)
            .bind(&line.product_id)
            .bind(&line.name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .bind(&line.attributes)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(record)
    }

    async fn by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE gateway_order_id = $1",
            ORDER_COLUMNS
        ))
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    async fn by_id(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(self.hydrate(row.into_iter().collect()).await?.pop())
    }

    async fn recent(&self, franchise_id: Option<Uuid>, limit: i64) -> Result<Vec<OrderRecord>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE ($1::uuid IS NULL OR franchise_id = $1) ORDER BY created_at DESC LIMIT $2",
            ORDER_COLUMNS
        ))
        .bind(franchise_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// Attach line items to order rows, keeping row order.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<OrderRecord>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, product_id, name, unit_price, quantity, attributes
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
        for item in items {
            lines.entry(item.order_id).or_default().push(OrderLine {
                product_id: item.product_id,
                name: item.name,
                unit_price: item.unit_price,
                quantity: item.quantity,
                attributes: item.attributes,
            });
        }

        rows.into_iter()
            .map(|row| {
                let order_lines = lines.remove(&row.id).unwrap_or_default();
                row.into_record(order_lines)
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> Result<OrderRecord, RepositoryError> {
        let record = self.insert(order).await?;
        tracing::info!("Saved order {} ({} {})", record.id, order.total, order.currency);
        Ok(record)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<OrderRecord>, RepositoryError> {
        Ok(self.by_id(id).await?)
    }

    async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<OrderRecord>, RepositoryError> {
        Ok(self.by_gateway_order(gateway_order_id).await?)
    }

    async fn list_orders(&self, franchise_id: Option<Uuid>, limit: i64) -> Result<Vec<OrderRecord>, RepositoryError> {
        Ok(self.recent(franchise_id, limit).await?)
    }
}
