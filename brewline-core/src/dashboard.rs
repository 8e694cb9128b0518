use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub orders_count: i64,
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub top_products: Vec<ProductSales>,
}

impl AnalyticsSummary {
    pub fn empty() -> Self {
        Self {
            orders_count: 0,
            revenue: Decimal::ZERO,
            average_order_value: Decimal::ZERO,
            top_products: Vec::new(),
        }
    }

    /// Average is rounded to two places; zero when there are no orders.
    pub fn from_totals(orders_count: i64, revenue: Decimal, top_products: Vec<ProductSales>) -> Self {
        let average_order_value = if orders_count > 0 {
            (revenue / Decimal::from(orders_count)).round_dp(2)
        } else {
            Decimal::ZERO
        };
        Self {
            orders_count,
            revenue,
            average_order_value,
            top_products,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_role: Role,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub recipient_role: Role,
    pub title: String,
    pub body: String,
}
