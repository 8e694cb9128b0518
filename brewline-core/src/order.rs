use std::str::FromStr;

use brewline_cart::{CartItem, CartSummary};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted order status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Paid,
    Processing,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "PAID",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Delivered => "DELIVERED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(OrderStatus::Paid),
            "PROCESSING" => Ok(OrderStatus::Processing),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            other => Err(format!("unknown order status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub attributes: serde_json::Value,
}

impl OrderLine {
    /// `None` for a line that could not have passed cart validation.
    pub fn from_cart_item(item: &CartItem) -> Option<Self> {
        if !item.is_valid() {
            return None;
        }
        Some(Self {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            unit_price: item.unit_price?,
            quantity: item.quantity,
            attributes: item.attributes.clone(),
        })
    }
}

/// An order ready to be written after the gateway confirmed payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub franchise_id: Option<Uuid>,
    pub placed_by: String,
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
}

impl NewOrder {
    pub fn from_cart(
        items: &[CartItem],
        summary: &CartSummary,
        currency: &str,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Self {
        Self {
            franchise_id: None,
            placed_by: String::new(),
            lines: items.iter().filter_map(OrderLine::from_cart_item).collect(),
            subtotal: summary.subtotal,
            delivery_fee: summary.delivery_fee,
            total: summary.total,
            currency: currency.to_string(),
            gateway_order_id: gateway_order_id.to_string(),
            gateway_payment_id: gateway_payment_id.to_string(),
        }
    }

    pub fn placed_by(mut self, user_id: &str, franchise_id: Option<Uuid>) -> Self {
        self.placed_by = user_id.to_string();
        self.franchise_id = franchise_id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: Uuid,
    pub status: OrderStatus,
    #[serde(flatten)]
    pub order: NewOrder,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn paid(order: NewOrder) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: OrderStatus::Paid,
            order,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewline_cart::Cart;

    #[test]
    fn test_new_order_from_cart_copies_totals() {
        let mut cart = Cart::default();
        cart.add_item(CartItem::new("assam-1kg", "Assam 1kg", Decimal::from(900), 2)).unwrap();

        let order = NewOrder::from_cart(cart.items(), cart.summary(), "INR", "order_1", "pay_1")
            .placed_by("user-7", None);

        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.subtotal, Decimal::from(1800));
        assert_eq!(order.delivery_fee, Decimal::from(50));
        assert_eq!(order.total, Decimal::from(1850));
        assert_eq!(order.placed_by, "user-7");
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [OrderStatus::Paid, OrderStatus::Processing, OrderStatus::Delivered] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }
}
