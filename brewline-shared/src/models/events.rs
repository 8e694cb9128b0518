use rust_decimal::Decimal;
use uuid::Uuid;

/// Topic names used on the event bus.
pub mod topics {
    pub const ORDERS: &str = "orders";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const DELIVERY_SETTINGS: &str = "delivery_settings";
    pub const PAYMENTS: &str = "payments";

    pub const ALL: [&str; 4] = [ORDERS, NOTIFICATIONS, DELIVERY_SETTINGS, PAYMENTS];
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentOrderCreatedEvent {
    pub gateway_order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderPaidEvent {
    pub order_id: Uuid,
    pub franchise_id: Option<Uuid>,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub total: Decimal,
    pub currency: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct NotificationRaisedEvent {
    pub notification_id: Uuid,
    pub recipient_role: String,
    pub title: String,
    pub timestamp: i64,
}
