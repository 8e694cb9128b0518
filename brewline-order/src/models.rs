use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Checkout flow status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutState {
    Idle,
    AwaitingPaymentOrder,
    AwaitingUserPayment,
    Confirming,
    Completed,
    Failed,
}

impl CheckoutState {
    /// States in which a new checkout may start.
    pub fn can_begin(&self) -> bool {
        matches!(
            self,
            CheckoutState::Idle
                | CheckoutState::Completed
                | CheckoutState::Failed
                | CheckoutState::AwaitingPaymentOrder
        )
    }
}

/// Identifies one checkout attempt. Callbacks carrying an older ticket are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutTicket {
    pub attempt: u64,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Transient message for the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Set when the user should quote something to support
    pub support_reference: Option<String>,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            support_reference: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            support_reference: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            support_reference: None,
        }
    }
}
