pub mod dashboard;
pub mod delivery;
pub mod events;
pub mod order;
pub mod payment;
pub mod repository;
pub mod session;

use rust_decimal::Decimal;

/// Failures a checkout can surface to the user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckoutError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    #[error("Payment gateway error (status {status:?}): {message}")]
    GatewayError {
        status: Option<u16>,
        message: String,
    },

    #[error("Delivery settings unavailable: {0}")]
    SettingsUnavailable(String),

    #[error("Order could not be saved after payment {payment_id}: {message}")]
    PersistenceError {
        payment_id: String,
        message: String,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Cart contains items without a quantity or price")]
    InvalidCart,

    #[error("Payment was cancelled")]
    Cancelled,

    #[error("A checkout is already in progress")]
    Busy,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CheckoutError {
    pub fn gateway(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::GatewayError {
            status,
            message: message.into(),
        }
    }

    /// Text for the transient notice shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidAmount(_) => "The order amount is not valid.".to_string(),
            Self::GatewayError { .. } => {
                "We could not reach the payment provider. Your cart is saved, please try again.".to_string()
            }
            Self::SettingsUnavailable(_) => "Using standard delivery charges.".to_string(),
            Self::PersistenceError { payment_id, .. } => format!(
                "Your payment went through but we could not save the order. \
                 Do not pay again. Please contact support with payment reference {}.",
                payment_id
            ),
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::InvalidCart => "Some items in your cart need attention before checkout.".to_string(),
            Self::Cancelled => "Payment cancelled. Your cart is still here.".to_string(),
            Self::Busy => "Please finish or cancel the current payment first.".to_string(),
            Self::Config(_) => "Payments are temporarily unavailable.".to_string(),
        }
    }

    /// Payment reference to quote to support when money has moved but the
    /// order was not saved.
    pub fn support_reference(&self) -> Option<&str> {
        match self {
            Self::PersistenceError { payment_id, .. } => Some(payment_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_message_carries_payment_reference() {
        let err = CheckoutError::PersistenceError {
            payment_id: "pay_29QQoUBi66xm2f".to_string(),
            message: "connection reset".to_string(),
        };
        assert_eq!(err.support_reference(), Some("pay_29QQoUBi66xm2f"));
        assert!(err.user_message().contains("pay_29QQoUBi66xm2f"));
        assert_eq!(CheckoutError::Cancelled.support_reference(), None);
    }

    #[test]
    fn test_gateway_error_display() {
        let err = CheckoutError::gateway(Some(401), "Authentication failed");
        assert_eq!(
            err.to_string(),
            "Payment gateway error (status Some(401)): Authentication failed"
        );
    }
}
