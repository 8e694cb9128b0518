use async_trait::async_trait;
use brewline_shared::pii::Masked;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::CheckoutError;

/// Gateway order lifecycle as reported by the provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOrderStatus {
    Created,
    Attempted,
    Paid,
    Failed,
}

impl PaymentOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Attempted => "attempted",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    /// Map a provider status string. Unknown values are treated as freshly created.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "attempted" => Self::Attempted,
            "paid" | "captured" => Self::Paid,
            "failed" => Self::Failed,
            _ => Self::Created,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentOrderError {
    #[error("Payment order {0} is already paid")]
    AlreadyPaid(String),

    #[error("Invalid payment order transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PaymentOrderStatus,
        to: PaymentOrderStatus,
    },
}

/// An order held at the payment provider before money is collected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub gateway_order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub status: PaymentOrderStatus,
}

impl PaymentOrder {
    pub fn new(gateway_order_id: String, amount_minor_units: i64, currency: String) -> Self {
        Self {
            gateway_order_id,
            amount_minor_units,
            currency,
            status: PaymentOrderStatus::Created,
        }
    }

    pub fn from_handle(handle: &PaymentOrderHandle) -> Self {
        Self::new(
            handle.gateway_order_id.clone(),
            handle.amount_minor_units,
            handle.currency.clone(),
        )
    }

    /// Apply a status reported by the gateway. A paid order never changes again.
    pub fn transition(&mut self, next: PaymentOrderStatus) -> Result<(), PaymentOrderError> {
        use PaymentOrderStatus::*;

        if self.status == Paid {
            return Err(PaymentOrderError::AlreadyPaid(self.gateway_order_id.clone()));
        }

        let allowed = matches!(
            (self.status, next),
            (Created, Attempted)
                | (Created, Failed)
                | (Attempted, Paid)
                | (Attempted, Failed)
                | (Failed, Attempted)
        ) || self.status == next;

        if !allowed {
            return Err(PaymentOrderError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        Ok(())
    }
}

/// What the broker hands back to the checkout flow and the payment widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOrderHandle {
    pub gateway_order_id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    /// Public key id for the widget. Never the secret.
    pub publishable_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    pub amount_minor_units: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOrder {
    pub id: String,
    pub amount_minor_units: i64,
    pub currency: String,
    pub status: PaymentOrderStatus,
}

/// Widget callback payload after the user pays
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentSuccess {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: Masked<String>,
}

/// Provider-side order creation. Holds the secret credential, so only the server implements it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create one remote order. Failures come back as [`CheckoutError::GatewayError`].
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, CheckoutError>;

    /// Read back an order, e.g. to check the amount before persisting.
    async fn fetch_order(&self, gateway_order_id: &str) -> Result<GatewayOrder, CheckoutError>;
}

/// Anything the checkout flow can ask for a payment order: the in-process
/// broker or an HTTP client talking to it.
#[async_trait]
pub trait PaymentOrderSource: Send + Sync {
    async fn request_payment_order(&self, amount: Decimal) -> Result<PaymentOrderHandle, CheckoutError>;
}

/// Major units to the gateway's minor unit, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, CheckoutError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| {
            minor
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
        })
        .ok_or(CheckoutError::InvalidAmount(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> PaymentOrder {
        PaymentOrder::new("order_Abc123".to_string(), 204900, "INR".to_string())
    }

    #[test]
    fn test_minor_unit_conversion_rounds() {
        assert_eq!(to_minor_units(Decimal::from(2049)).unwrap(), 204900);
        assert_eq!(to_minor_units(Decimal::new(19999, 2)).unwrap(), 19999);
        assert_eq!(to_minor_units(Decimal::new(10005, 3)).unwrap(), 1001);
        assert_eq!(to_minor_units(Decimal::new(10004, 3)).unwrap(), 1000);
    }

    #[test]
    fn test_minor_unit_conversion_out_of_range() {
        let huge = Decimal::from_str_exact("10000000000000000000000000000").unwrap();
        assert_eq!(to_minor_units(huge), Err(CheckoutError::InvalidAmount(huge)));

        // fits in a Decimal after scaling but not in an i64
        let large = Decimal::from(i64::MAX);
        assert_eq!(to_minor_units(large), Err(CheckoutError::InvalidAmount(large)));
    }

    #[test]
    fn test_payment_order_happy_path() {
        let mut o = order();
        o.transition(PaymentOrderStatus::Attempted).unwrap();
        o.transition(PaymentOrderStatus::Paid).unwrap();
        assert_eq!(o.status, PaymentOrderStatus::Paid);
    }

    #[test]
    fn test_paid_order_is_immutable() {
        let mut o = order();
        o.transition(PaymentOrderStatus::Attempted).unwrap();
        o.transition(PaymentOrderStatus::Paid).unwrap();

        let result = o.transition(PaymentOrderStatus::Failed);
        assert_eq!(result, Err(PaymentOrderError::AlreadyPaid("order_Abc123".to_string())));
        assert_eq!(o.status, PaymentOrderStatus::Paid);
    }

    #[test]
    fn test_cannot_skip_attempt() {
        let mut o = order();
        assert!(o.transition(PaymentOrderStatus::Paid).is_err());
    }

    #[test]
    fn test_failed_order_can_be_reattempted() {
        let mut o = order();
        o.transition(PaymentOrderStatus::Attempted).unwrap();
        o.transition(PaymentOrderStatus::Failed).unwrap();
        o.transition(PaymentOrderStatus::Attempted).unwrap();
        assert_eq!(o.status, PaymentOrderStatus::Attempted);
    }

    #[test]
    fn test_provider_status_mapping() {
        assert_eq!(PaymentOrderStatus::from_provider("paid"), PaymentOrderStatus::Paid);
        assert_eq!(PaymentOrderStatus::from_provider("created"), PaymentOrderStatus::Created);
        assert_eq!(PaymentOrderStatus::from_provider("weird"), PaymentOrderStatus::Created);
    }
}
