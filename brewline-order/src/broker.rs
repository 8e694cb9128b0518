use std::sync::Arc;

use async_trait::async_trait;
use brewline_core::payment::{
    to_minor_units, GatewayOrderRequest, PaymentGateway, PaymentOrderHandle, PaymentOrderSource,
};
use brewline_core::CheckoutError;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Trusted server-side glue between checkout and the payment gateway.
///
/// Embeds the gateway credential through its [`PaymentGateway`], so it must
/// never run in the untrusted client. Each successful call creates exactly
/// one remote order; failures are returned as-is and never retried, since a
/// retry after a timeout could leave two orders at the provider.
pub struct PaymentOrderBroker {
    gateway: Arc<dyn PaymentGateway>,
    publishable_key: String,
    currency: String,
}

impl PaymentOrderBroker {
    pub fn new(gateway: Arc<dyn PaymentGateway>, publishable_key: String, currency: String) -> Self {
        Self {
            gateway,
            publishable_key,
            currency,
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn gateway(&self) -> &Arc<dyn PaymentGateway> {
        &self.gateway
    }

    /// Create a gateway order for an amount in major units.
    pub async fn create_order(&self, amount: Decimal) -> Result<PaymentOrderHandle, CheckoutError> {
        if amount <= Decimal::ZERO {
            tracing::warn!("Rejected payment order for non-positive amount {}", amount);
            return Err(CheckoutError::InvalidAmount(amount));
        }

        let amount_minor_units = to_minor_units(amount)?;
        if amount_minor_units <= 0 {
            return Err(CheckoutError::InvalidAmount(amount));
        }

        let request = GatewayOrderRequest {
            amount_minor_units,
            currency: self.currency.clone(),
            receipt: format!("rcpt_{}", Uuid::new_v4().simple()),
            notes: serde_json::json!({ "amount_major": amount.to_string() }),
        };

        let order = self.gateway.create_order(&request).await?;

        Ok(PaymentOrderHandle {
            gateway_order_id: order.id,
            amount_minor_units: order.amount_minor_units,
            currency: order.currency,
            publishable_key: self.publishable_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentOrderSource for PaymentOrderBroker {
    async fn request_payment_order(&self, amount: Decimal) -> Result<PaymentOrderHandle, CheckoutError> {
        self.create_order(amount).await
    }
}
