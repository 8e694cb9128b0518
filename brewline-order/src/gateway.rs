use std::time::Duration;

use async_trait::async_trait;
use brewline_core::payment::{GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentOrderStatus};
use brewline_core::CheckoutError;
use brewline_shared::pii::Masked;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "https://api.razorpay.com";

/// Razorpay orders API over plain REST
pub struct RazorpayGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: Masked<String>,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OrderBody {
    id: String,
    amount: i64,
    currency: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    description: Option<String>,
}

impl From<OrderBody> for GatewayOrder {
    fn from(body: OrderBody) -> Self {
        Self {
            status: PaymentOrderStatus::from_provider(&body.status),
            id: body.id,
            amount_minor_units: body.amount,
            currency: body.currency,
        }
    }
}

impl RazorpayGateway {
    /// Fails fast when either credential is missing. There is no fallback key.
    pub fn new(
        key_id: Option<String>,
        key_secret: Option<Masked<String>>,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CheckoutError> {
        let key_id = key_id
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| CheckoutError::Config("payment gateway key id is not set".to_string()))?;
        let key_secret = key_secret
            .filter(|s| !s.is_blank())
            .ok_or_else(|| CheckoutError::Config("payment gateway key secret is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckoutError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            key_id,
            key_secret,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn key_secret(&self) -> &Masked<String> {
        &self.key_secret
    }

    async fn read_order(&self, response: reqwest::Response) -> Result<GatewayOrder, CheckoutError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(env) => match (env.error.code, env.error.description) {
                    (Some(code), Some(desc)) => format!("{}: {}", code, desc),
                    (None, Some(desc)) => desc,
                    (Some(code), None) => code,
                    (None, None) => status.to_string(),
                },
                Err(_) if text.is_empty() => status.to_string(),
                Err(_) => text,
            };
            tracing::error!("Payment gateway returned {}: {}", status, message);
            return Err(CheckoutError::gateway(Some(status.as_u16()), message));
        }

        let body: OrderBody = response.json().await.map_err(|e| {
            CheckoutError::gateway(Some(status.as_u16()), format!("malformed gateway response: {}", e))
        })?;

        Ok(body.into())
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, CheckoutError> {
        let body = CreateOrderBody {
            amount: request.amount_minor_units,
            currency: &request.currency,
            receipt: &request.receipt,
            notes: &request.notes,
        };

        let response = self
            .client
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose()))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Payment gateway unreachable: {}", e);
                CheckoutError::gateway(None, format!("payment gateway unreachable: {}", e))
            })?;

        let order = self.read_order(response).await?;
        tracing::info!(
            "Created gateway order {} for {} {}",
            order.id,
            order.amount_minor_units,
            order.currency
        );
        Ok(order)
    }

    async fn fetch_order(&self, gateway_order_id: &str) -> Result<GatewayOrder, CheckoutError> {
        let response = self
            .client
            .get(format!("{}/v1/orders/{}", self.base_url, gateway_order_id))
            .basic_auth(&self.key_id, Some(self.key_secret.expose()))
            .send()
            .await
            .map_err(|e| CheckoutError::gateway(None, format!("payment gateway unreachable: {}", e)))?;

        self.read_order(response).await
    }
}
