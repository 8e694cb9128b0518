use async_trait::async_trait;
use brewline_cart::CartItem;
use brewline_core::order::NewOrder;
use brewline_core::payment::{PaymentOrderHandle, PaymentOrderSource, PaymentSuccess};
use brewline_core::CheckoutError;
use brewline_shared::pii::Masked;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkout::OrderPersistence;

#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// Body of `POST /create-order`, both outcomes
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateOrderEnvelope {
    pub fn ok(handle: PaymentOrderHandle) -> Self {
        Self {
            success: true,
            order_id: Some(handle.gateway_order_id),
            amount: Some(handle.amount_minor_units),
            currency: Some(handle.currency),
            key: Some(handle.publishable_key),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            order_id: None,
            amount: None,
            currency: None,
            key: None,
            error: Some(error.into()),
        }
    }
}

/// Body of `POST /orders`: the paid cart plus the gateway's proof of payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmOrderRequest {
    pub items: Vec<CartItem>,
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

#[derive(Debug, Deserialize)]
struct CreatedOrder {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client-side access to the broker and order endpoints
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    bearer: Option<Masked<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer: None,
        }
    }

    pub fn with_bearer(mut self, token: Masked<String>) -> Self {
        self.bearer = Some(token);
        self
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self.client.post(format!("{}{}", self.base_url, path));
        match &self.bearer {
            Some(token) => req.bearer_auth(token.expose()),
            None => req,
        }
    }
}

#[async_trait]
impl PaymentOrderSource for ApiClient {
    async fn request_payment_order(&self, amount: Decimal) -> Result<PaymentOrderHandle, CheckoutError> {
        let response = self
            .post("/create-order")
            .json(&CreateOrderRequest { amount })
            .send()
            .await
            .map_err(|e| CheckoutError::gateway(None, format!("order service unreachable: {}", e)))?;

        let status = response.status().as_u16();
        let envelope: CreateOrderEnvelope = response
            .json()
            .await
            .map_err(|e| CheckoutError::gateway(Some(status), format!("malformed broker response: {}", e)))?;

        match envelope {
            CreateOrderEnvelope {
                success: true,
                order_id: Some(gateway_order_id),
                amount: Some(amount_minor_units),
                currency: Some(currency),
                key: Some(publishable_key),
                ..
            } => Ok(PaymentOrderHandle {
                gateway_order_id,
                amount_minor_units,
                currency,
                publishable_key,
            }),
            CreateOrderEnvelope { error, .. } => Err(CheckoutError::gateway(
                Some(status),
                error.unwrap_or_else(|| "incomplete broker response".to_string()),
            )),
        }
    }
}

#[async_trait]
impl OrderPersistence for ApiClient {
    async fn persist(
        &self,
        order: &NewOrder,
        proof: &PaymentSuccess,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        let items = order
            .lines
            .iter()
            .map(|line| {
                CartItem::new(line.product_id.clone(), line.name.clone(), line.unit_price, line.quantity)
                    .with_attributes(line.attributes.clone())
            })
            .collect();

        let body = ConfirmOrderRequest {
            items,
            gateway_order_id: proof.gateway_order_id.clone(),
            payment_id: proof.payment_id.clone(),
            signature: proof.signature.expose().clone(),
        };

        let response = self.post("/orders").json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(format!("order service returned {}: {}", status, message).into());
        }

        Ok(response.json::<CreatedOrder>().await?.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_broker_success_envelope() {
        let app = Router::new().route(
            "/create-order",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["amount"], json!(2049.0));
                Json(json!({
                    "success": true,
                    "order_id": "order_1",
                    "amount": 204900,
                    "currency": "INR",
                    "key": "rzp_test_public"
                }))
            }),
        );
        let client = ApiClient::new(spawn(app).await);

        let handle = client.request_payment_order(Decimal::from(2049)).await.unwrap();
        assert_eq!(handle.gateway_order_id, "order_1");
        assert_eq!(handle.amount_minor_units, 204900);
        assert_eq!(handle.publishable_key, "rzp_test_public");
    }

    #[tokio::test]
    async fn test_broker_failure_envelope() {
        let app = Router::new().route(
            "/create-order",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "success": false, "error": "Authentication failed" })),
                )
            }),
        );
        let client = ApiClient::new(spawn(app).await);

        let err = client.request_payment_order(Decimal::from(10)).await.unwrap_err();
        assert_eq!(err, CheckoutError::gateway(Some(500), "Authentication failed"));
    }
}
