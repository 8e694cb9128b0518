use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use brewline_core::CheckoutError;
use brewline_order::client::CreateOrderEnvelope;
use brewline_order::signature::verify_payment_signature;
use brewline_shared::models::events::{topics, PaymentOrderCreatedEvent};
use brewline_shared::pii::Masked;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    /// Major units
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentBody {
    #[serde(alias = "razorpay_order_id")]
    pub order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: Masked<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify-payment", post(verify_payment))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /create-order
/// Create a gateway order for the cart total. Every failure is a 500 envelope.
pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<CreateOrderBody>, JsonRejection>,
) -> (StatusCode, Json<CreateOrderEnvelope>) {
    let amount = match body {
        Ok(Json(body)) => body.amount,
        Err(rejection) => {
            tracing::warn!("Rejected create-order body: {}", rejection.body_text());
            return failure(rejection.body_text());
        }
    };

    match state.broker.create_order(amount).await {
        Ok(handle) => {
            state.publish(
                topics::PAYMENTS,
                &PaymentOrderCreatedEvent {
                    gateway_order_id: handle.gateway_order_id.clone(),
                    amount_minor_units: handle.amount_minor_units,
                    currency: handle.currency.clone(),
                    timestamp: Utc::now().timestamp(),
                },
            );
            (StatusCode::OK, Json(CreateOrderEnvelope::ok(handle)))
        }
        Err(e) => {
            tracing::error!("Payment order for {} failed: {}", amount, e);
            failure(broker_error_message(&e))
        }
    }
}

/// POST /verify-payment
/// Check the signature the widget returned with a successful payment.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(body): Json<VerifyPaymentBody>,
) -> (StatusCode, Json<VerifyPaymentResponse>) {
    match verify_payment_signature(
        &body.order_id,
        &body.payment_id,
        body.signature.expose(),
        state.gateway_secret.expose(),
    ) {
        Ok(()) => (
            StatusCode::OK,
            Json(VerifyPaymentResponse {
                success: true,
                verified: true,
                error: None,
            }),
        ),
        Err(e) => {
            tracing::warn!("Signature check failed for payment {}: {}", body.payment_id, e);
            (
                StatusCode::BAD_REQUEST,
                Json(VerifyPaymentResponse {
                    success: false,
                    verified: false,
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

fn failure(error: impl Into<String>) -> (StatusCode, Json<CreateOrderEnvelope>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(CreateOrderEnvelope::failed(error)),
    )
}

/// Provider text as-is, so the client can show what the gateway said.
fn broker_error_message(err: &CheckoutError) -> String {
    match err {
        CheckoutError::GatewayError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
