use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use brewline_api::middleware::auth::encode_session_token;
use brewline_api::{app, AppState, AuthConfig, Repositories};
use brewline_core::payment::{GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentOrderStatus};
use brewline_core::session::{Role, SessionContext};
use brewline_core::CheckoutError;
use brewline_order::signature::sign_payment;
use brewline_order::PaymentOrderBroker;
use brewline_shared::pii::Masked;
use brewline_store::BroadcastEventBus;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const GATEWAY_SECRET: &str = "test_gateway_secret";
const JWT_SECRET: &str = "test_jwt_secret";

/// Gateway double that remembers the orders it created.
#[derive(Default)]
struct FakeGateway {
    calls: AtomicUsize,
    fail_with: Option<CheckoutError>,
    orders: Mutex<HashMap<String, GatewayOrder>>,
}

impl FakeGateway {
    fn failing(err: CheckoutError) -> Self {
        Self {
            fail_with: Some(err),
            ..Default::default()
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, CheckoutError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let order = GatewayOrder {
            id: format!("order_test_{}", n),
            amount_minor_units: request.amount_minor_units,
            currency: request.currency.clone(),
            status: PaymentOrderStatus::Created,
        };
        self.orders.lock().unwrap().insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, gateway_order_id: &str) -> Result<GatewayOrder, CheckoutError> {
        self.orders
            .lock()
            .unwrap()
            .get(gateway_order_id)
            .cloned()
            .ok_or_else(|| CheckoutError::gateway(Some(400), "The id provided does not exist"))
    }
}

struct Harness {
    state: AppState,
    gateway: Arc<FakeGateway>,
}

fn harness(gateway: FakeGateway) -> Harness {
    let gateway = Arc::new(gateway);
    let broker = PaymentOrderBroker::new(gateway.clone(), "rzp_test_key".to_string(), "INR".to_string());
    let state = AppState::new(
        broker,
        Masked::new(GATEWAY_SECRET.to_string()),
        Repositories::in_memory(None),
        BroadcastEventBus::new(16),
        AuthConfig {
            secret: Masked::new(JWT_SECRET.to_string()),
            issuer: None,
        },
    );
    Harness { state, gateway }
}

fn token(role: Role, franchise_id: Option<Uuid>) -> String {
    let session = SessionContext {
        session_id: Uuid::new_v4(),
        user_id: format!("{}-user", role),
        role,
        franchise_id,
        expires_at: Utc::now() + Duration::hours(1),
    };
    let claims = brewline_api::middleware::SessionClaims::for_session(&session);
    encode_session_token(&claims, JWT_SECRET).unwrap()
}

fn request(method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
    let response = app(state.clone()).oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn two_thousand_cart() -> Value {
    json!([
        { "product_id": "assam-1kg", "name": "Assam 1kg", "unit_price": 1200, "quantity": 1 },
        { "product_id": "cups-100", "name": "Paper cups", "unit_price": 400, "quantity": 2 }
    ])
}

/// Create a gateway order and sign a matching payment callback.
async fn paid_order(h: &Harness, amount: Value) -> (String, String, String) {
    let (status, body) = send(
        &h.state,
        request(Method::POST, "/create-order", Some(json!({ "amount": amount })), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let order_id = body["order_id"].as_str().unwrap().to_string();
    let payment_id = format!("pay_{}", Uuid::new_v4().simple());
    let signature = sign_payment(&order_id, &payment_id, GATEWAY_SECRET).unwrap();
    (order_id, payment_id, signature)
}

#[tokio::test]
async fn test_health() {
    let h = harness(FakeGateway::default());
    let (status, body) = send(&h.state, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_order_returns_handle_in_minor_units() {
    let h = harness(FakeGateway::default());
    let (status, body) = send(
        &h.state,
        request(Method::POST, "/create-order", Some(json!({ "amount": 2049 })), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["order_id"], "order_test_0");
    assert_eq!(body["amount"], 204900);
    assert_eq!(body["currency"], "INR");
    assert_eq!(body["key"], "rzp_test_key");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn test_create_order_rejects_non_positive_amount_without_gateway_call() {
    let h = harness(FakeGateway::default());
    for amount in [json!(0), json!(-5)] {
        let (status, body) = send(
            &h.state,
            request(Method::POST, "/create-order", Some(json!({ "amount": amount })), None),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Invalid amount"));
    }
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_order_out_of_range_amount_is_failure_envelope() {
    let h = harness(FakeGateway::default());
    let (status, body) = send(
        &h.state,
        request(
            Method::POST,
            "/create-order",
            Some(json!({ "amount": "10000000000000000000000000000" })),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("Invalid amount"));
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_order_surfaces_gateway_error() {
    let h = harness(FakeGateway::failing(CheckoutError::gateway(Some(401), "Authentication failed")));
    let (status, body) = send(
        &h.state,
        request(Method::POST, "/create-order", Some(json!({ "amount": 500 })), None),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "success": false, "error": "Authentication failed" }));
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_create_order_malformed_body_is_failure_envelope() {
    let h = harness(FakeGateway::default());
    let (status, body) = send(
        &h.state,
        request(Method::POST, "/create-order", Some(json!({ "total": 10 })), None),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(h.gateway.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cors_preflight() {
    let h = harness(FakeGateway::default());
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/create-order")
        .header(header::ORIGIN, "https://shop.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = app(h.state.clone()).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_delivery_settings_default_source() {
    let h = harness(FakeGateway::default());
    let (status, body) = send(&h.state, request(Method::GET, "/delivery-settings", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "default");
    assert_eq!(body["base_delivery_fee"], "50");
    assert_eq!(body["free_delivery_threshold"], "2000");
    assert_eq!(body["express_delivery_fee"], "100");
}

#[tokio::test]
async fn test_cart_quote_applies_delivery_threshold() {
    let h = harness(FakeGateway::default());

    let below = json!({ "items": [{ "product_id": "a", "name": "A", "unit_price": 1999, "quantity": 1 }] });
    let (status, body) = send(&h.state, request(Method::POST, "/cart/quote", Some(below), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subtotal"], "1999");
    assert_eq!(body["delivery_fee"], "50");
    assert_eq!(body["total"], "2049");
    assert_eq!(body["valid"], true);
    assert_eq!(body["remaining_for_free_delivery"], "1");

    let at = json!({ "items": two_thousand_cart() });
    let (_, body) = send(&h.state, request(Method::POST, "/cart/quote", Some(at), None)).await;
    assert_eq!(body["delivery_fee"], "0");
    assert_eq!(body["total"], "2000");
    assert_eq!(body["item_count"], 3);

    let bad = json!({ "items": [{ "product_id": "a", "name": "A", "unit_price": 10, "quantity": 0 }] });
    let (_, body) = send(&h.state, request(Method::POST, "/cart/quote", Some(bad), None)).await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_cart_quote_with_unrepresentable_total_is_invalid() {
    let h = harness(FakeGateway::default());

    let overflow = json!({ "items": [{
        "product_id": "bulk", "name": "Bulk", "unit_price": "70000000000000000000000000000", "quantity": 2
    }] });
    let (status, body) = send(&h.state, request(Method::POST, "/cart/quote", Some(overflow), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["item_count"], 2);

    let counts = json!({ "items": [
        { "product_id": "a", "name": "A", "unit_price": 1, "quantity": i32::MAX },
        { "product_id": "b", "name": "B", "unit_price": 1, "quantity": i32::MAX },
        { "product_id": "c", "name": "C", "unit_price": 1, "quantity": i32::MAX }
    ] });
    let (status, body) = send(&h.state, request(Method::POST, "/cart/quote", Some(counts), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item_count"], u32::MAX);

    let sub_paisa = json!({ "items": [{ "product_id": "a", "name": "A", "unit_price": "10.005", "quantity": 1 }] });
    let (_, body) = send(&h.state, request(Method::POST, "/cart/quote", Some(sub_paisa), None)).await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_order_with_overflowing_cart_is_rejected() {
    let h = harness(FakeGateway::default());
    let member = token(Role::Franchise, Some(Uuid::new_v4()));
    let (order_id, payment_id, signature) = paid_order(&h, json!(2000)).await;

    let confirm = json!({
        "items": [{ "product_id": "bulk", "name": "Bulk", "unit_price": "70000000000000000000000000000", "quantity": 2 }],
        "gateway_order_id": order_id,
        "payment_id": payment_id,
        "signature": signature
    });
    let (status, _) = send(&h.state, request(Method::POST, "/orders", Some(confirm), Some(&member))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, orders) = send(&h.state, request(Method::GET, "/orders", None, Some(&member))).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_verify_payment() {
    let h = harness(FakeGateway::default());
    let signature = sign_payment("order_1", "pay_1", GATEWAY_SECRET).unwrap();

    let good = json!({ "order_id": "order_1", "payment_id": "pay_1", "signature": signature });
    let (status, body) = send(&h.state, request(Method::POST, "/verify-payment", Some(good), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "verified": true }));

    let forged = json!({ "razorpay_order_id": "order_1", "razorpay_payment_id": "pay_2", "razorpay_signature": signature });
    let (status, body) = send(&h.state, request(Method::POST, "/verify-payment", Some(forged), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["verified"], false);
}

#[tokio::test]
async fn test_orders_require_session() {
    let h = harness(FakeGateway::default());
    let (status, _) = send(&h.state, request(Method::GET, "/orders", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&h.state, request(Method::GET, "/orders", None, Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_paid_order_is_saved_once_and_reaches_dashboards() {
    let h = harness(FakeGateway::default());
    let franchise = Uuid::new_v4();
    let member = token(Role::Franchise, Some(franchise));
    let owner = token(Role::Owner, None);

    let (order_id, payment_id, signature) = paid_order(&h, json!(2000)).await;
    let confirm = json!({
        "items": two_thousand_cart(),
        "razorpay_order_id": order_id,
        "razorpay_payment_id": payment_id,
        "razorpay_signature": signature
    });

    let (status, saved) = send(&h.state, request(Method::POST, "/orders", Some(confirm.clone()), Some(&member))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(saved["status"], "PAID");
    assert_eq!(saved["total"], "2000");
    assert_eq!(saved["delivery_fee"], "0");
    assert_eq!(saved["franchise_id"], franchise.to_string());
    assert_eq!(saved["gateway_payment_id"], payment_id);

    // client retry after a lost response
    let (status, again) = send(&h.state, request(Method::POST, "/orders", Some(confirm), Some(&member))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], saved["id"]);

    let (_, mine) = send(&h.state, request(Method::GET, "/orders", None, Some(&member))).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, summary) = send(&h.state, request(Method::GET, "/dashboard/analytics", None, Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["orders_count"], 1);
    assert_eq!(summary["revenue"], "2000");
    assert_eq!(summary["top_products"][0]["product_id"], "assam-1kg");

    let (_, notifications) = send(&h.state, request(Method::GET, "/dashboard/notifications", None, Some(&owner))).await;
    let notifications = notifications.as_array().unwrap().clone();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["read"], false);

    let uri = format!("/dashboard/notifications/{}/read", notifications[0]["id"].as_str().unwrap());
    let (status, _) = send(&h.state, request(Method::POST, &uri, None, Some(&owner))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_order_with_forged_signature_is_rejected() {
    let h = harness(FakeGateway::default());
    let member = token(Role::Franchise, Some(Uuid::new_v4()));
    let (order_id, payment_id, _) = paid_order(&h, json!(2000)).await;

    let confirm = json!({
        "items": two_thousand_cart(),
        "gateway_order_id": order_id,
        "payment_id": payment_id,
        "signature": "00".repeat(32)
    });
    let (status, _) = send(&h.state, request(Method::POST, "/orders", Some(confirm), Some(&member))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, orders) = send(&h.state, request(Method::GET, "/orders", None, Some(&member))).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_order_amount_must_match_gateway_order() {
    let h = harness(FakeGateway::default());
    let member = token(Role::Franchise, Some(Uuid::new_v4()));
    let (order_id, payment_id, signature) = paid_order(&h, json!(1)).await;

    let confirm = json!({
        "items": two_thousand_cart(),
        "gateway_order_id": order_id,
        "payment_id": payment_id,
        "signature": signature
    });
    let (status, body) = send(&h.state, request(Method::POST, "/orders", Some(confirm), Some(&member))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("does not match"));
}

#[tokio::test]
async fn test_franchise_member_cannot_view_analytics_or_edit_settings() {
    let h = harness(FakeGateway::default());
    let member = token(Role::Franchise, Some(Uuid::new_v4()));

    let (status, _) = send(&h.state, request(Method::GET, "/dashboard/analytics", None, Some(&member))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let settings = json!({ "base_delivery_fee": 10, "free_delivery_threshold": 500, "express_delivery_fee": 20 });
    let (status, _) = send(
        &h.state,
        request(Method::PUT, "/dashboard/delivery-settings", Some(settings), Some(&member)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_updates_delivery_settings() {
    let h = harness(FakeGateway::default());
    let admin = token(Role::Admin, None);

    let settings = json!({ "base_delivery_fee": 30, "free_delivery_threshold": 1000, "express_delivery_fee": 80 });
    let (status, _) = send(
        &h.state,
        request(Method::PUT, "/dashboard/delivery-settings", Some(settings), Some(&admin)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&h.state, request(Method::GET, "/delivery-settings", None, None)).await;
    assert_eq!(body["source"], "stored");
    assert_eq!(body["base_delivery_fee"], "30");

    let negative = json!({ "base_delivery_fee": -1, "free_delivery_threshold": 1000, "express_delivery_fee": 80 });
    let (status, _) = send(
        &h.state,
        request(Method::PUT, "/dashboard/delivery-settings", Some(negative), Some(&admin)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let h = harness(FakeGateway::default());
    let owner = token(Role::Owner, None);

    let (status, session) = send(&h.state, request(Method::GET, "/auth/session", None, Some(&owner))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["role"], "owner");

    let (status, _) = send(&h.state, request(Method::POST, "/auth/logout", None, Some(&owner))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&h.state, request(Method::GET, "/dashboard/notifications", None, Some(&owner))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_event_topic() {
    let h = harness(FakeGateway::default());
    let owner = token(Role::Owner, None);
    let (status, _) = send(&h.state, request(Method::GET, "/events/weather", None, Some(&owner))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
