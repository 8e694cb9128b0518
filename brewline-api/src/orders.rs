use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use brewline_cart::Cart;
use brewline_core::dashboard::NewNotification;
use brewline_core::delivery::load_delivery_settings;
use brewline_core::order::{NewOrder, OrderRecord};
use brewline_core::payment::to_minor_units;
use brewline_core::session::{Role, SessionContext};
use brewline_core::CheckoutError;
use brewline_order::signature::verify_payment_signature;
use brewline_order::ConfirmOrderRequest;
use brewline_shared::models::events::{topics, NotificationRaisedEvent, OrderPaidEvent};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::franchise_scope, state::AppState};

const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub limit: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(confirm_order).get(list_orders))
        .route("/orders/{id}", get(get_order))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /orders
/// Persist a paid cart.
///
/// The callback signature must verify, the cart is repriced with the server's
/// delivery settings and the gateway must agree on the amount. Saving is
/// idempotent per gateway order, so a client retrying after a lost response
/// gets the original order back.
pub async fn confirm_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(req): Json<ConfirmOrderRequest>,
) -> Result<(StatusCode, Json<OrderRecord>), AppError> {
    verify_payment_signature(
        &req.gateway_order_id,
        &req.payment_id,
        &req.signature,
        state.gateway_secret.expose(),
    )
    .map_err(|e| {
        tracing::warn!("Order for payment {} rejected: {}", req.payment_id, e);
        AppError::ValidationError(e.to_string())
    })?;

    if let Some(existing) = state.repos.orders.find_by_gateway_order(&req.gateway_order_id).await? {
        tracing::info!("Gateway order {} already saved as {}", req.gateway_order_id, existing.id);
        return Ok((StatusCode::OK, Json(existing)));
    }

    let (settings, _) = load_delivery_settings(state.repos.settings.as_ref()).await;
    let cart = Cart::restore(req.items, settings);
    if cart.is_empty() {
        return Err(AppError::checkout(CheckoutError::EmptyCart));
    }
    if !cart.is_cart_valid() {
        return Err(AppError::checkout(CheckoutError::InvalidCart));
    }

    let expected = to_minor_units(cart.summary().total).map_err(AppError::checkout)?;
    let gateway_order = state
        .broker
        .gateway()
        .fetch_order(&req.gateway_order_id)
        .await
        .map_err(AppError::checkout)?;

    if gateway_order.amount_minor_units != expected {
        tracing::warn!(
            "Gateway order {} is for {} but the cart prices to {}",
            req.gateway_order_id,
            gateway_order.amount_minor_units,
            expected
        );
        return Err(AppError::ConflictError(format!(
            "Paid amount {} does not match cart total {}",
            gateway_order.amount_minor_units, expected
        )));
    }

    let order = NewOrder::from_cart(
        cart.items(),
        cart.summary(),
        state.broker.currency(),
        &req.gateway_order_id,
        &req.payment_id,
    )
    .placed_by(&session.user_id, session.franchise_id);

    let record = state.repos.orders.create_order(&order).await?;
    tracing::info!(
        "Order {} placed by {} for {} {}",
        record.id,
        session.user_id,
        record.order.total,
        record.order.currency
    );

    state.publish(
        topics::ORDERS,
        &OrderPaidEvent {
            order_id: record.id,
            franchise_id: record.order.franchise_id,
            gateway_order_id: record.order.gateway_order_id.clone(),
            gateway_payment_id: record.order.gateway_payment_id.clone(),
            total: record.order.total,
            currency: record.order.currency.clone(),
            timestamp: Utc::now().timestamp(),
        },
    );
    notify_owner(&state, &record).await;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /orders
/// Newest first, limited to the caller's franchise for franchise members.
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderRecord>>, AppError> {
    let scope = franchise_scope(&session)?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
    Ok(Json(state.repos.orders.list_orders(scope, limit).await?))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderRecord>, AppError> {
    let scope = franchise_scope(&session)?;
    let not_found = || AppError::NotFoundError(format!("Order {} not found", order_id));

    let record = state.repos.orders.get_order(order_id).await?.ok_or_else(not_found)?;
    if scope.is_some() && record.order.franchise_id != scope {
        return Err(not_found());
    }
    Ok(Json(record))
}

/// Tell the owner about a new order. Failures are logged only.
async fn notify_owner(state: &AppState, record: &OrderRecord) {
    let notification = NewNotification {
        recipient_role: Role::Owner,
        title: "New order".to_string(),
        body: format!(
            "Order {} paid: {} {}",
            record.id, record.order.total, record.order.currency
        ),
    };

    match state.repos.notifications.create(&notification).await {
        Ok(created) => state.publish(
            topics::NOTIFICATIONS,
            &NotificationRaisedEvent {
                notification_id: created.id,
                recipient_role: created.recipient_role.to_string(),
                title: created.title,
                timestamp: Utc::now().timestamp(),
            },
        ),
        Err(e) => tracing::warn!("Could not raise notification for order {}: {}", record.id, e),
    }
}
