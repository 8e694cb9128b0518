use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use brewline_cart::DeliverySettings;
use brewline_core::dashboard::{AnalyticsSummary, Notification};
use brewline_core::session::SessionContext;
use brewline_shared::models::events::topics;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::auth::require_analytics, state::AppState};

const NOTIFICATION_PAGE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub franchise_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/analytics", get(analytics))
        .route("/dashboard/notifications", get(list_notifications))
        .route("/dashboard/notifications/{id}/read", post(mark_notification_read))
        .route("/dashboard/delivery-settings", put(update_delivery_settings))
}

/// GET /dashboard/analytics
/// Owner and admin only; optionally narrowed to one franchise.
pub async fn analytics(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsSummary>, AppError> {
    require_analytics(&session)?;
    Ok(Json(state.repos.analytics.summary(query.franchise_id).await?))
}

/// GET /dashboard/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = state
        .repos
        .notifications
        .list_for_role(session.role, NOTIFICATION_PAGE)
        .await?;
    Ok(Json(notifications))
}

/// POST /dashboard/notifications/{id}/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(_session): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.repos.notifications.mark_read(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFoundError(format!("Notification {} not found", id)))
    }
}

/// PUT /dashboard/delivery-settings
/// Replace the active delivery settings and tell live dashboards.
pub async fn update_delivery_settings(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(settings): Json<DeliverySettings>,
) -> Result<Json<DeliverySettings>, AppError> {
    require_analytics(&session)?;

    let fees = [
        settings.base_delivery_fee,
        settings.free_delivery_threshold,
        settings.express_delivery_fee,
    ];
    if fees.iter().any(|fee| *fee < Decimal::ZERO) {
        return Err(AppError::ValidationError("Delivery amounts cannot be negative".to_string()));
    }

    state.repos.settings.save(&settings).await?;
    tracing::info!("Delivery settings changed by {}", session.user_id);
    state.publish(topics::DELIVERY_SETTINGS, &settings);

    Ok(Json(settings))
}
