use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use brewline_cart::{Cart, CartItem, CartSummary, DeliverySettings};
use brewline_core::delivery::{load_delivery_settings, SettingsSource};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    #[serde(flatten)]
    pub settings: DeliverySettings,
    pub source: SettingsSource,
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub summary: CartSummary,
    pub valid: bool,
    pub remaining_for_free_delivery: Decimal,
    pub express_delivery_fee: Decimal,
    pub settings_source: SettingsSource,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/delivery-settings", get(get_settings))
        .route("/cart/quote", post(quote_cart))
}

/// GET /delivery-settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let (settings, source) = load_delivery_settings(state.repos.settings.as_ref()).await;
    Json(SettingsResponse { settings, source })
}

/// POST /cart/quote
/// Price a cart with the current delivery settings.
pub async fn quote_cart(State(state): State<AppState>, Json(req): Json<QuoteRequest>) -> Json<QuoteResponse> {
    let (settings, source) = load_delivery_settings(state.repos.settings.as_ref()).await;
    let cart = Cart::restore(req.items, settings);
    let summary = *cart.summary();

    Json(QuoteResponse {
        summary,
        valid: !cart.is_empty() && cart.is_cart_valid(),
        remaining_for_free_delivery: cart.policy().remaining_for_free_delivery(summary.subtotal),
        express_delivery_fee: cart.policy().express_fee(),
        settings_source: source,
    })
}
