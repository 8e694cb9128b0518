use axum::{
    http::{header, Method},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod dashboard;
pub mod delivery;
pub mod error;
pub mod events;
pub mod middleware;
pub mod orders;
pub mod payments;
pub mod session;
pub mod state;

pub use state::{AppState, AuthConfig, Repositories};

pub fn app(state: AppState) -> Router {
    // any storefront origin may call the broker
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::USER_AGENT]);

    let protected = Router::new()
        .merge(orders::routes())
        .merge(dashboard::routes())
        .merge(events::routes())
        .merge(auth::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(payments::routes())
        .merge(delivery::routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
