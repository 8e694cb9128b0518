use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use brewline_core::session::SessionContext;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(current_session))
        .route("/auth/logout", post(logout))
}

/// GET /auth/session
pub async fn current_session(Extension(session): Extension<SessionContext>) -> Json<SessionContext> {
    Json(session)
}

/// POST /auth/logout
/// Later requests carrying the same session are rejected.
pub async fn logout(State(state): State<AppState>, Extension(session): Extension<SessionContext>) -> StatusCode {
    state.sessions.revoke(session.session_id, session.expires_at).await;
    tracing::info!("Session {} for {} signed out", session.session_id, session.user_id);
    StatusCode::NO_CONTENT
}
