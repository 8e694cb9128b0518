use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use brewline_core::events::Event;
use brewline_core::session::SessionContext;
use brewline_shared::models::events::topics;
use futures_util::{future, Stream, StreamExt};

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/events/{topic}", get(stream_events))
}

/// GET /events/{topic}
/// Server-sent events for one topic. The subscription ends when the client disconnects.
pub async fn stream_events(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(topic): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    if !topics::ALL.contains(&topic.as_str()) {
        return Err(AppError::NotFoundError(format!("Unknown topic {}", topic)));
    }
    tracing::debug!("{} subscribed to {}", session.user_id, topic);

    let stream = state
        .subscriber
        .subscribe(&topic)
        .filter(move |event| future::ready(visible_to(&session, event)))
        .map(|event| Ok(to_sse(&event)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &Event) -> SseEvent {
    SseEvent::default()
        .event(event.topic.as_str())
        .data(event.payload.to_string())
}

/// Role-addressed events go to that role; franchise members only see their own franchise.
/// Payment orders are created before anyone signs in, so they carry no franchise and
/// only owners and admins see them.
fn visible_to(session: &SessionContext, event: &Event) -> bool {
    if event.topic == topics::PAYMENTS && !session.can_view_analytics() {
        return false;
    }

    if let Some(role) = event.payload.get("recipient_role").and_then(|r| r.as_str()) {
        if role != session.role.as_str() {
            return false;
        }
    }

    match (session.franchise_scope(), event.payload.get("franchise_id").and_then(|f| f.as_str())) {
        (Some(scope), Some(franchise)) => franchise == scope.to_string(),
        (Some(_), None) => event.payload.get("franchise_id").is_none(),
        (None, _) => true,
    }
}
