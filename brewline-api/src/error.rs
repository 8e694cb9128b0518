use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use brewline_core::repository::RepositoryError;
use brewline_core::CheckoutError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UpstreamError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    /// Map a checkout failure onto the HTTP surface.
    pub fn checkout(err: CheckoutError) -> Self {
        match err {
            CheckoutError::InvalidAmount(_) | CheckoutError::EmptyCart | CheckoutError::InvalidCart => {
                AppError::ValidationError(err.to_string())
            }
            CheckoutError::GatewayError { .. } => AppError::UpstreamError(err.to_string()),
            CheckoutError::Busy => AppError::ConflictError(err.to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }

    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UpstreamError(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg)
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => match err.downcast_ref::<RepositoryError>() {
                // repositories report a missing row as an error, not an empty option
                Some(RepositoryError::NotFound(what)) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
                _ => {
                    tracing::error!("Internal Server Error: {:#}", err);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();
        (status, Json(json!({ "error": error_message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
