use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use brewline_core::session::{Role, SessionContext};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

// ============================================================================
// JWT Claims
// ============================================================================

/// Claims of a session token issued by the auth provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub role: String,
    #[serde(default)]
    pub franchise_id: Option<Uuid>,
    #[serde(alias = "session_id")]
    pub sid: Uuid,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl SessionClaims {
    pub fn for_session(session: &SessionContext) -> Self {
        Self {
            sub: session.user_id.clone(),
            role: session.role.as_str().to_string(),
            franchise_id: session.franchise_id,
            sid: session.session_id,
            exp: session.expires_at.timestamp().max(0) as usize,
            iss: None,
        }
    }

    fn into_session(self) -> Result<SessionContext, AppError> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(AppError::AuthorizationError)?;
        let expires_at = DateTime::from_timestamp(self.exp as i64, 0)
            .ok_or_else(|| AppError::AuthenticationError("Invalid token expiry".to_string()))?;

        Ok(SessionContext {
            session_id: self.sid,
            user_id: self.sub,
            role,
            franchise_id: self.franchise_id,
            expires_at,
        })
    }
}

/// Sign claims with the shared session secret.
pub fn encode_session_token(claims: &SessionClaims, secret: &str) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Session Middleware
// ============================================================================

/// Verify the bearer token and hand the handler a [`SessionContext`].
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;
    if let Some(issuer) = &state.auth.issuer {
        validation.set_issuer(&[issuer]);
    }

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.expose().as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Rejected session token: {}", e);
        AppError::AuthenticationError("Invalid or expired token".to_string())
    })?;

    let session = token_data.claims.into_session()?;
    if session.is_expired(Utc::now()) {
        return Err(AppError::AuthenticationError("Invalid or expired token".to_string()));
    }

    let session = state
        .sessions
        .load(session)
        .await
        .ok_or_else(|| AppError::AuthenticationError("Session has been signed out".to_string()))?;

    req.extensions_mut().insert(session);

    Ok(next.run(req).await)
}

// ============================================================================
// Role Check Helpers
// ============================================================================

pub fn require_analytics(session: &SessionContext) -> Result<(), AppError> {
    if session.can_view_analytics() {
        Ok(())
    } else {
        Err(AppError::AuthorizationError("Owner or admin role required".to_string()))
    }
}

/// Franchise to restrict reads to. A franchise member without a franchise sees nothing.
pub fn franchise_scope(session: &SessionContext) -> Result<Option<Uuid>, AppError> {
    match (session.role, session.franchise_scope()) {
        (Role::Franchise, None) => Err(AppError::AuthorizationError(
            "Account is not linked to a franchise".to_string(),
        )),
        (_, scope) => Ok(scope),
    }
}
