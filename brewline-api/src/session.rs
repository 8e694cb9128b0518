use std::collections::HashMap;
use std::sync::Arc;

use brewline_core::session::SessionContext;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Logged-out sessions.
///
/// A token keeps a valid signature after logout, so its session id is
/// remembered as revoked until the token would have expired anyway. Nothing
/// is kept for live sessions; the verified token is the session.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    revoked: Arc<RwLock<HashMap<Uuid, DateTime<Utc>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a session built from a verified token. `None` if it was logged out.
    pub async fn load(&self, session: SessionContext) -> Option<SessionContext> {
        let revoked = self.revoked.read().await;
        match revoked.get(&session.session_id) {
            Some(expires_at) if *expires_at > Utc::now() => None,
            _ => Some(session),
        }
    }

    /// Tear a session down. Returns `false` if it was already revoked.
    pub async fn revoke(&self, session_id: Uuid, expires_at: DateTime<Utc>) -> bool {
        let now = Utc::now();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, until| *until > now);
        revoked.insert(session_id, expires_at).is_none()
    }

    #[cfg(test)]
    async fn revoked_count(&self) -> usize {
        self.revoked.read().await.len()
    }
}
