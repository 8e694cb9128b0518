use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Franchise,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Franchise => "franchise",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            "franchise" | "franchise_member" => Ok(Role::Franchise),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Who is acting, handed explicitly to handlers instead of living in a global.
///
/// Built from a verified token when the session loads and dropped from the
/// registry on logout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub user_id: String,
    pub role: Role,
    pub franchise_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn can_view_analytics(&self) -> bool {
        matches!(self.role, Role::Owner | Role::Admin)
    }

    /// Franchise members only ever see their own location.
    pub fn franchise_scope(&self) -> Option<Uuid> {
        match self.role {
            Role::Franchise => self.franchise_id,
            Role::Owner | Role::Admin => None,
        }
    }
}
