use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Authenticated principal attached to the request by the auth middleware.
/// The scheduling core trusts `user_type` as given by the verified token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub user_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.user_type
            .as_deref()
            .map(|t| t.eq_ignore_ascii_case(role))
            .unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    pub fn is_guardian(&self) -> bool {
        self.has_role("guardian")
    }

    pub fn is_pediatrician(&self) -> bool {
        self.has_role("pediatrician")
    }
}
