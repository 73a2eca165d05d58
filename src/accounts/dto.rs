use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::User;

/// Request body for registration. Older clients send `name` instead of
/// `userName`; both are accepted.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(rename = "userName")]
    pub user_name: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    /// Resolve the lenient input shape to concrete fields: `userName` wins
    /// over `name`, missing fields become the empty string.
    pub fn resolve(self) -> (String, String, String) {
        let user_name = self.user_name.or(self.name).unwrap_or_default();
        (
            user_name,
            self.email.unwrap_or_default(),
            self.password.unwrap_or_default(),
        )
    }
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public part of the user returned to the client. No password, no tokens.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Response returned by both register and login.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: String,
    pub user: PublicUser,
}

/// Trim and lower-case, applied identically before every store write and
/// lookup.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
