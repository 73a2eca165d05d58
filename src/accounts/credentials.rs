use uuid::Uuid;

use super::{jwt::JwtKeys, password};

/// Minimum password length, enforced at record creation rather than by
/// handler validation.
const MIN_PASSWORD_LEN: usize = 6;

/// Everything derived from a password being set on a user record: the
/// stored digest plus a freshly issued token pair.
#[derive(Debug, Clone)]
pub struct SealedCredentials {
    pub password_hash: String,
    pub access_token: String,
    pub refresh_token: String,
}

impl SealedCredentials {
    /// The "password was set" step. Runs on creation (and would run again on
    /// any future password change): check the length rule, hash the
    /// plaintext, and issue both tokens embedding the record's identity.
    pub fn seal(
        keys: &JwtKeys,
        id: Uuid,
        user_name: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<Self> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            anyhow::bail!("password must be at least {MIN_PASSWORD_LEN} characters");
        }
        let password_hash = password::hash_password(password)?;
        let access_token = keys.sign_access(id, user_name, email)?;
        let refresh_token = keys.sign_refresh(id, user_name, email)?;
        Ok(Self {
            password_hash,
            access_token,
            refresh_token,
        })
    }
}
