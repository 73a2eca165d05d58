use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{config::JwtConfig, state::AppState};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Payload embedded in both session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub kind: TokenKind,
}

/// Signing and verification material for the access/refresh token pair.
/// Access and refresh tokens use independent secrets and TTLs.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            access_ttl: Duration::from_secs((cfg.access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes as u64) * 60),
        }
    }

    fn sign_with_kind(
        &self,
        id: Uuid,
        user_name: &str,
        email: &str,
        kind: TokenKind,
    ) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let (key, ttl) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: id,
            user_name: user_name.to_string(),
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            kind,
        };
        let token = encode(&Header::default(), &claims, key)?;
        debug!(user_id = %id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, id: Uuid, user_name: &str, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(id, user_name, email, TokenKind::Access)
    }

    pub fn sign_refresh(&self, id: Uuid, user_name: &str, email: &str) -> anyhow::Result<String> {
        self.sign_with_kind(id, user_name, email, TokenKind::Refresh)
    }

    fn verify_with_kind(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let data = decode::<Claims>(token, key, &Validation::default())?;
        if data.claims.kind != kind {
            anyhow::bail!("unexpected token kind");
        }
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify_with_kind(token, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        self.verify_with_kind(token, TokenKind::Refresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            access_secret: "test-access-secret".into(),
            refresh_secret: "test-refresh-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60 * 24 * 7,
        })
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = make_keys();
        let id = Uuid::new_v4();
        let token = keys.sign_access(id, "Ada", "ada@example.com").expect("sign");
        let claims = keys.verify_access(&token).expect("verify");
        assert_eq!(claims.sub, id);
        assert_eq!(claims.user_name, "Ada");
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[tokio::test]
    async fn sign_and_verify_refresh_token() {
        let keys = make_keys();
        let id = Uuid::new_v4();
        let token = keys
            .sign_refresh(id, "Ada", "ada@example.com")
            .expect("sign");
        let claims = keys.verify_refresh(&token).expect("verify");
        assert_eq!(claims.sub, id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[tokio::test]
    async fn verify_refresh_rejects_access_token() {
        // signed with the access secret, so the refresh key cannot verify it
        let keys = make_keys();
        let token = keys
            .sign_access(Uuid::new_v4(), "Ada", "ada@example.com")
            .expect("sign");
        assert!(keys.verify_refresh(&token).is_err());
    }

    #[tokio::test]
    async fn kind_is_checked_even_when_secrets_match() {
        let keys = JwtKeys::from_config(&JwtConfig {
            access_secret: "shared-secret".into(),
            refresh_secret: "shared-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60,
        });
        let token = keys
            .sign_access(Uuid::new_v4(), "Ada", "ada@example.com")
            .expect("sign");
        let err = keys.verify_refresh(&token).unwrap_err();
        assert!(err.to_string().contains("unexpected token kind"));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret() {
        let keys = make_keys();
        let other = JwtKeys::from_config(&JwtConfig {
            access_secret: "a different secret".into(),
            refresh_secret: "another different secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_minutes: 60,
        });
        let token = keys
            .sign_access(Uuid::new_v4(), "Ada", "ada@example.com")
            .expect("sign");
        assert!(other.verify_access(&token).is_err());
    }
}
