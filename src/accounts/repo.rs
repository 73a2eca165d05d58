use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{credentials::SealedCredentials, jwt::JwtKeys};

/// User record as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub access_token: String,
    pub refresh_token: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Look up a user by email. Callers pass the already-normalized form so
    /// lookups stay case and whitespace insensitive.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, user_name, email, password_hash, access_token, refresh_token,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a user. Credentials are sealed (password hashed, token pair
    /// issued) before the row is written; the id is generated here so the
    /// tokens can embed it. Email uniqueness is enforced by the database.
    pub async fn create(
        db: &PgPool,
        keys: &JwtKeys,
        user_name: &str,
        email: &str,
        password: &str,
    ) -> anyhow::Result<User> {
        let id = Uuid::new_v4();
        let creds = SealedCredentials::seal(keys, id, user_name, email, password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, user_name, email, password_hash, access_token, refresh_token)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_name, email, password_hash, access_token, refresh_token,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_name)
        .bind(email)
        .bind(&creds.password_hash)
        .bind(&creds.access_token)
        .bind(&creds.refresh_token)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}
