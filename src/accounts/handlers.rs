use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRef, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    audit::{self, RegistrationEntry},
    error::{AppError, AppResult},
    state::AppState,
};

use super::{
    dto::{normalize_email, AccountResponse, LoginRequest, PublicUser, RegisterRequest},
    jwt::JwtKeys,
    password,
    repo::User,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, headers, payload))]
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AccountResponse>)> {
    let (user_name, email, password) = payload.resolve();

    if user_name.is_empty() || email.is_empty() || password.is_empty() {
        warn!("registration rejected: missing fields");
        return Err(AppError::Validation(
            "Username, email and password are required".into(),
        ));
    }

    let user_name = user_name.trim().to_string();
    let email = normalize_email(&email);

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "registration rejected: email already taken");
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }

    let keys = JwtKeys::from_ref(&state);
    let user = User::create(&state.db, &keys, &user_name, &email, &password).await?;

    // Best-effort audit entry; never allowed to affect the response.
    match RegistrationEntry::new(&user, client_ip(&headers, peer)) {
        Ok(entry) => {
            let _ = audit::submit(state.audit.clone(), entry);
        }
        Err(e) => error!(error = %e, "failed to build registration audit entry"),
    }

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            message: "User Registered Successfully".into(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AccountResponse>> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        warn!("login rejected: missing fields");
        return Err(AppError::Validation(
            "Email and password are required".into(),
        ));
    }

    let email = normalize_email(&email);

    let user = User::find_by_email(&state.db, &email).await?.ok_or_else(|| {
        warn!(email = %email, "login with unknown email");
        AppError::Authentication("Invalid email or password".into())
    })?;

    if !password::verify_password(&password, &user.password_hash)? {
        warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::Authentication(
            "Email or password is incorrect".into(),
        ));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AccountResponse {
        message: "Login Successful".into(),
        user: PublicUser::from(&user),
    }))
}

/// Best-effort client address: first `x-forwarded-for` entry, else the peer
/// socket.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    Some(peer.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000)))
    }

    // Validation runs before any store access, so the fake state's lazy
    // pool is never connected in these tests.

    #[tokio::test]
    async fn register_rejects_missing_email() {
        let payload = RegisterRequest {
            user_name: Some("Ada".into()),
            password: Some("secret1".into()),
            ..Default::default()
        };
        let err = register(State(AppState::fake()), peer(), HeaderMap::new(), Json(payload))
            .await
            .unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert_eq!(msg, "Username, email and password are required")
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_rejects_empty_body() {
        let err = register(
            State(AppState::fake()),
            peer(),
            HeaderMap::new(),
            Json(RegisterRequest::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn login_rejects_missing_password() {
        let payload = LoginRequest {
            email: Some("ada@example.com".into()),
            password: None,
        };
        let err = login(State(AppState::fake()), Json(payload))
            .await
            .unwrap_err();
        match err {
            AppError::Validation(msg) => assert_eq!(msg, "Email and password are required"),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let ip = client_ip(&headers, SocketAddr::from(([127, 0, 0, 1], 4000)));
        assert_eq!(ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn client_ip_falls_back_to_peer() {
        let ip = client_ip(&HeaderMap::new(), SocketAddr::from(([192, 0, 2, 7], 4000)));
        assert_eq!(ip.as_deref(), Some("192.0.2.7"));
    }
}
