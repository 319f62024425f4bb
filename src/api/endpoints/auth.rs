//! Session endpoints.
//!
//! `POST /api/auth/login`: unprotected, login-rate-limited. Issues the session cookie.
//! `POST /api/auth/logout`: destroys the session and expires the cookie.
//! `GET /api/auth/user`: the signed-in user.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::middleware::auth::{expired_session_cookie, session_cookie, session_token};
use crate::api::middleware::rate::client_key;
use crate::api::types::{ApiContext, ApiJson, AuthUser};
use crate::crypto;
use crate::db::UserRepository;
use crate::models::User;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Hash a login attempt is checked against. Unknown users get the decoy so
/// both failure paths pay for a full PBKDF2 derivation.
fn credential_hash<'a>(user: Option<&'a User>, decoy: &'a str) -> &'a str {
    user.map_or(decoy, |u| u.password_hash.as_str())
}

/// `POST /api/auth/login`: verify credentials and open a session.
///
/// Unknown username and wrong password both answer 401
/// `INVALID_CREDENTIALS`; no cookie is set on failure.
pub async fn login(
    State(ctx): State<ApiContext>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let peer = peer.map(|ConnectInfo(addr)| addr);
    let client = client_key(&headers, peer, ctx.core.config.trust_proxy);
    {
        let mut limiter = ctx
            .login_limiter
            .lock()
            .map_err(|_| ApiError::Internal("login limiter lock".into()))?;
        limiter
            .check(&client)
            .map_err(|retry_after| ApiError::RateLimited { retry_after })?;
    }

    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Username and password are required".into()));
    }

    let user = ctx.storage().get_user_by_username(req.username.trim())?;

    // PBKDF2 at full strength takes long enough to stall a worker thread.
    let stored = credential_hash(user.as_ref(), ctx.core.login_decoy()).to_string();
    let password = req.password;
    let matches = tokio::task::spawn_blocking(move || crypto::verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("password check task: {e}")))??;

    let user = match user {
        Some(user) if matches => user,
        Some(user) => {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            tracing::warn!(username = %req.username, "Login failed: unknown user");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let (token, active) = {
        let mut sessions = ctx.core.write_sessions()?;
        let token = sessions.create(user.id);
        (token, sessions.len())
    };
    let ttl = ctx.core.read_sessions()?.ttl();
    if let Ok(mut limiter) = ctx.login_limiter.lock() {
        limiter.reset(&client);
    }

    tracing::info!(user_id = user.id, role = %user.role, active, "User logged in");

    let cookie = session_cookie(&token, ttl, ctx.core.config.secure_cookie);
    Ok(([(header::SET_COOKIE, cookie)], Json(user)))
}

/// `POST /api/auth/logout`: destroy the current session.
pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token(&headers) {
        let mut sessions = ctx.core.write_sessions()?;
        sessions.destroy(&token);
    }

    tracing::info!(user_id = auth.id(), "User logged out");

    let cookie = expired_session_cookie(ctx.core.config.secure_cookie);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LogoutResponse { success: true }),
    ))
}

/// `GET /api/auth/user`: the signed-in user.
pub async fn current_user(Extension(auth): Extension<AuthUser>) -> Json<User> {
    Json(auth.user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn user(hash: &str) -> User {
        User {
            id: 7,
            username: "pat".into(),
            password_hash: hash.into(),
            role: UserRole::Patient,
            first_name: "Pat".into(),
            last_name: "Doe".into(),
            email: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn known_user_is_checked_against_own_hash() {
        let u = user("stored-hash");
        assert_eq!(credential_hash(Some(&u), "decoy"), "stored-hash");
    }

    #[test]
    fn unknown_user_still_pays_for_a_derivation() {
        let decoy = crypto::decoy_hash(1_000);
        let checked = credential_hash(None, &decoy);
        assert_eq!(checked, decoy);
        // The decoy parses, so the derivation runs and simply fails.
        assert!(!crypto::verify_password("any password", checked).unwrap());
    }
}
