//! Session-cookie gates.
//!
//! Three independent predicates, one per route group:
//! - `require_auth`: any valid session
//! - `require_patient`: session user has the patient role
//! - `require_doctor`: session user has the doctor role
//!
//! Each resolves the `portal_session` cookie, loads the user and injects
//! `AuthUser` into request extensions for downstream handlers.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthUser};
use crate::config::SESSION_COOKIE;
use crate::db::UserRepository;
use crate::models::UserRole;

/// Role a gate demands on top of a valid session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Authenticated,
    Role(UserRole),
}

pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    gate(req, next, Gate::Authenticated).await
}

pub async fn require_patient(req: Request<axum::body::Body>, next: Next) -> Response {
    gate(req, next, Gate::Role(UserRole::Patient)).await
}

pub async fn require_doctor(req: Request<axum::body::Body>, next: Next) -> Response {
    gate(req, next, Gate::Role(UserRole::Doctor)).await
}

async fn gate(req: Request<axum::body::Body>, next: Next, gate: Gate) -> Response {
    match gate_inner(req, next, gate).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn gate_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
    gate: Gate,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = session_token(req.headers()).ok_or(ApiError::Unauthorized)?;

    let user_id = {
        let mut sessions = ctx.core.write_sessions()?;
        sessions.resolve(&token)
    }; // RwLockWriteGuard dropped here, before any .await
    let user_id = user_id.ok_or(ApiError::Unauthorized)?;

    let user = ctx
        .storage()
        .get_user(user_id)?
        .ok_or(ApiError::Unauthorized)?;

    if let Gate::Role(role) = gate {
        if user.role != role {
            tracing::warn!(user_id = user.id, required = %role, "Role gate rejected request");
            return Err(ApiError::Forbidden(format!("Requires the {role} role")));
        }
    }

    req.extensions_mut().insert(AuthUser { user });

    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert("Cache-Control", HeaderValue::from_static("no-store"));

    Ok(response)
}

// ═══════════════════════════════════════════════════════════
// Cookie helpers
// ═══════════════════════════════════════════════════════════

/// Value of the session cookie, if the request carries one.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value issuing a session.
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value clearing the session.
pub fn expired_session_cookie(secure: bool) -> String {
    session_cookie("", Duration::ZERO, secure)
}
