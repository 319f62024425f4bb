//! Per-client rate limiting middleware.
//!
//! Applies sliding-window rate limits per client:
//! - 100 requests per minute
//! - 1000 requests per hour
//!
//! Signed-in callers are keyed by user, everyone else by client address.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::middleware::auth::session_token;
use crate::api::types::ApiContext;

/// TCP peer of the connection, when served with connect info.
pub fn peer_addr(extensions: &Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Limiter key for an unauthenticated client.
///
/// `X-Forwarded-For` is client-controlled, so its first hop is only used
/// when `trust_proxy` is set. Otherwise the key is the peer IP.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = headers
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return format!("client:{ip}");
        }
    }

    match peer {
        Some(addr) => format!("client:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

/// A cookie only counts when it resolves to a live session, so made-up
/// cookie values share their client's bucket.
fn rate_key(ctx: &ApiContext, req: &Request<axum::body::Body>) -> Result<String, ApiError> {
    if let Some(token) = session_token(req.headers()) {
        let user_id = ctx.core.write_sessions()?.resolve(&token);
        if let Some(user_id) = user_id {
            return Ok(format!("user:{user_id}"));
        }
    }
    Ok(client_key(
        req.headers(),
        peer_addr(req.extensions()),
        ctx.core.config.trust_proxy,
    ))
}

/// Per-client rate limiting. Returns 429 if exceeded.
/// Accesses `ApiContext` from request extensions.
pub async fn limit(req: Request<axum::body::Body>, next: Next) -> Response {
    match limit_inner(req, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn limit_inner(req: Request<axum::body::Body>, next: Next) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let key = rate_key(&ctx, &req)?;

    // MutexGuard is !Send, drop before .await
    {
        let mut limiter = ctx
            .rate_limiter
            .lock()
            .map_err(|_| ApiError::Internal("rate limiter lock".into()))?;

        limiter
            .check(&key)
            .map_err(|retry_after| ApiError::RateLimited { retry_after })?;
    }

    Ok(next.run(req).await)
}
