//! Messaging endpoints.
//!
//! - `GET /api/messages/user/:id`: own inbox and outbox, newest first
//! - `GET /api/messages/conversation/:a/:b`: participants only, oldest first
//! - `POST /api/messages`: the sender is always the session user
//! - `PATCH /api/messages/:id/read`: receiver only

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiJson, ApiPath, AuthUser};
use crate::db::MessageRepository;
use crate::models::{InsertMessage, Message};

/// Max message body, in characters.
const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: i64,
    pub content: String,
}

pub async fn for_user(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<Vec<Message>>, ApiError> {
    if user_id != auth.id() {
        return Err(ApiError::Forbidden("You can only read your own messages".into()));
    }
    Ok(Json(ctx.storage().list_user_messages(user_id)?))
}

pub async fn conversation(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath((a, b)): ApiPath<(i64, i64)>,
) -> Result<Json<Vec<Message>>, ApiError> {
    if auth.id() != a && auth.id() != b {
        return Err(ApiError::Forbidden(
            "You are not a participant in this conversation".into(),
        ));
    }
    Ok(Json(ctx.storage().list_conversation(a, b)?))
}

pub async fn send(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    if req.content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message too long (max {MAX_MESSAGE_CHARS} chars)"
        )));
    }

    let message = ctx.storage().create_message(InsertMessage {
        sender_id: auth.id(),
        receiver_id: req.receiver_id,
        content: req.content.trim().to_string(),
    })?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(ctx): State<ApiContext>,
    Extension(auth): Extension<AuthUser>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Message>, ApiError> {
    let message = ctx
        .storage()
        .get_message(id)?
        .ok_or_else(|| ApiError::NotFound("Message not found".into()))?;
    if message.receiver_id != auth.id() {
        return Err(ApiError::Forbidden(
            "Only the receiver can mark a message read".into(),
        ));
    }
    Ok(Json(ctx.storage().mark_message_read(id)?))
}
