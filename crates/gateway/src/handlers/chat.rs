//! Chat page and chat API handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{require_page, PageError};
use crate::middleware::CurrentSession;
use crate::pages;
use crate::AppState;
use campusdesk_common::{
    auth::Role,
    chat::MAX_QUERY_CHARS,
    errors::{AppError, Result},
};

/// Request body for `POST /api/chat`
#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// `GET /chat`
pub async fn chat_page(current: CurrentSession) -> std::result::Result<Html<String>, PageError> {
    let session = require_page(&current, Role::Student)?;
    Ok(Html(pages::chat_page(session.display_name())))
}

/// `GET /admin/chat`
pub async fn admin_chat_page(
    current: CurrentSession,
) -> std::result::Result<Html<String>, PageError> {
    let session = require_page(&current, Role::Admin)?;
    Ok(Html(pages::admin_chat_page(session.display_name())))
}

/// `POST /api/chat`
pub async fn chat(
    State(state): State<AppState>,
    current: CurrentSession,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let session = current
        .session
        .as_ref()
        .ok_or_else(|| AppError::unauthorized("You must be logged in to use the chatbot"))?;

    // Body problems surface as the JSON error body, after the session check
    let Json(request) = body.map_err(|rejection| AppError::Validation {
        message: rejection.body_text(),
        field: None,
    })?;

    if request.query.trim().is_empty() {
        return Err(AppError::validation("query", "Empty query"));
    }
    request.validate().map_err(|e| AppError::Validation {
        message: format!("Query must be 1 to {} characters: {}", MAX_QUERY_CHARS, e),
        field: Some("query".to_string()),
    })?;

    let response = state.chat.answer(session, &request.query).await?;

    Ok(Json(ChatResponse { response }))
}
