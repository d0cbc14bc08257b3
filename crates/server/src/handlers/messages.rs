//! Message handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::chat;
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::Result;
use crate::models::{MessageEntry, MessagePosted, SendMessageInput};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub email: Option<String>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub start: u32,
    #[serde(default = "default_page_length")]
    pub page_length: u32,
}

fn default_page_length() -> u32 {
    10
}

/// GET /chat/:room/messages
pub async fn get_messages(
    ctx: Ctx,
    Path(room): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageEntry>>> {
    let email = query.email.unwrap_or_else(|| ctx.user_id().to_string());
    info!(
        "GET /chat/{}/messages - {} start={} len={}",
        room, email, query.start, query.page_length
    );

    let entries = chat::get_all(
        &state,
        &room,
        &email,
        query.order_by.as_deref(),
        query.start,
        query.page_length,
    )
    .await?;
    Ok(Json(entries))
}

/// POST /chat/:room/messages
pub async fn send_message(
    Path(room): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<SendMessageInput>,
) -> Result<Json<MessagePosted>> {
    info!("POST /chat/{}/messages - {}", room, input.email);

    let posted = chat::send(&state, &room, input).await?;
    Ok(Json(posted))
}

/// POST /chat/:room/read
pub async fn mark_read(
    ctx: Ctx,
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode> {
    info!("POST /chat/{}/read - {}", room, ctx.user_id());

    chat::mark_as_read(&state, &ctx, &room)?;
    Ok(StatusCode::ACCEPTED)
}
