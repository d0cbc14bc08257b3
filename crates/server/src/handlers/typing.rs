use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::chat;
use crate::config::AppState;
use crate::error::Result;
use crate::models::TypingInput;

/// PUT /chat/:room/typing
pub async fn update_typing(
    Path(room): Path<String>,
    State(state): State<AppState>,
    Json(typing): Json<TypingInput>,
) -> Result<StatusCode> {
    info!(
        "PUT /chat/{}/typing - {} is_typing={}",
        room, typing.user, typing.is_typing
    );

    chat::set_typing(&state, &room, typing).await?;
    Ok(StatusCode::OK)
}
