//! Room directory handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::chat::{self, RoomLookup};
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::Result;
use crate::models::{CreateRoomInput, RoomCreated, RoomSummary};

#[derive(Debug, Deserialize)]
pub struct RoomListQuery {
    pub email: Option<String>,
    pub task: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoomDetailQuery {
    pub email: Option<String>,
}

/// GET /chat/rooms
pub async fn list_rooms(
    ctx: Ctx,
    State(state): State<AppState>,
    Query(query): Query<RoomListQuery>,
) -> Result<Json<Vec<RoomSummary>>> {
    let email = query.email.unwrap_or_else(|| ctx.user_id().to_string());
    info!("GET /chat/rooms - {}", email);

    let rooms = chat::list_rooms(&state, &email, query.task.as_deref()).await?;
    Ok(Json(rooms))
}

/// GET /chat/rooms/:room
///
/// Always answers 200; failures come back as `{"error": "..."}`.
pub async fn get_room(
    Path(room): Path<String>,
    State(state): State<AppState>,
    Query(query): Query<RoomDetailQuery>,
) -> Response {
    info!("GET /chat/rooms/{}", room);

    let lookup = chat::get_room_by_name(&state, &room, query.email.as_deref()).await;
    match lookup {
        RoomLookup::Found(summary) => Json(summary).into_response(),
        other => {
            let message = other.error_message().unwrap_or_default();
            Json(json!({ "error": message })).into_response()
        }
    }
}

/// POST /chat/rooms
pub async fn create_room(
    ctx: Ctx,
    State(state): State<AppState>,
    Json(input): Json<CreateRoomInput>,
) -> Result<(StatusCode, Json<RoomCreated>)> {
    info!("POST /chat/rooms - {} ({})", input.room_name, input.room_type);

    let created = chat::create_private(&state, &ctx, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
