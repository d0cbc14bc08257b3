//! Realtime subscription stream
//!
//! `GET /realtime/subscribe` keeps the response open and writes one JSON
//! object per line for every event addressed to the caller:
//!
//! ```text
//! {"event":"room-1:typing","message":{"room":"room-1","user":"Ann","is_typing":"true","is_guest":"false"}}
//! {"event":"room-1","message":{"content":"hi","user":"Ann","creation":"...","room":"room-1","sender_email":"a@x.com"}}
//!
//! ```
//!
//! A bare newline is written every heartbeat interval.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::config::AppState;
use crate::ctx::Ctx;
use crate::realtime::RealtimeEvent;

fn format_event(event: &RealtimeEvent) -> Option<Bytes> {
    match serde_json::to_string(event) {
        Ok(mut line) => {
            line.push('\n');
            Some(Bytes::from(line))
        }
        Err(e) => {
            warn!("[Subscribe] Failed to encode {}: {}", event.event, e);
            None
        }
    }
}

/// GET /realtime/subscribe
pub async fn subscribe(
    ctx: Ctx,
    State(state): State<AppState>,
) -> std::result::Result<Response<Body>, StatusCode> {
    let user = ctx.user_id().to_string();
    info!("[Subscribe] Stream opened for {}", user);

    let mut rx = state.hub.subscribe(&user).await;
    let heartbeat = state.config.heartbeat_secs.max(1);

    let stream = async_stream::stream! {
        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(heartbeat));

        loop {
            tokio::select! {
                received = rx.recv() => {
                    match received {
                        Ok(event) => {
                            if let Some(line) = format_event(&event) {
                                yield Ok::<_, Infallible>(line);
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("[Subscribe] {} lagged, skipped {} events", user, skipped);
                        }
                        Err(RecvError::Closed) => {
                            debug!("[Subscribe] Channel for {} closed", user);
                            break;
                        }
                    }
                }

                _ = heartbeat_interval.tick() => {
                    yield Ok::<_, Infallible>(Bytes::from_static(b"\n"));
                }
            }
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| {
            error!("[Subscribe] Failed to build response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
