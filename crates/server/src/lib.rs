//! Chat Server Library
//!
//! Room directory, message history and realtime relay for chat rooms,
//! served over HTTP with axum.

pub mod chat;
pub mod config;
pub mod ctx;
pub mod error;
pub mod handlers;
pub mod models;
pub mod queue;
pub mod realtime;
pub mod store;
pub mod workflow;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{AppState, ChatServerConfig};
use handlers::{
    create_room, get_messages, get_room, list_rooms, mark_read, send_message, send_typing,
    subscribe,
};
use queue::BackgroundQueue;
use realtime::RealtimeHub;
use store::SqliteChatStore;
use workflow::WorkflowTable;

/// Wire the services around an opened store.
///
/// The returned handle is the background queue worker; it stops once the
/// state (and every clone of it) is dropped.
pub async fn build_state(
    config: ChatServerConfig,
    store: Arc<SqliteChatStore>,
) -> anyhow::Result<(AppState, JoinHandle<()>)> {
    store.seed_operators(&config.operators).await?;

    let workflow = match &config.workflow_file {
        Some(path) => WorkflowTable::load(path).await?,
        None => {
            info!("No workflow file configured, records carry no workflow state");
            WorkflowTable::default()
        }
    };

    let hub = Arc::new(RealtimeHub::new(config.realtime_buffer));
    let (queue, worker) = BackgroundQueue::spawn(store.clone());

    let state = AppState {
        config,
        store: store.clone(),
        profiles: store,
        workflow: Arc::new(workflow),
        publisher: hub.clone(),
        hub,
        queue: Arc::new(queue),
    };
    Ok((state, worker))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Room directory
        .route("/chat/rooms", get(list_rooms).post(create_room))
        .route("/chat/rooms/{room}", get(get_room))
        // Messages
        .route("/chat/{room}/messages", get(get_messages).post(send_message))
        .route("/chat/{room}/read", post(mark_read))
        .route("/chat/{room}/typing", put(send_typing))
        // Realtime delivery
        .route("/realtime/subscribe", get(subscribe))
        // Health check
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== Chat Server ===");

    let config = ChatServerConfig::from_env();
    config.ensure_dirs().await?;
    info!("Database: {:?}", config.database_path);

    let store = Arc::new(SqliteChatStore::open(&config.database_path).await?);
    let addr = config.bind_addr;
    let (state, worker) = build_state(config, store).await?;

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Chat server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    if let Err(e) = worker.await {
        warn!("Queue worker ended abnormally: {}", e);
    }
    Ok(())
}

async fn health_check() -> &'static str {
    "OK - Chat Server"
}
