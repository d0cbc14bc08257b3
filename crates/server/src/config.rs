//! Chat server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::models::split_identities;
use crate::queue::TaskQueue;
use crate::realtime::{Publisher, RealtimeHub};
use crate::store::{ChatStore, ProfileDirectory};
use crate::workflow::WorkflowEngine;

/// Configuration for the chat server
#[derive(Clone, Debug)]
pub struct ChatServerConfig {
    /// Data directory holding the database
    pub data_dir: PathBuf,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: SocketAddr,
    /// Operator roster seeded into chat settings at startup
    pub operators: Vec<String>,
    /// Optional JSON workflow definition file
    pub workflow_file: Option<PathBuf>,
    /// Per-user realtime channel capacity
    pub realtime_buffer: usize,
    /// Keepalive interval for realtime subscriptions
    pub heartbeat_secs: u64,
}

impl Default for ChatServerConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("chat_data");
        Self {
            database_path: data_dir.join("chat.sqlite"),
            data_dir,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            operators: Vec::new(),
            workflow_file: None,
            realtime_buffer: 100,
            heartbeat_secs: 30,
        }
    }
}

impl ChatServerConfig {
    /// Create config with custom base directory
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let data_dir = base_dir.into();
        Self {
            database_path: data_dir.join("chat.sqlite"),
            data_dir,
            ..Self::default()
        }
    }

    /// Build config from `CHAT_*` environment variables
    pub fn from_env() -> Self {
        let mut config = std::env::var("CHAT_ROOT")
            .map(Self::with_base_dir)
            .unwrap_or_default();

        if let Some(port) = env_parse::<u16>("CHAT_PORT") {
            config.bind_addr.set_port(port);
        }
        if let Ok(raw) = std::env::var("CHAT_OPERATORS") {
            config.operators = split_identities(&raw);
        }
        if let Ok(path) = std::env::var("CHAT_WORKFLOWS") {
            config.workflow_file = Some(PathBuf::from(path));
        }
        if let Some(buffer) = env_parse("CHAT_REALTIME_BUFFER") {
            config.realtime_buffer = buffer;
        }
        if let Some(secs) = env_parse("CHAT_HEARTBEAT_SECS") {
            config.heartbeat_secs = secs;
        }
        config
    }

    /// Ensure all directories exist
    pub async fn ensure_dirs(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        if let Some(parent) = self.database_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

/// App state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ChatServerConfig,
    pub store: Arc<dyn ChatStore>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub workflow: Arc<dyn WorkflowEngine>,
    pub publisher: Arc<dyn Publisher>,
    /// Concrete hub backing realtime subscriptions
    pub hub: Arc<RealtimeHub>,
    pub queue: Arc<dyn TaskQueue>,
}
