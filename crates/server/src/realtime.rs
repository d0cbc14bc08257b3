//! Realtime event delivery
//!
//! Events are addressed to a single identity. `RealtimeHub` keeps one
//! broadcast channel per identity; `Outbox` holds events that must not be
//! observed before the surrounding store transaction commits.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::error::Result;

/// Event emitted to every member after a message is stored
pub const LATEST_CHAT_UPDATES: &str = "latest_chat_updates";

/// Event emitted when a private room is created
pub const PRIVATE_ROOM_CREATION: &str = "private_room_creation";

/// Typing event name for a room
pub fn typing_event(room: &str) -> String {
    format!("{}:typing", room)
}

#[derive(Clone, Debug, Serialize)]
pub struct RealtimeEvent {
    pub event: String,
    #[serde(skip)]
    pub user: String,
    pub message: serde_json::Value,
}

impl RealtimeEvent {
    pub fn new<T: Serialize>(event: impl Into<String>, user: impl Into<String>, message: &T) -> Result<Self> {
        Ok(Self {
            event: event.into(),
            user: user.into(),
            message: serde_json::to_value(message)?,
        })
    }
}

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver an event to its addressed identity
    async fn publish(&self, event: RealtimeEvent) -> Result<()>;
}

/// In-process per-identity broadcast hub
pub struct RealtimeHub {
    capacity: usize,
    channels: RwLock<HashMap<String, broadcast::Sender<RealtimeEvent>>>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    async fn channel(&self, user: &str) -> broadcast::Sender<RealtimeEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(tx) = channels.get(user) {
                return tx.clone();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(user.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribe to every event addressed to `user`
    pub async fn subscribe(&self, user: &str) -> broadcast::Receiver<RealtimeEvent> {
        self.channel(user).await.subscribe()
    }
}

#[async_trait]
impl Publisher for RealtimeHub {
    async fn publish(&self, event: RealtimeEvent) -> Result<()> {
        let tx = self.channel(&event.user).await;
        debug!("[Realtime] {} -> {}", event.event, event.user);
        // No subscriber is not an error
        let _ = tx.send(event);
        Ok(())
    }
}

/// Buffers after-commit events until `flush`
pub struct Outbox<'a> {
    publisher: &'a dyn Publisher,
    deferred: Vec<RealtimeEvent>,
}

impl<'a> Outbox<'a> {
    pub fn new(publisher: &'a dyn Publisher) -> Self {
        Self {
            publisher,
            deferred: Vec::new(),
        }
    }

    /// Publish immediately
    pub async fn publish(&mut self, event: RealtimeEvent) -> Result<()> {
        self.publisher.publish(event).await
    }

    /// Hold until the transaction commits
    pub fn publish_after_commit(&mut self, event: RealtimeEvent) {
        self.deferred.push(event);
    }

    pub fn pending(&self) -> usize {
        self.deferred.len()
    }

    /// Deliver held events in the order they were queued
    pub async fn flush(self) -> Result<()> {
        for event in self.deferred {
            self.publisher.publish(event).await?;
        }
        Ok(())
    }
}
