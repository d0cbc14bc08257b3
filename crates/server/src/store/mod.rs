//! Document store abstraction
//!
//! Handlers only talk to these traits. `SqliteChatStore` is the bundled
//! implementation.

pub mod sqlite_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{ChatMessage, ChatRoom, ChatSettings, PageRequest, Profile};

pub use sqlite_store::SqliteChatStore;

#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Guest rooms plus every room whose serialized member list mentions
    /// `identity`. Callers apply exact membership and Guest gating.
    async fn candidate_rooms(&self, identity: &str) -> Result<Vec<ChatRoom>>;

    async fn get_room(&self, name: &str) -> Result<Option<ChatRoom>>;

    /// Substring match of both identities against Direct room member lists.
    async fn direct_room_exists(&self, first: &str, second: &str) -> Result<bool>;

    async fn messages(&self, room: &str, page: PageRequest) -> Result<Vec<ChatMessage>>;

    /// Add `identity` to the room's read markers without touching `modified`.
    async fn mark_read(&self, room: &str, identity: &str) -> Result<()>;

    async fn chat_settings(&self) -> Result<ChatSettings>;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;
}

/// Unit of work over the store. Dropping without `commit` rolls back.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_room(&mut self, room: &ChatRoom) -> Result<()>;

    async fn insert_message(&mut self, message: &ChatMessage) -> Result<()>;

    /// Record a new last message; read markers are reset to `read_by`.
    async fn touch_room(
        &mut self,
        room: &str,
        last_message: &str,
        read_by: &str,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Display name of an identity, falling back to the identity itself.
    async fn full_name(&self, identity: &str) -> Result<String>;

    async fn latest_profile(&self, identity: &str) -> Result<Option<Profile>>;
}
