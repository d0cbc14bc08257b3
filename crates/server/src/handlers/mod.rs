//! HTTP handlers for the chat server

pub mod messages;
pub mod rooms;
pub mod subscribe;
pub mod typing;

// Re-export AppState from config
pub use crate::config::AppState;

// Room directory
pub use rooms::{create_room, get_room, list_rooms};

// Messages
pub use messages::{get_messages, mark_read, send_message};

// Realtime
pub use subscribe::subscribe;
pub use typing::update_typing as send_typing;
