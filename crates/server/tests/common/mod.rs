#![allow(dead_code)]

use chat_server::config::{AppState, ChatServerConfig};
use chat_server::models::{ChatMessage, ChatRoom, RoomType};
use chat_server::store::{ChatStore, SqliteChatStore};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

pub struct TestApp {
    pub dir: TempDir,
    pub store: Arc<SqliteChatStore>,
    pub state: AppState,
}

pub async fn test_app(operators: &[&str]) -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut config = ChatServerConfig::with_base_dir(dir.path());
    config.operators = operators.iter().map(|o| o.to_string()).collect();

    let store = Arc::new(SqliteChatStore::open(&config.database_path).await.unwrap());
    let (state, _worker) = chat_server::build_state(config, store.clone()).await.unwrap();

    TestApp { dir, store, state }
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

pub fn room(name: &str, room_type: RoomType, members: &str, modified: DateTime<Utc>) -> ChatRoom {
    ChatRoom {
        name: name.to_string(),
        room_name: format!("Room {}", name),
        room_type,
        members: members.to_string(),
        last_message: None,
        is_read: None,
        workflow_state: None,
        customer_task: None,
        chat_bot: None,
        users: Vec::new(),
        creation: modified,
        modified,
    }
}

pub fn message(room: &str, name: &str, sender_email: &str, creation: DateTime<Utc>) -> ChatMessage {
    ChatMessage {
        name: name.to_string(),
        room: room.to_string(),
        sender: sender_email.to_string(),
        sender_email: sender_email.to_string(),
        content: format!("message {}", name),
        content_type: "text".to_string(),
        workflow_state: None,
        chat_bot: None,
        action_type: None,
        action_required: false,
        reference_doctype: None,
        reference_docname: None,
        creation,
    }
}

pub async fn seed_rooms(store: &SqliteChatStore, rooms: &[ChatRoom]) {
    let mut tx = store.begin().await.unwrap();
    for room in rooms {
        tx.insert_room(room).await.unwrap();
    }
    tx.commit().await.unwrap();
}

pub async fn seed_messages(store: &SqliteChatStore, messages: &[ChatMessage]) {
    let mut tx = store.begin().await.unwrap();
    for message in messages {
        tx.insert_message(message).await.unwrap();
    }
    tx.commit().await.unwrap();
}
