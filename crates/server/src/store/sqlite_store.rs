//! SQLite-backed chat store
//!
//! Timestamps are stored as fixed-width RFC 3339 text (microseconds, `Z`)
//! so that lexical order matches chronological order.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use super::{ChatStore, ProfileDirectory, StoreTransaction};
use crate::error::{ChatError, Result};
use crate::models::{
    ChatMessage, ChatRoom, ChatSettings, PageRequest, Profile, RoomType, SortOrder,
};

const ROOM_COLUMNS: &str = "name, room_name, type, members, last_message, is_read, \
     workflow_state, customer_task, chat_bot, creation, modified";

const MESSAGE_COLUMNS: &str = "name, room, sender, sender_email, content, content_type, \
     workflow_state, chat_bot, action_type, action_required, reference_doctype, \
     reference_docname, creation";

pub(crate) fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid timestamp in store: {}", raw))?;
    Ok(parsed.with_timezone(&Utc))
}

pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    /// Open (creating if missing) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            db_path.to_string_lossy().replace('\\', "/")
        ))?
        .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_db().await?;

        info!("[Store] Opened chat database at {:?}", db_path);
        Ok(store)
    }

    async fn init_db(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS chat_rooms (
                name TEXT PRIMARY KEY,
                room_name TEXT NOT NULL,
                type TEXT NOT NULL,
                members TEXT NOT NULL DEFAULT '',
                last_message TEXT,
                is_read TEXT,
                workflow_state TEXT,
                customer_task TEXT,
                chat_bot TEXT,
                creation TEXT NOT NULL,
                modified TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS chat_room_users (
                room TEXT NOT NULL,
                user TEXT NOT NULL,
                PRIMARY KEY (room, user),
                FOREIGN KEY (room) REFERENCES chat_rooms(name)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                name TEXT PRIMARY KEY,
                room TEXT NOT NULL,
                sender TEXT NOT NULL,
                sender_email TEXT NOT NULL,
                content TEXT NOT NULL,
                content_type TEXT NOT NULL DEFAULT 'text',
                workflow_state TEXT,
                chat_bot TEXT,
                action_type TEXT,
                action_required INTEGER NOT NULL DEFAULT 0,
                reference_doctype TEXT,
                reference_docname TEXT,
                creation TEXT NOT NULL,
                FOREIGN KEY (room) REFERENCES chat_rooms(name)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_chat_messages_room ON chat_messages (room, creation)",
            r#"
            CREATE TABLE IF NOT EXISTS chat_operators (
                user TEXT PRIMARY KEY
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS users (
                email TEXT PRIMARY KEY,
                full_name TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS customer_profiles (
                name TEXT PRIMARY KEY,
                user TEXT NOT NULL,
                avatar TEXT,
                modified TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Add identities to the global operator roster
    pub async fn seed_operators(&self, operators: &[String]) -> Result<()> {
        for operator in operators {
            sqlx::query("INSERT OR IGNORE INTO chat_operators (user) VALUES (?)")
                .bind(operator)
                .execute(&self.pool)
                .await?;
        }
        if !operators.is_empty() {
            info!("[Store] Seeded {} chat operators", operators.len());
        }
        Ok(())
    }

    pub async fn upsert_user(&self, email: &str, full_name: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (email, full_name) VALUES (?, ?)
             ON CONFLICT(email) DO UPDATE SET full_name = excluded.full_name",
        )
        .bind(email)
        .bind(full_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            "INSERT INTO customer_profiles (name, user, avatar, modified) VALUES (?, ?, ?, ?)",
        )
        .bind(&profile.name)
        .bind(&profile.user)
        .bind(&profile.avatar)
        .bind(encode_ts(profile.modified))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count_messages(&self, room: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages WHERE room = ?")
            .bind(room)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn room_users(&self, room: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT user FROM chat_room_users WHERE room = ? ORDER BY user")
                .bind(room)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(user,)| user).collect())
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<ChatRoom> {
        let mut room = room_from_row(row)?;
        if room.room_type == RoomType::Guest {
            room.users = self.room_users(&room.name).await?;
        }
        Ok(room)
    }
}

fn room_from_row(row: &SqliteRow) -> Result<ChatRoom> {
    let room_type: String = row.try_get("type")?;
    let creation: String = row.try_get("creation")?;
    let modified: String = row.try_get("modified")?;

    Ok(ChatRoom {
        name: row.try_get("name")?,
        room_name: row.try_get("room_name")?,
        room_type: room_type.parse()?,
        members: row.try_get("members")?,
        last_message: row.try_get("last_message")?,
        is_read: row.try_get("is_read")?,
        workflow_state: row.try_get("workflow_state")?,
        customer_task: row.try_get("customer_task")?,
        chat_bot: row.try_get("chat_bot")?,
        users: Vec::new(),
        creation: decode_ts(&creation)?,
        modified: decode_ts(&modified)?,
    })
}

fn message_from_row(row: &SqliteRow) -> Result<ChatMessage> {
    let creation: String = row.try_get("creation")?;

    Ok(ChatMessage {
        name: row.try_get("name")?,
        room: row.try_get("room")?,
        sender: row.try_get("sender")?,
        sender_email: row.try_get("sender_email")?,
        content: row.try_get("content")?,
        content_type: row.try_get("content_type")?,
        workflow_state: row.try_get("workflow_state")?,
        chat_bot: row.try_get("chat_bot")?,
        action_type: row.try_get("action_type")?,
        action_required: row.try_get("action_required")?,
        reference_doctype: row.try_get("reference_doctype")?,
        reference_docname: row.try_get("reference_docname")?,
        creation: decode_ts(&creation)?,
    })
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    async fn candidate_rooms(&self, identity: &str) -> Result<Vec<ChatRoom>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_rooms WHERE type = 'Guest' OR instr(members, ?) > 0",
            ROOM_COLUMNS
        ))
        .bind(identity)
        .fetch_all(&self.pool)
        .await?;

        let mut rooms = Vec::with_capacity(rows.len());
        for row in &rows {
            rooms.push(self.hydrate(row).await?);
        }
        Ok(rooms)
    }

    async fn get_room(&self, name: &str) -> Result<Option<ChatRoom>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM chat_rooms WHERE name = ?",
            ROOM_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    async fn direct_room_exists(&self, first: &str, second: &str) -> Result<bool> {
        let existing: Option<(String,)> = sqlx::query_as(
            "SELECT name FROM chat_rooms
             WHERE type = 'Direct' AND instr(members, ?) > 0 AND instr(members, ?) > 0
             LIMIT 1",
        )
        .bind(first)
        .bind(second)
        .fetch_optional(&self.pool)
        .await?;
        Ok(existing.is_some())
    }

    async fn messages(&self, room: &str, page: PageRequest) -> Result<Vec<ChatMessage>> {
        let direction = match page.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_messages WHERE room = ?
             ORDER BY creation {dir}, name {dir} LIMIT ? OFFSET ?",
            MESSAGE_COLUMNS,
            dir = direction
        ))
        .bind(room)
        .bind(i64::from(page.page_length))
        .bind(i64::from(page.start))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    async fn mark_read(&self, room: &str, identity: &str) -> Result<()> {
        // Single statement: a SELECT then UPDATE transaction can hit SQLITE_BUSY
        let result = sqlx::query(
            "UPDATE chat_rooms SET is_read = CASE
                 WHEN is_read IS NULL OR trim(is_read) = '' THEN ?
                 WHEN instr(',' || replace(is_read, ' ', '') || ',', ',' || ? || ',') > 0 THEN is_read
                 ELSE is_read || ', ' || ?
             END
             WHERE name = ?",
        )
        .bind(identity)
        .bind(identity)
        .bind(identity)
        .bind(room)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::NotFound(format!(
                "No room found with the name {}",
                room
            )));
        }

        debug!("[Store] {} marked room {} as read", identity, room);
        Ok(())
    }

    async fn chat_settings(&self) -> Result<ChatSettings> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT user FROM chat_operators ORDER BY user")
            .fetch_all(&self.pool)
            .await?;
        Ok(ChatSettings {
            chat_operators: rows.into_iter().map(|(user,)| user).collect(),
        })
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx }))
    }
}

#[async_trait]
impl ProfileDirectory for SqliteChatStore {
    async fn full_name(&self, identity: &str) -> Result<String> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT full_name FROM users WHERE email = ?")
                .bind(identity)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row
            .and_then(|(name,)| name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| identity.to_string()))
    }

    async fn latest_profile(&self, identity: &str) -> Result<Option<Profile>> {
        let row: Option<(String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT name, user, avatar, modified FROM customer_profiles
             WHERE user = ? ORDER BY modified DESC LIMIT 1",
        )
        .bind(identity)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((name, user, avatar, modified)) => Ok(Some(Profile {
                name,
                user,
                avatar,
                modified: decode_ts(&modified)?,
            })),
            None => Ok(None),
        }
    }
}

struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn insert_room(&mut self, room: &ChatRoom) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO chat_rooms ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ROOM_COLUMNS
        ))
        .bind(&room.name)
        .bind(&room.room_name)
        .bind(room.room_type.as_str())
        .bind(&room.members)
        .bind(&room.last_message)
        .bind(&room.is_read)
        .bind(&room.workflow_state)
        .bind(&room.customer_task)
        .bind(&room.chat_bot)
        .bind(encode_ts(room.creation))
        .bind(encode_ts(room.modified))
        .execute(&mut *self.tx)
        .await?;

        for user in &room.users {
            sqlx::query("INSERT OR IGNORE INTO chat_room_users (room, user) VALUES (?, ?)")
                .bind(&room.name)
                .bind(user)
                .execute(&mut *self.tx)
                .await?;
        }
        Ok(())
    }

    async fn insert_message(&mut self, message: &ChatMessage) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO chat_messages ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            MESSAGE_COLUMNS
        ))
        .bind(&message.name)
        .bind(&message.room)
        .bind(&message.sender)
        .bind(&message.sender_email)
        .bind(&message.content)
        .bind(&message.content_type)
        .bind(&message.workflow_state)
        .bind(&message.chat_bot)
        .bind(&message.action_type)
        .bind(message.action_required)
        .bind(&message.reference_doctype)
        .bind(&message.reference_docname)
        .bind(encode_ts(message.creation))
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn touch_room(
        &mut self,
        room: &str,
        last_message: &str,
        read_by: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE chat_rooms SET last_message = ?, is_read = ?, modified = ? WHERE name = ?",
        )
        .bind(last_message)
        .bind(read_by)
        .bind(encode_ts(at))
        .bind(room)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ChatError::NotFound(format!(
                "No room found with the name {}",
                room
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
