use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChatError;

/// Kind of chat room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    Direct,
    Group,
    Guest,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Direct => "Direct",
            RoomType::Group => "Group",
            RoomType::Guest => "Guest",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Direct" => Ok(RoomType::Direct),
            "Group" => Ok(RoomType::Group),
            "Guest" => Ok(RoomType::Guest),
            other => Err(ChatError::Validation(format!("Unknown room type: {}", other))),
        }
    }
}

/// A persisted chat room record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    /// Record identifier
    pub name: String,
    pub room_name: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    /// Serialized member list, `", "` separated
    pub members: String,
    pub last_message: Option<String>,
    /// Serialized read markers, `", "` separated identities
    pub is_read: Option<String>,
    pub workflow_state: Option<String>,
    pub customer_task: Option<String>,
    pub chat_bot: Option<String>,
    /// Explicit Guest-room participants
    #[serde(default)]
    pub users: Vec<String>,
    pub creation: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl ChatRoom {
    pub fn member_list(&self) -> Vec<String> {
        split_identities(&self.members)
    }

    pub fn has_member(&self, identity: &str) -> bool {
        self.member_list().iter().any(|m| m == identity)
    }

    /// True only when the read markers are set and name `identity`.
    pub fn is_read_by(&self, identity: &str) -> bool {
        match self.is_read.as_deref() {
            Some(markers) if !markers.trim().is_empty() => {
                split_identities(markers).iter().any(|m| m == identity)
            }
            _ => false,
        }
    }
}

/// Split a serialized identity list. Both `","` and `", "` separators occur
/// in stored rows.
pub fn split_identities(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_identities(identities: &[String]) -> String {
    identities.join(", ")
}

/// A persisted chat message record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub name: String,
    pub room: String,
    pub sender: String,
    pub sender_email: String,
    pub content: String,
    pub content_type: String,
    pub workflow_state: Option<String>,
    pub chat_bot: Option<String>,
    pub action_type: Option<String>,
    pub action_required: bool,
    pub reference_doctype: Option<String>,
    pub reference_docname: Option<String>,
    pub creation: DateTime<Utc>,
}

impl ChatMessage {
    pub fn creation_date(&self) -> NaiveDate {
        self.creation.date_naive()
    }
}

/// Global chat settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatSettings {
    pub chat_operators: Vec<String>,
}

/// Most recent customer profile of an identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub user: String,
    pub avatar: Option<String>,
    pub modified: DateTime<Utc>,
}

/// Room record annotated for a specific requester
#[derive(Debug, Clone, Serialize)]
pub struct RoomSummary {
    pub name: String,
    /// Same as `name`, kept for clients keyed on `room`
    pub room: String,
    pub room_name: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub members: String,
    pub last_message: Option<String>,
    pub is_read: bool,
    pub workflow_state: Option<String>,
    pub customer_task: Option<String>,
    pub chat_bot: Option<String>,
    pub modified: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opposite_person_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opposite_person_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opposite_person_customer_profile: Option<String>,
    pub possible_transitions: Vec<String>,
}

/// Synthetic calendar-day boundary annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayMarker {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub date: String,
}

impl DayMarker {
    pub fn day_change(date: NaiveDate) -> Self {
        Self {
            kind: "day_change",
            date: date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// One entry of a message history page
#[derive(Debug, Clone, Serialize)]
pub struct MessageEntry {
    #[serde(flatten)]
    pub message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<DayMarker>,
    pub possible_transitions: Vec<String>,
}

/// Sort direction for message history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    /// Parse an `order_by` clause. Only ordering by `creation` is accepted.
    pub fn parse(order_by: Option<&str>) -> Result<Self, ChatError> {
        let Some(raw) = order_by else {
            return Ok(SortOrder::Ascending);
        };
        let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "" | "creation" | "creation asc" => Ok(SortOrder::Ascending),
            "creation desc" => Ok(SortOrder::Descending),
            _ => Err(ChatError::Validation(format!("Unsupported order_by: {}", raw))),
        }
    }
}

/// Offset/limit window over message history
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub order: SortOrder,
    pub start: u32,
    pub page_length: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            order: SortOrder::Ascending,
            start: 0,
            page_length: 10,
        }
    }
}

/// Entity kinds known to the workflow engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocKind {
    #[serde(rename = "Chat Room")]
    ChatRoom,
    #[serde(rename = "Chat Message")]
    ChatMessage,
}

/// Input for sending a message
#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageInput {
    pub content: String,
    pub user: String,
    pub email: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub chat_bot: Option<String>,
    pub action_type: Option<String>,
    #[serde(default)]
    pub action_required: bool,
    pub reference_doctype: Option<String>,
    pub reference_docname: Option<String>,
}

fn default_content_type() -> String {
    "text".to_string()
}

/// Input for creating a private room
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomInput {
    pub room_name: String,
    pub users: Vec<String>,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    pub task: Option<String>,
    pub chat_bot: Option<String>,
}

/// Typing indicator input
#[derive(Debug, Clone, Deserialize)]
pub struct TypingInput {
    pub user: String,
    pub is_typing: bool,
    #[serde(default)]
    pub is_guest: bool,
}

/// Member display entry carried by Direct room creation events
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberName {
    pub name: String,
    pub email: String,
}

/// Payload broadcast on private room creation
#[derive(Debug, Clone, Serialize)]
pub struct RoomCreated {
    pub room_name: String,
    pub last_date: DateTime<Utc>,
    pub room: String,
    pub is_read: u8,
    pub room_type: RoomType,
    pub members: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_names: Option<Vec<MemberName>>,
}

/// Payload broadcast for a sent message
#[derive(Debug, Clone, Serialize)]
pub struct MessagePosted {
    pub content: String,
    pub user: String,
    pub creation: DateTime<Utc>,
    pub room: String,
    pub sender_email: String,
}

/// Payload broadcast for typing changes
#[derive(Debug, Clone, Serialize)]
pub struct TypingUpdate {
    pub room: String,
    pub user: String,
    pub is_typing: String,
    pub is_guest: String,
}

impl TypingUpdate {
    pub fn new(room: &str, user: &str, is_typing: bool, is_guest: bool) -> Self {
        Self {
            room: room.to_string(),
            user: user.to_string(),
            is_typing: is_typing.to_string(),
            is_guest: is_guest.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_identities_handles_both_separators() {
        assert_eq!(
            split_identities("a@x.com, b@x.com,c@x.com"),
            vec!["a@x.com", "b@x.com", "c@x.com"]
        );
        assert!(split_identities("").is_empty());
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse(None).unwrap(), SortOrder::Ascending);
        assert_eq!(
            SortOrder::parse(Some("creation  DESC")).unwrap(),
            SortOrder::Descending
        );
        assert!(SortOrder::parse(Some("content; drop table")).is_err());
    }

    #[test]
    fn test_day_marker_serializes_as_header() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let json = serde_json::to_value(DayMarker::day_change(date)).unwrap();
        assert_eq!(json["type"], "day_change");
        assert_eq!(json["date"], "2024-01-02");
    }
}
