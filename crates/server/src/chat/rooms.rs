//! Room directory, room detail and private room creation

use chrono::Utc;
use std::cmp::Ordering;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::membership::{can_list, guest_roster};
use crate::config::AppState;
use crate::ctx::Ctx;
use crate::error::{ChatError, Result};
use crate::models::{
    join_identities, ChatRoom, CreateRoomInput, DocKind, MemberName, RoomCreated, RoomSummary,
    RoomType,
};
use crate::realtime::{Outbox, RealtimeEvent, PRIVATE_ROOM_CREATION};

/// Unread rooms first, then most recently modified first.
pub fn compare_rooms(a: &RoomSummary, b: &RoomSummary) -> Ordering {
    a.is_read
        .cmp(&b.is_read)
        .then_with(|| b.modified.cmp(&a.modified))
}

/// `None` when no task filter applies
fn task_filter(task: Option<&str>) -> Option<&str> {
    task.map(str::trim)
        .filter(|t| !t.is_empty() && *t != "null" && *t != "0")
}

/// The member of a two-person room that is not `requester`
fn counterpart(members: &[String], requester: Option<&str>) -> Option<String> {
    match members {
        [first, second] if requester == Some(second.as_str()) => Some(first.clone()),
        [_, second] => Some(second.clone()),
        _ => None,
    }
}

async fn annotate(state: &AppState, room: ChatRoom, requester: Option<&str>) -> Result<RoomSummary> {
    let mut room_name = room.room_name.clone();
    let mut opposite_person_email = None;
    let mut opposite_person_avatar = None;
    let mut opposite_person_customer_profile = None;

    if matches!(room.room_type, RoomType::Direct | RoomType::Group) {
        let members = room.member_list();
        match counterpart(&members, requester) {
            Some(other) => {
                room_name = state.profiles.full_name(&other).await?;
                match state.profiles.latest_profile(&other).await {
                    Ok(Some(profile)) if profile.avatar.is_some() => {
                        opposite_person_avatar = profile.avatar;
                        opposite_person_customer_profile = Some(profile.name);
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Profile lookup for {} failed: {}", other, e),
                }
                opposite_person_email = Some(other);
            }
            None => debug!(
                "Room {} has {} members, skipping counterpart display fields",
                room.name,
                members.len()
            ),
        }
    }

    let is_read = requester.map(|r| room.is_read_by(r)).unwrap_or(false);
    let possible_transitions = state
        .workflow
        .possible_transitions(DocKind::ChatRoom, room.workflow_state.as_deref())
        .await?;

    Ok(RoomSummary {
        room: room.name.clone(),
        name: room.name,
        room_name,
        room_type: room.room_type,
        members: room.members,
        last_message: room.last_message,
        is_read,
        workflow_state: room.workflow_state,
        customer_task: room.customer_task,
        chat_bot: room.chat_bot,
        modified: room.modified,
        opposite_person_email,
        opposite_person_avatar,
        opposite_person_customer_profile,
        possible_transitions,
    })
}

/// All rooms visible to `email`, annotated and sorted
pub async fn list_rooms(state: &AppState, email: &str, task: Option<&str>) -> Result<Vec<RoomSummary>> {
    let settings = state.store.chat_settings().await?;
    let task = task_filter(task);

    let mut rooms = Vec::new();
    for room in state.store.candidate_rooms(email).await? {
        if !can_list(&room, email, &settings) {
            continue;
        }
        if let Some(task) = task {
            if room.customer_task.as_deref() != Some(task) {
                continue;
            }
        }
        rooms.push(annotate(state, room, Some(email)).await?);
    }

    rooms.sort_by(compare_rooms);
    Ok(rooms)
}

/// Result of a room detail lookup; failures are data, not errors
#[derive(Debug)]
pub enum RoomLookup {
    Found(Box<RoomSummary>),
    NotFound(String),
    Unauthorized,
    Failed(String),
}

impl RoomLookup {
    pub fn error_message(&self) -> Option<String> {
        match self {
            RoomLookup::Found(_) => None,
            RoomLookup::NotFound(name) => Some(format!("No room found with the name {}", name)),
            RoomLookup::Unauthorized => Some("Unauthorized access".to_string()),
            RoomLookup::Failed(message) => Some(message.clone()),
        }
    }
}

async fn lookup_room(state: &AppState, name: &str, email: Option<&str>) -> Result<RoomSummary> {
    let room = state
        .store
        .get_room(name)
        .await?
        .ok_or_else(|| ChatError::NotFound(name.to_string()))?;

    if let (RoomType::Guest, Some(email)) = (room.room_type, email) {
        let settings = state.store.chat_settings().await?;
        if !guest_roster(&room, &settings).iter().any(|u| u == email) {
            return Err(ChatError::Unauthorized);
        }
    }

    annotate(state, room, email).await
}

pub async fn get_room_by_name(state: &AppState, name: &str, email: Option<&str>) -> RoomLookup {
    match lookup_room(state, name, email).await {
        Ok(summary) => RoomLookup::Found(Box::new(summary)),
        Err(ChatError::NotFound(_)) => RoomLookup::NotFound(name.to_string()),
        Err(ChatError::Unauthorized) => RoomLookup::Unauthorized,
        Err(e) => {
            warn!("Room lookup for {} failed: {}", name, e);
            RoomLookup::Failed(e.to_string())
        }
    }
}

/// Create a room for the invitees plus the requester and announce it
pub async fn create_private(state: &AppState, ctx: &Ctx, input: CreateRoomInput) -> Result<RoomCreated> {
    if ctx.is_guest() {
        return Err(ChatError::Unauthorized);
    }
    let room_name = input.room_name.trim();
    if room_name.is_empty() {
        return Err(ChatError::Validation("Room name is required".to_string()));
    }

    let mut users: Vec<String> = Vec::new();
    for user in input.users.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
        if !users.iter().any(|u| u == user) {
            users.push(user.to_string());
        }
    }
    if !users.iter().any(|u| u == ctx.user_id()) {
        users.push(ctx.user_id().to_string());
    }

    if input.room_type == RoomType::Direct {
        if users.len() != 2 {
            return Err(ChatError::Validation(format!(
                "A Direct room needs exactly two members, got {}",
                users.len()
            )));
        }
        if state.store.direct_room_exists(&users[0], &users[1]).await? {
            return Err(ChatError::AlreadyExists("Direct Room already exists!".to_string()));
        }
    }

    let now = Utc::now();
    let members = join_identities(&users);
    let room = ChatRoom {
        name: Uuid::new_v4().simple().to_string(),
        room_name: room_name.to_string(),
        room_type: input.room_type,
        members: members.clone(),
        last_message: None,
        is_read: None,
        workflow_state: state.workflow.initial_state(DocKind::ChatRoom),
        customer_task: input.task,
        chat_bot: input.chat_bot,
        users: Vec::new(),
        creation: now,
        modified: now,
    };

    let member_names = if room.room_type == RoomType::Direct {
        let mut names = Vec::with_capacity(users.len());
        for user in &users {
            names.push(MemberName {
                name: state.profiles.full_name(user).await?,
                email: user.clone(),
            });
        }
        Some(names)
    } else {
        None
    };

    let created = RoomCreated {
        room_name: room.room_name.clone(),
        last_date: room.modified,
        room: room.name.clone(),
        is_read: 0,
        room_type: room.room_type,
        members,
        member_names,
    };

    let mut tx = state.store.begin().await?;
    tx.insert_room(&room).await?;

    let mut outbox = Outbox::new(state.publisher.as_ref());
    for user in &users {
        outbox.publish_after_commit(RealtimeEvent::new(PRIVATE_ROOM_CREATION, user.as_str(), &created)?);
    }

    tx.commit().await?;
    outbox.flush().await?;

    info!(
        "Created {} room {} for {} members",
        room.room_type,
        room.name,
        users.len()
    );
    Ok(created)
}
