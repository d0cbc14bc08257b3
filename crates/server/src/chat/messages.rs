//! Message send, history paging and read markers

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::membership::{is_user_allowed_in_room, room_recipients};
use crate::config::AppState;
use crate::ctx::{Ctx, GUEST_USER};
use crate::error::{ChatError, Result};
use crate::models::{
    ChatMessage, ChatRoom, DayMarker, DocKind, MessageEntry, MessagePosted, PageRequest,
    SendMessageInput, SortOrder, TypingUpdate,
};
use crate::queue::Job;
use crate::realtime::{typing_event, Outbox, RealtimeEvent, LATEST_CHAT_UPDATES};

pub(crate) async fn load_room(state: &AppState, room: &str) -> Result<ChatRoom> {
    state
        .store
        .get_room(room)
        .await?
        .ok_or_else(|| ChatError::NotFound(format!("No room found with the name {}", room)))
}

/// Day-change headers for a page in emitted order.
///
/// At each date change the header goes to the neighbour on the newer day:
/// the later entry when ascending, the earlier entry when descending.
/// Boundaries on page edges are not visible here.
pub fn day_markers(messages: &[ChatMessage], order: SortOrder) -> Vec<Option<DayMarker>> {
    let mut markers = vec![None; messages.len()];
    for i in 1..messages.len() {
        let previous = messages[i - 1].creation_date();
        let current = messages[i].creation_date();
        if previous == current {
            continue;
        }
        match order {
            SortOrder::Ascending => markers[i] = Some(DayMarker::day_change(current)),
            SortOrder::Descending => markers[i - 1] = Some(DayMarker::day_change(previous)),
        }
    }
    markers
}

/// One page of a room's history
pub async fn get_all(
    state: &AppState,
    room: &str,
    email: &str,
    order_by: Option<&str>,
    start: u32,
    page_length: u32,
) -> Result<Vec<MessageEntry>> {
    let order = SortOrder::parse(order_by)?;
    let chat_room = load_room(state, room).await?;
    let settings = state.store.chat_settings().await?;

    if !is_user_allowed_in_room(&chat_room, email, &settings) {
        warn!("{} is not allowed to read room {}", email, room);
        return Err(ChatError::Unauthorized);
    }

    let page = PageRequest {
        order,
        start,
        page_length,
    };
    let messages = state.store.messages(room, page).await?;
    let markers = day_markers(&messages, order);

    let mut entries = Vec::with_capacity(messages.len());
    for (message, header) in messages.into_iter().zip(markers) {
        let possible_transitions = state
            .workflow
            .possible_transitions(DocKind::ChatMessage, message.workflow_state.as_deref())
            .await?;
        entries.push(MessageEntry {
            message,
            header,
            possible_transitions,
        });
    }
    Ok(entries)
}

/// Store a message and fan it out to every room member.
///
/// The typing-stop event goes out immediately; the message and
/// `latest_chat_updates` events are released only after commit.
pub async fn send(state: &AppState, room: &str, input: SendMessageInput) -> Result<MessagePosted> {
    let chat_room = load_room(state, room).await?;
    let settings = state.store.chat_settings().await?;

    if !is_user_allowed_in_room(&chat_room, &input.email, &settings) {
        warn!("{} is not allowed to post in room {}", input.email, room);
        return Err(ChatError::Unauthorized);
    }
    if input.content.trim().is_empty() {
        return Err(ChatError::Validation("Message content is required".to_string()));
    }

    let now = Utc::now();
    let message = ChatMessage {
        name: Uuid::new_v4().simple().to_string(),
        room: room.to_string(),
        sender: input.user.clone(),
        sender_email: input.email.clone(),
        content: input.content.clone(),
        content_type: input.content_type,
        workflow_state: state.workflow.initial_state(DocKind::ChatMessage),
        chat_bot: input.chat_bot,
        action_type: input.action_type,
        action_required: input.action_required,
        reference_doctype: input.reference_doctype,
        reference_docname: input.reference_docname,
        creation: now,
    };

    let posted = MessagePosted {
        content: input.content,
        user: input.user,
        creation: now,
        room: room.to_string(),
        sender_email: input.email,
    };
    let typing = TypingUpdate::new(room, &posted.user, false, posted.user == GUEST_USER);
    let recipients = room_recipients(&chat_room, &settings);

    let mut tx = state.store.begin().await?;
    tx.insert_message(&message).await?;
    tx.touch_room(room, &posted.content, &posted.sender_email, now)
        .await?;

    let mut outbox = Outbox::new(state.publisher.as_ref());
    for member in &recipients {
        outbox
            .publish(RealtimeEvent::new(typing_event(room), member.as_str(), &typing)?)
            .await?;
        outbox.publish_after_commit(RealtimeEvent::new(room, member.as_str(), &posted)?);
        outbox.publish_after_commit(RealtimeEvent::new(LATEST_CHAT_UPDATES, member.as_str(), &posted)?);
    }

    tx.commit().await?;
    outbox.flush().await?;

    info!(
        "Stored message {} in room {} ({} recipients)",
        message.name,
        room,
        recipients.len()
    );
    Ok(posted)
}

/// Queue a read marker update for the requester
pub fn mark_as_read(state: &AppState, ctx: &Ctx, room: &str) -> Result<()> {
    if ctx.is_guest() {
        return Err(ChatError::Unauthorized);
    }
    state.queue.enqueue(Job::MarkRoomRead {
        room: room.to_string(),
        user: ctx.user_id().to_string(),
    })
}
