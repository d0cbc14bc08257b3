//! Room membership rules

use crate::models::{ChatRoom, ChatSettings, RoomType};

/// Identities authorized to staff a Guest room: the room's explicit user
/// list, or the global operator roster when that list is empty.
pub fn guest_roster<'a>(room: &'a ChatRoom, settings: &'a ChatSettings) -> &'a [String] {
    if room.users.is_empty() {
        &settings.chat_operators
    } else {
        &room.users
    }
}

/// Whether `identity` sees the room in its directory listing
pub fn can_list(room: &ChatRoom, identity: &str, settings: &ChatSettings) -> bool {
    match room.room_type {
        RoomType::Guest => guest_roster(room, settings).iter().any(|u| u == identity),
        RoomType::Direct | RoomType::Group => room.has_member(identity),
    }
}

/// Whether `identity` may read or post in the room. Guest rooms also admit
/// the guests recorded in their member list.
pub fn is_user_allowed_in_room(room: &ChatRoom, identity: &str, settings: &ChatSettings) -> bool {
    match room.room_type {
        RoomType::Guest => {
            guest_roster(room, settings).iter().any(|u| u == identity) || room.has_member(identity)
        }
        RoomType::Direct | RoomType::Group => room.has_member(identity),
    }
}

/// Everyone who receives realtime events for the room, without duplicates
pub fn room_recipients(room: &ChatRoom, settings: &ChatSettings) -> Vec<String> {
    let mut recipients = room.member_list();
    if room.room_type == RoomType::Guest {
        for user in guest_roster(room, settings) {
            if !recipients.contains(user) {
                recipients.push(user.clone());
            }
        }
    }
    recipients
}
