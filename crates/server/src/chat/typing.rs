use tracing::debug;

use super::membership::room_recipients;
use super::messages::load_room;
use crate::config::AppState;
use crate::error::Result;
use crate::models::{TypingInput, TypingUpdate};
use crate::realtime::{typing_event, RealtimeEvent};

/// Relay a typing change to every room member. Nothing is stored and the
/// sender's membership is not checked.
pub async fn set_typing(state: &AppState, room: &str, input: TypingInput) -> Result<usize> {
    let chat_room = load_room(state, room).await?;
    let settings = state.store.chat_settings().await?;

    let update = TypingUpdate::new(room, &input.user, input.is_typing, input.is_guest);
    let event = typing_event(room);
    let recipients = room_recipients(&chat_room, &settings);

    for member in &recipients {
        state
            .publisher
            .publish(RealtimeEvent::new(event.as_str(), member.as_str(), &update)?)
            .await?;
    }

    debug!(
        "Relayed typing={} from {} to {} members of {}",
        input.is_typing,
        input.user,
        recipients.len(),
        room
    );
    Ok(recipients.len())
}
