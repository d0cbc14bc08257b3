//! Chat domain operations
//!
//! Every operation takes the shared `AppState` and talks to the store,
//! profile directory, workflow engine and publisher through their traits.

pub mod membership;
pub mod messages;
pub mod rooms;
pub mod typing;

pub use messages::{day_markers, get_all, mark_as_read, send};
pub use rooms::{compare_rooms, create_private, get_room_by_name, list_rooms, RoomLookup};
pub use typing::set_typing;
