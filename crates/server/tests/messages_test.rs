mod common;

use chat_server::chat;
use chat_server::ctx::Ctx;
use chat_server::error::ChatError;
use chat_server::models::{RoomType, SendMessageInput, TypingInput};
use chat_server::store::ChatStore;
use common::{at, message, room, seed_messages, seed_rooms, test_app};
use std::time::Duration;

fn send_input(email: &str, content: &str) -> SendMessageInput {
    SendMessageInput {
        content: content.to_string(),
        user: email.to_string(),
        email: email.to_string(),
        content_type: "text".to_string(),
        chat_bot: None,
        action_type: None,
        action_required: false,
        reference_doctype: None,
        reference_docname: None,
    }
}

#[tokio::test]
async fn test_unauthorized_send_leaves_no_trace() {
    let app = test_app(&[]).await;
    seed_rooms(
        &app.store,
        &[room("ab", RoomType::Direct, "a@x.com, b@x.com", at(1, 9))],
    )
    .await;
    let mut rx_a = app.state.hub.subscribe("a@x.com").await;

    let result = chat::send(&app.state, "ab", send_input("mallory@x.com", "hi")).await;
    assert!(matches!(result, Err(ChatError::Unauthorized)));

    assert_eq!(app.store.count_messages("ab").await.unwrap(), 0);
    assert!(rx_a.try_recv().is_err());
    let stored = app.store.get_room("ab").await.unwrap().unwrap();
    assert!(stored.last_message.is_none());
}

#[tokio::test]
async fn test_send_persists_and_fans_out_in_order() {
    let app = test_app(&[]).await;
    let mut ab = room("ab", RoomType::Direct, "a@x.com, b@x.com", at(1, 9));
    ab.is_read = Some("b@x.com".into());
    seed_rooms(&app.store, &[ab]).await;
    let mut rx_a = app.state.hub.subscribe("a@x.com").await;
    let mut rx_b = app.state.hub.subscribe("b@x.com").await;

    let posted = chat::send(&app.state, "ab", send_input("a@x.com", "hello"))
        .await
        .unwrap();
    assert_eq!(posted.room, "ab");

    for rx in [&mut rx_a, &mut rx_b] {
        let typing = rx.try_recv().unwrap();
        assert_eq!(typing.event, "ab:typing");
        assert_eq!(typing.message["is_typing"], "false");
        assert_eq!(typing.message["is_guest"], "false");

        let message = rx.try_recv().unwrap();
        assert_eq!(message.event, "ab");
        assert_eq!(message.message["content"], "hello");
        assert_eq!(message.message["sender_email"], "a@x.com");

        let latest = rx.try_recv().unwrap();
        assert_eq!(latest.event, "latest_chat_updates");
        assert!(rx.try_recv().is_err());
    }

    assert_eq!(app.store.count_messages("ab").await.unwrap(), 1);
    let stored = app.store.get_room("ab").await.unwrap().unwrap();
    assert_eq!(stored.last_message.as_deref(), Some("hello"));
    assert!(stored.is_read_by("a@x.com"));
    assert!(!stored.is_read_by("b@x.com"));
    assert!(stored.modified > at(1, 9));
}

#[tokio::test]
async fn test_guest_room_send_reaches_operators() {
    let app = test_app(&["op@x.com"]).await;
    seed_rooms(
        &app.store,
        &[room("support", RoomType::Guest, "visitor@x.com", at(1, 9))],
    )
    .await;
    let mut rx_op = app.state.hub.subscribe("op@x.com").await;

    let mut input = send_input("visitor@x.com", "help please");
    input.user = "Guest".into();
    chat::send(&app.state, "support", input).await.unwrap();

    let typing = rx_op.try_recv().unwrap();
    assert_eq!(typing.message["is_guest"], "true");
    assert_eq!(rx_op.try_recv().unwrap().event, "support");
}

#[tokio::test]
async fn test_history_ascending_with_day_marker() {
    let app = test_app(&[]).await;
    seed_rooms(
        &app.store,
        &[room("ab", RoomType::Direct, "a@x.com, b@x.com", at(1, 9))],
    )
    .await;
    seed_messages(
        &app.store,
        &[
            message("ab", "m1", "a@x.com", at(1, 9)),
            message("ab", "m2", "b@x.com", at(1, 18)),
            message("ab", "m3", "a@x.com", at(2, 7)),
        ],
    )
    .await;

    let page = chat::get_all(&app.state, "ab", "a@x.com", None, 0, 10)
        .await
        .unwrap();
    let names: Vec<_> = page.iter().map(|e| e.message.name.as_str()).collect();
    assert_eq!(names, vec!["m1", "m2", "m3"]);
    assert!(page[0].header.is_none());
    assert!(page[1].header.is_none());
    let header = page[2].header.as_ref().unwrap();
    assert_eq!(header.kind, "day_change");
    assert_eq!(header.date, "2024-01-02");
}

#[tokio::test]
async fn test_history_descending_with_day_marker() {
    let app = test_app(&[]).await;
    seed_rooms(
        &app.store,
        &[room("ab", RoomType::Direct, "a@x.com, b@x.com", at(1, 9))],
    )
    .await;
    seed_messages(
        &app.store,
        &[
            message("ab", "m1", "a@x.com", at(1, 9)),
            message("ab", "m2", "b@x.com", at(1, 18)),
            message("ab", "m3", "a@x.com", at(2, 7)),
        ],
    )
    .await;

    let page = chat::get_all(&app.state, "ab", "b@x.com", Some("creation desc"), 0, 10)
        .await
        .unwrap();
    let names: Vec<_> = page.iter().map(|e| e.message.name.as_str()).collect();
    assert_eq!(names, vec!["m3", "m2", "m1"]);
    assert_eq!(page[0].header.as_ref().unwrap().date, "2024-01-02");
    assert!(page[1].header.is_none());
    assert!(page[2].header.is_none());
}

#[tokio::test]
async fn test_history_paging_window() {
    let app = test_app(&[]).await;
    seed_rooms(
        &app.store,
        &[room("ab", RoomType::Direct, "a@x.com, b@x.com", at(1, 9))],
    )
    .await;
    let messages: Vec<_> = (0..5)
        .map(|i| message("ab", &format!("m{}", i), "a@x.com", at(3, 8 + i)))
        .collect();
    seed_messages(&app.store, &messages).await;

    let page = chat::get_all(&app.state, "ab", "a@x.com", None, 2, 2)
        .await
        .unwrap();
    let names: Vec<_> = page.iter().map(|e| e.message.name.as_str()).collect();
    assert_eq!(names, vec!["m2", "m3"]);
    assert!(page.iter().all(|e| e.possible_transitions.is_empty()));
}

#[tokio::test]
async fn test_history_requires_membership() {
    let app = test_app(&[]).await;
    seed_rooms(
        &app.store,
        &[room("ab", RoomType::Direct, "a@x.com, b@x.com", at(1, 9))],
    )
    .await;

    let result = chat::get_all(&app.state, "ab", "mallory@x.com", None, 0, 10).await;
    assert!(matches!(result, Err(ChatError::Unauthorized)));

    let result = chat::get_all(&app.state, "ab", "a@x.com", Some("sender asc"), 0, 10).await;
    assert!(matches!(result, Err(ChatError::Validation(_))));
}

#[tokio::test]
async fn test_mark_as_read_runs_in_background() {
    let app = test_app(&[]).await;
    seed_rooms(
        &app.store,
        &[room("ab", RoomType::Direct, "a@x.com, b@x.com", at(1, 9))],
    )
    .await;

    chat::mark_as_read(&app.state, &Ctx::new("b@x.com"), "ab").unwrap();

    let mut marked = false;
    for _ in 0..100 {
        let stored = app.store.get_room("ab").await.unwrap().unwrap();
        if stored.is_read_by("b@x.com") {
            assert_eq!(stored.modified, at(1, 9));
            marked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(marked, "read marker was never written");

    let guest = chat::mark_as_read(&app.state, &Ctx::new("Guest"), "ab");
    assert!(matches!(guest, Err(ChatError::Unauthorized)));
}

#[tokio::test]
async fn test_typing_relay_reaches_all_members() {
    let app = test_app(&[]).await;
    seed_rooms(
        &app.store,
        &[room("grp", RoomType::Group, "a@x.com,b@x.com,c@x.com", at(1, 9))],
    )
    .await;
    let mut rx_b = app.state.hub.subscribe("b@x.com").await;
    let mut rx_c = app.state.hub.subscribe("c@x.com").await;

    let delivered = chat::set_typing(
        &app.state,
        "grp",
        TypingInput {
            user: "Ann".into(),
            is_typing: true,
            is_guest: false,
        },
    )
    .await
    .unwrap();
    assert_eq!(delivered, 3);

    for rx in [&mut rx_b, &mut rx_c] {
        let event = rx.try_recv().unwrap();
        assert_eq!(event.event, "grp:typing");
        assert_eq!(event.message["user"], "Ann");
        assert_eq!(event.message["is_typing"], "true");
    }

    let missing = chat::set_typing(
        &app.state,
        "nope",
        TypingInput {
            user: "Ann".into(),
            is_typing: true,
            is_guest: false,
        },
    )
    .await;
    assert!(matches!(missing, Err(ChatError::NotFound(_))));
}
