//! Decision engine integration tests

use std::sync::Arc;

use autoresponder_gateway::{
    Action, Conversation, ConversationStore, InboundMessage, ResponderConfig, ResponseEngine,
    SpamGuard,
};

mod common;
use common::{OWNER, RecordingSender, engine, responder};

const CONTACT: &str = "5511911112222";

fn user(t: i64) -> InboundMessage {
    InboundMessage::text(CONTACT, CONTACT, "oi", t)
}

#[test]
fn test_reply_then_already_responded() {
    let engine = engine();

    let first = engine.decide(&user(0));
    assert_eq!(first.action, Action::Reply);
    let effect = first.effect.unwrap();
    assert_eq!(effect.recipient_id, CONTACT);
    assert_eq!(effect.body, ResponderConfig::default().auto_response_message);

    let second = engine.decide(&user(5_000));
    assert_eq!(second.action, Action::SuppressAlreadyResponded);
    assert!(second.effect.is_none());
}

#[test]
fn test_fourth_message_in_window_is_spam() {
    let engine = engine();

    assert_eq!(engine.decide(&user(0)).action, Action::Reply);
    assert_eq!(engine.decide(&user(10)).action, Action::SuppressAlreadyResponded);
    assert_eq!(engine.decide(&user(20)).action, Action::SuppressAlreadyResponded);
    assert_eq!(engine.decide(&user(30)).action, Action::SuppressSpam);
}

#[test]
fn test_window_resets_after_it_elapses() {
    let engine = engine();

    for t in [0, 10, 20, 30] {
        engine.decide(&user(t));
    }
    assert_eq!(engine.rate_window(CONTACT).unwrap().count, 4);

    let decision = engine.decide(&user(61_000));
    assert_eq!(decision.action, Action::SuppressAlreadyResponded);

    let window = engine.rate_window(CONTACT).unwrap();
    assert_eq!(window.count, 1);
    assert_eq!(window.window_started_at, 61_000);
}

#[test]
fn test_owner_activity_suppresses_until_reactivation() {
    let engine = engine();

    let owner = InboundMessage::text(CONTACT, OWNER, "já respondo", 0);
    let owner = InboundMessage {
        sender_is_owner: true,
        ..owner
    };
    assert_eq!(engine.decide(&owner).action, Action::IgnoreOwner);

    assert_eq!(engine.decide(&user(1_000)).action, Action::SuppressOwnerActive);

    let decision = engine.decide(&user(1_800_001));
    assert_eq!(decision.action, Action::Reply);
    let conversation = engine.conversation(CONTACT).unwrap();
    assert!(conversation.responded);
    assert!(conversation.last_owner_activity_at.is_none());
}

#[test]
fn test_owner_activity_after_reply_reopens_conversation() {
    let engine = engine();

    assert_eq!(engine.decide(&user(0)).action, Action::Reply);
    engine.record_owner_activity(CONTACT, 100);

    assert_eq!(engine.decide(&user(200)).action, Action::SuppressOwnerActive);
    // Once the owner goes quiet the contact gets a fresh reply
    assert_eq!(engine.decide(&user(100 + 1_800_000)).action, Action::Reply);
}

#[test]
fn test_clear_all_is_idempotent() {
    let engine = engine();
    engine.decide(&user(0));
    engine.decide(&InboundMessage::text("5511933334444", "5511933334444", "oi", 0));
    assert_eq!(engine.status_snapshot().tracked_conversations, 2);

    engine.clear_all_conversation_state();
    engine.clear_all_conversation_state();

    assert_eq!(engine.status_snapshot().tracked_conversations, 0);
    assert_eq!(engine.decide(&user(10)).action, Action::Reply);
}

#[test]
fn test_self_message_touches_no_state() {
    let engine = engine();
    let message = InboundMessage {
        sender_is_self: true,
        ..user(0)
    };

    assert_eq!(engine.decide(&message).action, Action::IgnoreSelf);
    assert!(engine.rate_window(CONTACT).is_none());
    assert!(engine.conversation(CONTACT).is_none());
}

#[test]
fn test_toggle_round_trip() {
    let engine = engine();

    assert!(!engine.toggle_active());
    assert_eq!(engine.decide(&user(0)).action, Action::SuppressInactive);
    assert!(engine.toggle_active());
    assert_eq!(engine.decide(&user(10)).action, Action::Reply);
}

#[test]
fn test_injected_stores_are_used() {
    let conversations = ConversationStore::new();
    conversations.set(CONTACT, Conversation::replied());

    let spam = SpamGuard::new();
    for t in 0..3 {
        spam.is_spam("5511944445555", t, 3, 60_000);
    }

    let engine =
        ResponseEngine::with_stores(ResponderConfig::default(), conversations, spam).unwrap();

    assert_eq!(engine.status_snapshot().tracked_conversations, 1);
    assert_eq!(engine.decide(&user(10)).action, Action::SuppressAlreadyResponded);

    let flooded = InboundMessage::text("5511944445555", "5511944445555", "oi", 10);
    assert_eq!(engine.decide(&flooded).action, Action::SuppressSpam);
}

#[test]
fn test_invalid_settings_are_rejected() {
    let settings = ResponderConfig {
        reactivation_time_ms: 0,
        ..ResponderConfig::default()
    };
    assert!(ResponseEngine::new(settings).is_err());
}

#[test]
fn test_parallel_decisions_reply_once() {
    const THREADS: usize = 16;
    let engine = engine();

    // Generous limit so spam control stays out of the way
    engine
        .reconfigure(&autoresponder_gateway::ResponderUpdate {
            spam_limit: Some(1_000),
            ..Default::default()
        })
        .unwrap();

    let actions: Vec<Action> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let engine = Arc::clone(&engine);
                scope.spawn(move || engine.decide(&user(0)).action)
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let replies = actions.iter().filter(|a| **a == Action::Reply).count();
    let suppressed = actions
        .iter()
        .filter(|a| **a == Action::SuppressAlreadyResponded)
        .count();

    assert_eq!(replies, 1);
    assert_eq!(suppressed, THREADS - 1);
}

#[tokio::test]
async fn test_responder_sends_single_reply() {
    let sender = Arc::new(RecordingSender::default());
    let responder = responder(Arc::clone(&sender));

    assert_eq!(responder.handle(&user(0)).await.unwrap(), Action::Reply);
    assert_eq!(
        responder.handle(&user(10)).await.unwrap(),
        Action::SuppressAlreadyResponded
    );

    let sent = sender.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, CONTACT);
}

#[tokio::test]
async fn test_responder_delivery_failure_is_not_retried() {
    let sender = Arc::new(RecordingSender::failing());
    let responder = responder(Arc::clone(&sender));

    assert!(responder.handle(&user(0)).await.is_err());
    assert_eq!(
        responder.handle(&user(10)).await.unwrap(),
        Action::SuppressAlreadyResponded
    );
    assert!(sender.sent().is_empty());
}
