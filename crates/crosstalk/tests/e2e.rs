// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: inbound event through classification, policy, response
//! selection, outbound dispatch, and delivery reconciliation, against a real
//! (temp) database and a mock transport.

use std::sync::Arc;
use std::time::Duration;

use crosstalk_core::types::{
    ChannelKind, DeliveryState, HandoffRule, IntentResponse, KnowledgeBase, KnowledgeEntry,
    MessageStatus,
};
use crosstalk_core::{CrosstalkError, TrainableClassifier};
use crosstalk_engine::{
    ChannelRegistry, ConversationEngine, DeliveryTracker, Dispatcher, InboundOutcome,
    ResponseTexts,
};
use crosstalk_intent::PhraseClassifier;
use crosstalk_policy::HandoffPolicy;
use crosstalk_storage::Database;
use crosstalk_storage::queries::{conversations, intents, messages, rules};
use crosstalk_test_utils::{MockTransport, seed_channel, seed_intent, temp_database};

struct World {
    db: Arc<Database>,
    transport: Arc<MockTransport>,
    dispatcher: Arc<Dispatcher>,
    tracker: DeliveryTracker,
    engine: ConversationEngine,
    classifier: Arc<PhraseClassifier>,
    _dir: tempfile::TempDir,
}

/// Stand up a webchat channel, a trained classifier, and the full engine.
async fn world() -> World {
    let (db, dir) = temp_database().await;
    seed_channel(&db, "ch-web", ChannelKind::Webchat).await;

    seed_intent(&db, "in-hours", "hours", &["what are your hours", "when are you open"]).await;
    seed_intent(&db, "in-reset", "password_reset", &["reset password", "forgot my password"])
        .await;

    let classifier = Arc::new(PhraseClassifier::new(0.3));
    classifier.retrain(&intents::list_intents(&db).await.unwrap());

    let transport = Arc::new(MockTransport::with_kind(ChannelKind::Webchat));
    let mut registry = ChannelRegistry::new();
    registry.register("ch-web", transport.clone());
    let registry = Arc::new(registry);

    let dispatcher = Arc::new(Dispatcher::new(
        db.clone(),
        registry.clone(),
        Duration::from_secs(2),
    ));
    let tracker = DeliveryTracker::new(db.clone(), registry, 50);

    let engine = ConversationEngine::new(
        db.clone(),
        classifier.clone(),
        HandoffPolicy::new(0.4),
        ResponseTexts {
            handoff_notice: "I'll connect you with a human agent who can better assist you."
                .to_string(),
            generic_fallback: "I'm not sure I understand. Could you rephrase that?".to_string(),
        },
        dispatcher.clone(),
    );

    World {
        db,
        transport,
        dispatcher,
        tracker,
        engine,
        classifier,
        _dir: dir,
    }
}

async fn drain_dispatch(dispatcher: &Dispatcher) {
    while dispatcher.process_next().await.unwrap() {}
}

#[tokio::test]
async fn unknown_input_gets_fallback_and_handoff() {
    let w = world().await;

    let outcome = w
        .engine
        .handle_inbound("ch-web", "sess-1", "hello", &[])
        .await
        .unwrap();

    let InboundOutcome::Turn { outcome, .. } = outcome else {
        panic!("expected a turn outcome");
    };
    // "hello" matches nothing: confidence 0 is under the 0.4 floor.
    assert!(outcome.needs_handoff);
    assert!(outcome.intent.is_none());
    assert_eq!(outcome.confidence, 0.0);
    assert!(outcome.response.contains("human agent"));

    w.db.close().await.unwrap();
}

#[tokio::test]
async fn matched_intent_answers_from_knowledge_base() {
    let w = world().await;

    intents::insert_knowledge_base(
        &w.db,
        &KnowledgeBase {
            id: "kb-faq".into(),
            name: "faq".into(),
            description: String::new(),
            entries: vec![
                KnowledgeEntry { key: "hours".into(), value: "9-5".into() },
                KnowledgeEntry { key: "address".into(), value: "1 Main St".into() },
            ],
        },
    )
    .await
    .unwrap();
    intents::insert_response(
        &w.db,
        &IntentResponse {
            id: "r-hours".into(),
            intent_id: "in-hours".into(),
            text: "Our opening hours are on the website.".into(),
            knowledge_base_id: Some("kb-faq".into()),
        },
    )
    .await
    .unwrap();

    let outcome = w
        .engine
        .handle_inbound("ch-web", "sess-1", "what are your hours", &[])
        .await
        .unwrap();

    let InboundOutcome::Turn { outcome, .. } = outcome else {
        panic!("expected a turn outcome");
    };
    assert!(!outcome.needs_handoff);
    assert_eq!(outcome.intent.as_deref(), Some("hours"));
    assert_eq!(outcome.response, "9-5", "knowledge entry must beat the canned text");

    w.db.close().await.unwrap();
}

#[tokio::test]
async fn response_flows_to_transport_and_reconciles_to_read() {
    let w = world().await;

    let outcome = w
        .engine
        .handle_inbound("ch-web", "sess-1", "what are your hours", &[])
        .await
        .unwrap();
    let InboundOutcome::Turn { outbound_message_id, .. } = outcome else {
        panic!("expected a turn outcome");
    };

    // The turn committed with the message still pending; dispatch is async.
    let pending = messages::get_message(&w.db, &outbound_message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.status, MessageStatus::Pending);

    drain_dispatch(&w.dispatcher).await;
    let sent = messages::get_message(&w.db, &outbound_message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(sent.status, MessageStatus::Sent);
    assert_eq!(w.transport.dispatched_count().await, 1);

    // Provider reports read before delivered was ever recorded.
    w.transport
        .set_status(sent.provider_ref.as_deref().unwrap(), DeliveryState::Read)
        .await;
    w.tracker.reconcile().await.unwrap();

    let read = messages::get_message(&w.db, &outbound_message_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(read.status, MessageStatus::Read);
    assert!(read.delivered_at.is_some(), "delivered_at must be backfilled");
    assert!(read.read_at.is_some());

    w.db.close().await.unwrap();
}

#[tokio::test]
async fn general_rule_hands_off_mid_confidence_matches() {
    let w = world().await;
    rules::insert_handoff_rule(
        &w.db,
        &HandoffRule {
            id: "hr-general".into(),
            intent_id: None,
            confidence_threshold: 0.99,
            is_active: true,
        },
    )
    .await
    .unwrap();

    // A partial match: well above the 0.4 floor, under the 0.99 threshold.
    let outcome = w
        .engine
        .handle_inbound("ch-web", "sess-1", "password", &[])
        .await
        .unwrap();
    let InboundOutcome::Turn { conversation_id, outcome, .. } = outcome else {
        panic!("expected a turn outcome");
    };

    assert_eq!(outcome.intent.as_deref(), Some("password_reset"));
    assert!(outcome.confidence > 0.4 && outcome.confidence < 0.99);
    assert!(outcome.needs_handoff);

    let conversation = conversations::get_conversation(&w.db, &conversation_id)
        .await
        .unwrap()
        .unwrap();
    let meta: serde_json::Value =
        serde_json::from_str(conversation.metadata.as_deref().unwrap()).unwrap();
    assert_eq!(meta["needs_handoff"], true);

    w.db.close().await.unwrap();
}

#[tokio::test]
async fn retrain_changes_live_classification() {
    let w = world().await;

    // Unknown vocabulary today.
    let before = w
        .engine
        .handle_inbound("ch-web", "sess-1", "upgrade my subscription plan", &[])
        .await
        .unwrap();
    let InboundOutcome::Turn { outcome: before, .. } = before else {
        panic!("expected a turn outcome");
    };
    assert!(before.intent.is_none());

    // A new intent lands in storage and the retrain cycle picks it up.
    seed_intent(
        &w.db,
        "in-upgrade",
        "plan_upgrade",
        &["upgrade my subscription plan"],
    )
    .await;
    w.classifier.retrain(&intents::list_intents(&w.db).await.unwrap());

    let after = w
        .engine
        .handle_inbound("ch-web", "sess-1", "upgrade my subscription plan", &[])
        .await
        .unwrap();
    let InboundOutcome::Turn { outcome: after, .. } = after else {
        panic!("expected a turn outcome");
    };
    assert_eq!(after.intent.as_deref(), Some("plan_upgrade"));

    w.db.close().await.unwrap();
}

#[tokio::test]
async fn feedback_round_trip_and_not_found() {
    let w = world().await;
    let outcome = w
        .engine
        .handle_inbound("ch-web", "sess-1", "hello", &[])
        .await
        .unwrap();
    let InboundOutcome::Turn { outcome, .. } = outcome else {
        panic!("expected a turn outcome");
    };

    w.engine.record_feedback(&outcome.interaction_id, 4).await.unwrap();
    w.engine.record_feedback(&outcome.interaction_id, 2).await.unwrap();

    let stored = crosstalk_storage::queries::interactions::get_interaction(
        &w.db,
        &outcome.interaction_id,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(stored.feedback_rating, Some(2));

    let err = w.engine.record_feedback("does-not-exist", 1).await.unwrap_err();
    assert!(matches!(err, CrosstalkError::NotFound { .. }));

    w.db.close().await.unwrap();
}

#[tokio::test]
async fn concurrent_contacts_share_one_conversation_each() {
    let w = world().await;
    let engine = Arc::new(w.engine);

    let mut handles = Vec::new();
    for i in 0..12 {
        let engine = engine.clone();
        // Two distinct contacts interleaved.
        let contact = if i % 2 == 0 { "sess-even" } else { "sess-odd" };
        handles.push(tokio::spawn(async move {
            engine
                .handle_inbound("ch-web", contact, "hello there", &[])
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let count: i64 = w
        .db
        .connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
        })
        .await
        .unwrap();
    assert_eq!(count, 2, "one conversation per contact, no duplicates");

    w.db.close().await.unwrap();
}
