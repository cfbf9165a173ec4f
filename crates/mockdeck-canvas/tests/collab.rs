//! Multi-participant collaboration scenarios.
//!
//! Two engines share one in-process channel and one store, mirroring two
//! editors with the same document open.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use mockdeck_canvas::{
    CanvasEvent, ChannelMessage, DocumentStore, EventChannel, LocalEventChannel, Participant,
    Screen, Shape, ShapeKind, ShapeUpdate, SqliteDocumentStore, SyncEngine, DEFAULT_SCREEN_ID,
};

async fn memory_store() -> Arc<SqliteDocumentStore> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = SqliteDocumentStore::new(pool);
    store.init().await.unwrap();
    Arc::new(store)
}

async fn open_pair(
    channel: &LocalEventChannel,
    store: Arc<SqliteDocumentStore>,
    document_id: Uuid,
) -> (SyncEngine, SyncEngine) {
    let mut alice = SyncEngine::open(
        Arc::new(channel.clone()),
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        document_id,
        Participant::new("alice"),
    )
    .await
    .unwrap();
    let bob = SyncEngine::open(
        Arc::new(channel.clone()),
        store,
        document_id,
        Participant::new("bob"),
    )
    .await
    .unwrap();
    // Alice sees Bob's join; Bob subscribed after Alice's.
    alice.drain_remote();
    (alice, bob)
}

fn rect(id: &str) -> Shape {
    Shape::new(id, ShapeKind::Rectangle, 50.0, 50.0)
        .with_size(120.0, 100.0)
        .with_fill("#60a5fa")
}

#[tokio::test]
async fn shape_added_by_one_participant_appears_for_the_other() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();
    let (mut alice, mut bob) = open_pair(&channel, store, document_id).await;

    alice.add_shape(DEFAULT_SCREEN_ID, rect("s1"));
    assert_eq!(bob.drain_remote(), 1);

    let shape = bob.document().shape(DEFAULT_SCREEN_ID, "s1").unwrap();
    assert_eq!((shape.x, shape.y), (50.0, 50.0));

    // Alice does not hear her own edit back.
    assert_eq!(alice.drain_remote(), 0);
}

#[tokio::test]
async fn partial_update_converges_to_full_shape() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();
    let (mut alice, mut bob) = open_pair(&channel, store, document_id).await;

    alice.add_shape(DEFAULT_SCREEN_ID, rect("s1").with_text("Box"));
    bob.drain_remote();

    // Bob changes just the fill; the broadcast carries the whole shape.
    bob.update_shape(
        DEFAULT_SCREEN_ID,
        "s1",
        &ShapeUpdate {
            fill: Some("#ef4444".to_string()),
            ..ShapeUpdate::default()
        },
    );
    alice.drain_remote();

    let alice_shape = alice.document().shape(DEFAULT_SCREEN_ID, "s1").unwrap();
    let bob_shape = bob.document().shape(DEFAULT_SCREEN_ID, "s1").unwrap();
    assert_eq!(alice_shape, bob_shape);
    assert_eq!(alice_shape.fill, "#ef4444");
    assert_eq!(alice_shape.text.as_deref(), Some("Box"));
}

#[tokio::test]
async fn concurrent_delete_beats_update() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();
    let (mut alice, mut bob) = open_pair(&channel, store, document_id).await;

    alice.add_shape(DEFAULT_SCREEN_ID, rect("s1"));
    bob.drain_remote();

    // Alice deletes while Bob updates the same shape.
    alice.delete_shape(DEFAULT_SCREEN_ID, "s1");
    bob.update_shape(DEFAULT_SCREEN_ID, "s1", &ShapeUpdate::position(9.0, 9.0));

    // Alice receives the update after her delete; it targets a missing
    // shape and is dropped. Bob receives the delete and applies it.
    alice.drain_remote();
    bob.drain_remote();

    assert!(alice.document().shape(DEFAULT_SCREEN_ID, "s1").is_none());
    assert!(bob.document().shape(DEFAULT_SCREEN_ID, "s1").is_none());
}

#[tokio::test]
async fn drag_stream_is_throttled_but_final_update_is_not() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();
    let (mut alice, mut bob) = open_pair(&channel, store, document_id).await;

    alice.add_shape(DEFAULT_SCREEN_ID, rect("s1"));
    bob.drain_remote();

    // A burst of drag moves. The throttle forwards at most a handful.
    for i in 0..20 {
        alice.drag_shape(DEFAULT_SCREEN_ID, "s1", f64::from(i) * 10.0, 50.0);
    }
    // Drag end commits the final position as a durable update.
    alice.update_shape(DEFAULT_SCREEN_ID, "s1", &ShapeUpdate::position(190.0, 50.0));

    // Give the throttle task a moment to flush its trailing emission.
    tokio::time::sleep(Duration::from_millis(80)).await;

    let applied = bob.drain_remote();
    assert!(applied >= 1);
    assert!(applied <= 4, "drag burst leaked {applied} events");

    let shape = bob.document().shape(DEFAULT_SCREEN_ID, "s1").unwrap();
    assert_eq!((shape.x, shape.y), (190.0, 50.0));
}

#[tokio::test]
async fn screen_lifecycle_propagates_and_fixes_remote_cursor() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();
    let (mut alice, mut bob) = open_pair(&channel, store, document_id).await;

    alice.add_screen(Screen::new("settings", "Settings"));
    bob.drain_remote();
    bob.set_current_screen("settings");

    alice.rename_screen("settings", "Preferences");
    bob.drain_remote();
    assert_eq!(bob.document().screen("settings").unwrap().name, "Preferences");

    // Alice deletes the screen Bob is looking at; Bob's cursor snaps
    // back to a surviving screen.
    alice.delete_screen("settings");
    bob.drain_remote();
    assert!(bob.document().screen("settings").is_none());
    assert_eq!(
        bob.document().current_screen_id.as_deref(),
        Some(DEFAULT_SCREEN_ID)
    );
}

#[tokio::test]
async fn undo_is_local_and_diverges_until_next_edit() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();
    let (mut alice, mut bob) = open_pair(&channel, store, document_id).await;

    alice.add_shape(DEFAULT_SCREEN_ID, rect("s1"));
    bob.drain_remote();

    assert!(alice.undo());
    assert_eq!(bob.drain_remote(), 0, "undo must not broadcast");

    // Views diverge: Bob still has the shape.
    assert!(alice.document().shape(DEFAULT_SCREEN_ID, "s1").is_none());
    assert!(bob.document().shape(DEFAULT_SCREEN_ID, "s1").is_some());
}

#[tokio::test]
async fn redelivered_add_does_not_duplicate() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();
    let (_alice, mut bob) = open_pair(&channel, store, document_id).await;

    let sender = Uuid::new_v4();
    let add = ChannelMessage::new(
        document_id,
        sender,
        CanvasEvent::ShapeAdded {
            screen_id: DEFAULT_SCREEN_ID.to_string(),
            shape: rect("s1"),
        },
    );
    channel.publish(add.clone()).unwrap();
    channel.publish(add).unwrap();
    bob.drain_remote();

    let screen = bob.document().screen(DEFAULT_SCREEN_ID).unwrap();
    assert_eq!(screen.shapes.len(), 1);
}

#[tokio::test]
async fn save_and_reload_round_trips_through_the_store() {
    let channel = LocalEventChannel::default();
    let store = memory_store().await;
    let document_id = Uuid::new_v4();

    {
        let mut editor = SyncEngine::open(
            Arc::new(channel.clone()),
            Arc::clone(&store) as Arc<dyn DocumentStore>,
            document_id,
            Participant::new("alice"),
        )
        .await
        .unwrap();
        editor.add_screen(Screen::new("settings", "Settings"));
        editor.add_shape("settings", rect("s1").with_target(DEFAULT_SCREEN_ID));
        editor.save().await.unwrap();
        editor.close();
    }

    let later = SyncEngine::open(
        Arc::new(channel.clone()),
        store,
        document_id,
        Participant::new("alice"),
    )
    .await
    .unwrap();

    assert_eq!(later.document().screens.len(), 2);
    let shape = later.document().shape("settings", "s1").unwrap();
    assert_eq!(shape.target_screen_id.as_deref(), Some(DEFAULT_SCREEN_ID));
}
