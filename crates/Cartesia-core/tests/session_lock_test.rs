use cartesia_core::api::MemoryBackend;
use cartesia_core::api::memory::CallKind;
use cartesia_core::domain::{RoadmapId, RoadmapMeta};
use cartesia_core::session::LoadOutcome;
use cartesia_core::{
    DiagramGateway, EditMode, EditorSession, GatewayError, LockNotice, MemoryDraftStore, SessionError,
};
use glam::Vec2;
use roadmap_canvas::model::{NodeKind, RoadmapDiagram};
use roadmap_canvas::{Gesture, GestureError, persistence};
use std::sync::Arc;
use std::time::Duration;

fn seeded() -> (MemoryBackend, RoadmapId) {
    let backend = MemoryBackend::new().with_user("42");
    let mut diagram = RoadmapDiagram::new();
    diagram.create_node(NodeKind::Title, Vec2::new(100.0, 0.0));
    let id = backend.insert_roadmap(
        RoadmapMeta::new("Backend path"),
        persistence::serialize(&diagram).unwrap(),
    );
    (backend, id)
}

async fn open(backend: &MemoryBackend, id: &RoadmapId) -> EditorSession {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let gateway = DiagramGateway::new(Arc::new(backend.clone()));
    EditorSession::open_remote(gateway, Arc::new(MemoryDraftStore::new()), id.clone()).await
}

fn create_topic() -> Gesture {
    Gesture::Create {
        kind: NodeKind::Topic,
        position: Vec2::new(40.0, 200.0),
    }
}

/// Waits for a lock release spawned by teardown or drop.
async fn settle() {
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_acquired_lock_allows_edits() {
    let (backend, id) = seeded();
    let session = open(&backend, &id).await;

    assert_eq!(session.load_outcome(), LoadOutcome::Loaded);
    assert_eq!(session.meta().title, "Backend path");
    assert_eq!(session.edit_mode(), EditMode::Editable);
    assert_eq!(session.lock_notice(), LockNotice::None);
    assert!(!session.is_dirty());

    session.apply(create_topic()).unwrap();
    assert_eq!(session.diagram().node_count(), 2);
    assert!(session.is_dirty());
}

#[tokio::test]
async fn test_conflict_leaves_session_read_only() {
    let (backend, id) = seeded();
    backend.set_locked_by_other(&id, true);
    let session = open(&backend, &id).await;

    assert_eq!(session.edit_mode(), EditMode::ReadOnly);
    assert_eq!(session.lock_notice(), LockNotice::LockedByOther);
    assert!(matches!(
        session.apply(create_topic()),
        Err(SessionError::Gesture(GestureError::ReadOnly))
    ));
    assert_eq!(session.diagram().node_count(), 1);
}

#[tokio::test]
async fn test_forbidden_leaves_session_read_only() {
    let (backend, id) = seeded();
    backend.set_read_only(&id, true);
    let session = open(&backend, &id).await;

    assert_eq!(session.edit_mode(), EditMode::ReadOnly);
    assert_eq!(session.lock_notice(), LockNotice::NoPermission);
    assert!(session.apply(create_topic()).is_err());
}

#[tokio::test]
async fn test_failed_lock_is_not_retried() {
    let (backend, id) = seeded();
    backend.fail_next(CallKind::Lock, || GatewayError::Transport("timed out".into()));
    let session = open(&backend, &id).await;

    assert_eq!(session.edit_mode(), EditMode::ReadOnly);
    assert!(matches!(session.lock_notice(), LockNotice::Unavailable(_)));
    settle().await;
    assert_eq!(backend.count(CallKind::Lock), 1);
}

#[tokio::test]
async fn test_reacquire_while_held_keeps_lock() {
    let (backend, id) = seeded();
    let session = open(&backend, &id).await;
    assert_eq!(session.edit_mode(), EditMode::Editable);

    backend.fail_next(CallKind::Lock, || GatewayError::Transport("timed out".into()));
    assert_eq!(session.acquire_lock().await, EditMode::Editable);
    assert_eq!(session.lock_notice(), LockNotice::None);
    assert_eq!(backend.count(CallKind::Lock), 1);

    session.teardown().expect("the lock is still held").await.unwrap();
    assert_eq!(backend.count(CallKind::Unlock), 1);
}

#[tokio::test]
async fn test_overlapping_lock_requests_send_one() {
    let (backend, id) = seeded();
    backend.set_locked_by_other(&id, true);
    let session = open(&backend, &id).await;
    assert_eq!(session.edit_mode(), EditMode::ReadOnly);

    backend.set_locked_by_other(&id, false);
    backend.set_lock_delay(Some(Duration::from_millis(100)));
    let (first, (locking, second)) = tokio::join!(session.acquire_lock(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        (session.is_locking(), session.acquire_lock().await)
    });

    assert!(locking);
    assert_eq!(second, EditMode::ReadOnly);
    assert_eq!(first, EditMode::Editable);
    assert!(!session.is_locking());
    assert_eq!(backend.count(CallKind::Lock), 2);
}

#[tokio::test]
async fn test_teardown_unlocks_exactly_once() {
    let (backend, id) = seeded();
    let session = open(&backend, &id).await;
    assert_eq!(session.edit_mode(), EditMode::Editable);

    let release = session.teardown().expect("a held lock is released");
    release.await.unwrap();
    assert!(session.teardown().is_none());
    drop(session);
    settle().await;

    assert_eq!(backend.count(CallKind::Unlock), 1);
}

#[tokio::test]
async fn test_drop_releases_held_lock() {
    let (backend, id) = seeded();
    let session = open(&backend, &id).await;
    drop(session);
    settle().await;

    assert_eq!(backend.count(CallKind::Unlock), 1);
}

#[tokio::test]
async fn test_teardown_without_lock_does_not_unlock() {
    let (backend, id) = seeded();
    backend.set_locked_by_other(&id, true);
    let session = open(&backend, &id).await;

    assert!(session.teardown().is_none());
    settle().await;
    assert_eq!(backend.count(CallKind::Unlock), 0);
}

#[tokio::test]
async fn test_closed_session_rejects_work() {
    let (backend, id) = seeded();
    let session = open(&backend, &id).await;
    let _ = session.teardown();

    assert!(session.is_closed());
    assert_eq!(session.edit_mode(), EditMode::ReadOnly);
    assert!(matches!(session.apply(create_topic()), Err(SessionError::Closed)));
    assert!(matches!(session.save().await, Err(SessionError::Closed)));
}

#[tokio::test]
async fn test_explicit_release() {
    let (backend, id) = seeded();
    let session = open(&backend, &id).await;

    session.release_lock().await.unwrap();
    assert_eq!(session.edit_mode(), EditMode::ReadOnly);
    assert!(session.apply(create_topic()).is_err());

    assert!(session.teardown().is_none());
    settle().await;
    assert_eq!(backend.count(CallKind::Unlock), 1);
}

#[tokio::test]
async fn test_load_outcomes() {
    let backend = MemoryBackend::new();
    let never_saved = backend.insert_roadmap(RoadmapMeta::new("Empty"), "");
    let corrupt = backend.insert_roadmap(RoadmapMeta::new("Broken"), "{\"nodes\": 3");

    let session = open(&backend, &never_saved).await;
    assert_eq!(session.load_outcome(), LoadOutcome::Empty);
    assert!(session.diagram().is_empty());
    assert_eq!(session.edit_mode(), EditMode::Editable);

    let session = open(&backend, &corrupt).await;
    assert!(matches!(session.load_outcome(), LoadOutcome::Invalid(_)));
    assert!(session.diagram().is_empty());

    let session = open(&backend, &RoadmapId::from("404")).await;
    assert_eq!(session.load_outcome(), LoadOutcome::Empty);
    assert_eq!(session.edit_mode(), EditMode::ReadOnly);
}
