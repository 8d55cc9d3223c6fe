use cartesia_core::api::MemoryBackend;
use cartesia_core::api::memory::{BackendCall, CallKind};
use cartesia_core::domain::{MetaPatch, RoadmapId, RoadmapMeta, Visibility};
use cartesia_core::store::DraftStore;
use cartesia_core::{
    DiagramGateway, EditMode, EditorSession, GatewayError, MemoryDraftStore, SaveOutcome, SaveStatus,
    SavedTo, SessionError, SessionTarget,
};
use glam::Vec2;
use roadmap_canvas::model::{NodeKind, RoadmapDiagram};
use roadmap_canvas::{Gesture, persistence};
use std::sync::Arc;
use std::time::Duration;

fn seeded(backend: &MemoryBackend) -> RoadmapId {
    let mut diagram = RoadmapDiagram::new();
    let a = diagram.create_node(NodeKind::Topic, Vec2::new(0.0, 0.0));
    let b = diagram.create_node(NodeKind::Subtopic, Vec2::new(0.0, 150.0));
    diagram.connect(&a, &b).unwrap();
    backend.insert_roadmap(
        RoadmapMeta::new("Someone else's path"),
        persistence::serialize(&diagram).unwrap(),
    )
}

async fn open(backend: &MemoryBackend, id: &RoadmapId) -> EditorSession {
    let gateway = DiagramGateway::new(Arc::new(backend.clone()));
    EditorSession::open_remote(gateway, Arc::new(MemoryDraftStore::new()), id.clone()).await
}

fn stored(backend: &MemoryBackend, id: &RoadmapId) -> RoadmapDiagram {
    persistence::parse(&backend.diagram_json(id).unwrap()).unwrap()
}

#[tokio::test]
async fn test_forbidden_save_forks_with_current_meta() {
    let backend = MemoryBackend::new();
    let original = seeded(&backend);
    backend.set_read_only(&original, true);

    let session = open(&backend, &original).await;
    assert_eq!(session.edit_mode(), EditMode::ReadOnly);

    // The backend refuses the update, but the new title is kept in memory.
    let patch = MetaPatch {
        title: Some("My copy".into()),
        visibility: Some(Visibility::Public),
        ..Default::default()
    };
    assert!(matches!(
        session.update_meta(patch).await,
        Err(SessionError::Gateway(GatewayError::Forbidden))
    ));
    backend.clear_calls();

    let saved = session.save().await.unwrap();
    let SavedTo::Roadmap(SaveOutcome::Forked { previous, current }) = saved else {
        panic!("expected a fork");
    };
    assert_eq!(previous, original);
    assert_ne!(current, original);

    let creates: Vec<RoadmapMeta> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::CreateRoadmap(meta) => Some(meta),
            _ => None,
        })
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].title, "My copy");
    assert_eq!(creates[0].visibility, Visibility::Public);
    assert_eq!(creates[0].description, "");

    let stores_to_new = backend
        .calls()
        .iter()
        .filter(|call| matches!(call, BackendCall::StoreDiagram { id, .. } if *id == current))
        .count();
    assert_eq!(stores_to_new, 1);

    assert_eq!(session.roadmap_id(), Some(current.clone()));
    assert_eq!(session.target(), SessionTarget::Remote(current.clone()));
    assert_eq!(stored(&backend, &current), session.diagram());
    assert!(matches!(session.save_status(), SaveStatus::Forked { .. }));
    assert!(!session.is_dirty());

    // The fork belongs to the current user, so the session becomes editable on it.
    assert_eq!(session.edit_mode(), EditMode::Editable);
    assert_eq!(backend.count(CallKind::Unlock), 0);
}

#[tokio::test]
async fn test_fork_releases_lock_on_previous_roadmap() {
    let backend = MemoryBackend::new();
    let original = seeded(&backend);
    let session = open(&backend, &original).await;
    assert_eq!(session.edit_mode(), EditMode::Editable);

    backend.fail_next(CallKind::StoreDiagram, || GatewayError::Forbidden);
    let saved = session.save().await.unwrap();
    let SavedTo::Roadmap(outcome) = saved else {
        panic!("remote session saved to a draft");
    };

    let unlocks: Vec<BackendCall> = backend
        .calls()
        .into_iter()
        .filter(|call| call.kind() == CallKind::Unlock)
        .collect();
    assert_eq!(unlocks, vec![BackendCall::Unlock(original.clone())]);
    assert!(backend.calls().contains(&BackendCall::Lock(outcome.id().clone())));
    assert_eq!(session.roadmap_id().as_ref(), Some(outcome.id()));
}

#[tokio::test]
async fn test_other_failures_do_not_fork() {
    let backend = MemoryBackend::new();
    let original = seeded(&backend);
    let session = open(&backend, &original).await;
    session
        .apply(Gesture::Create {
            kind: NodeKind::Paragraph,
            position: Vec2::new(300.0, 40.0),
        })
        .unwrap();

    backend.fail_next(CallKind::StoreDiagram, || GatewayError::Conflict);
    assert!(matches!(
        session.save().await,
        Err(SessionError::Gateway(GatewayError::Conflict))
    ));
    assert_eq!(backend.count(CallKind::CreateRoadmap), 0);
    assert_eq!(session.roadmap_id(), Some(original.clone()));
    assert!(matches!(session.save_status(), SaveStatus::Failed(_)));
    assert!(session.is_dirty());

    let saved = session.save().await.unwrap();
    assert_eq!(saved, SavedTo::Roadmap(SaveOutcome::Saved { id: original.clone() }));
    assert_eq!(stored(&backend, &original).node_count(), 3);
    assert!(!session.is_dirty());
}

#[tokio::test]
async fn test_second_save_while_in_flight_is_rejected() {
    let backend = MemoryBackend::new();
    let id = seeded(&backend);
    let session = open(&backend, &id).await;
    backend.set_store_delay(Some(Duration::from_millis(100)));

    let (first, (saving, second)) = tokio::join!(session.save(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        (session.is_saving(), session.save().await)
    });

    assert!(saving);
    assert!(first.is_ok());
    assert!(matches!(second, Err(SessionError::SaveInFlight)));
    assert!(!session.is_saving());
    assert_eq!(backend.count(CallKind::StoreDiagram), 1);
}

#[tokio::test]
async fn test_local_draft_save_and_publish() {
    let backend = MemoryBackend::new();
    let drafts = Arc::new(MemoryDraftStore::new());
    let gateway = DiagramGateway::new(Arc::new(backend.clone()));
    let session = EditorSession::open_local(gateway, drafts.clone());

    assert_eq!(session.target(), SessionTarget::Local);
    assert_eq!(session.edit_mode(), EditMode::Editable);
    session
        .apply(Gesture::Create {
            kind: NodeKind::Title,
            position: Vec2::new(200.0, 0.0),
        })
        .unwrap();
    session
        .update_meta(MetaPatch {
            title: Some("Draft path".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(session.save().await.unwrap(), SavedTo::Draft);
    let draft = drafts.load().unwrap().expect("draft saved");
    assert_eq!(draft.meta.title, "Draft path");
    assert_eq!(draft.diagram, session.diagram());
    assert!(backend.calls().is_empty());
    assert!(matches!(session.list_versions().await, Err(SessionError::NotRemote)));

    let id = session.publish().await.unwrap();
    assert_eq!(session.roadmap_id(), Some(id.clone()));
    assert_eq!(backend.record(&id).unwrap().title, "Draft path");
    assert_eq!(stored(&backend, &id), session.diagram());
    assert_eq!(session.edit_mode(), EditMode::Editable);
    assert!(drafts.load().unwrap().is_none());
    assert_eq!(session.list_versions().await.unwrap().len(), 1);

    assert!(matches!(session.publish().await, Err(SessionError::AlreadyPublished)));
}

#[tokio::test]
async fn test_reopened_draft_keeps_content() {
    let gateway = DiagramGateway::new(Arc::new(MemoryBackend::new()));
    let drafts = Arc::new(MemoryDraftStore::new());

    let first = EditorSession::open_local(gateway.clone(), drafts.clone());
    first
        .apply(Gesture::Create {
            kind: NodeKind::Label,
            position: Vec2::new(10.0, 10.0),
        })
        .unwrap();
    first.save().await.unwrap();
    let expected = first.diagram();
    drop(first);

    let second = EditorSession::open_local(gateway, drafts);
    assert_eq!(second.diagram(), expected);
}
