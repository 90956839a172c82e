use glam::Vec2;
use std::sync::Arc;
use std::time::Duration;
use studio_canvas::{DocumentMeta, Editor, Node, WorkflowDocument};
use studio_client::{AutoSaver, ClientConfig, InMemoryWorkflowStore, WorkflowStore, fork};
use tokio::time::sleep;

fn document(editor: &Editor, name: &str) -> WorkflowDocument {
    editor.document(&DocumentMeta::new(name))
}

fn editor_with_nodes(count: usize) -> Editor {
    let mut editor = Editor::default();
    for i in 0..count {
        editor
            .add_node(Node::new("noop", Vec2::new(i as f32 * 200.0, 0.0)))
            .unwrap();
    }
    editor
}

#[tokio::test(start_paused = true)]
async fn test_edits_inside_window_coalesce() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let saver = AutoSaver::spawn(store.clone(), &ClientConfig::default(), None);

    // 1. Two edits 500ms apart
    saver.notify(document(&editor_with_nodes(1), "draft"));
    sleep(Duration::from_millis(500)).await;
    saver.notify(document(&editor_with_nodes(2), "draft"));
    assert!(saver.status().dirty);

    // 2. The window restarted with the second edit
    sleep(Duration::from_millis(999)).await;
    assert_eq!(store.create_count(), 0);

    // 3. One create carrying the latest document
    sleep(Duration::from_millis(2)).await;
    assert_eq!(store.create_count(), 1);

    let status = saver.status();
    assert!(!status.dirty);
    assert_eq!(status.saves_completed, 1);
    let id = status.workflow_id.unwrap();
    assert_eq!(store.document(&id).await.unwrap().nodes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_first_save_creates_then_updates() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let saver = AutoSaver::spawn(store.clone(), &ClientConfig::default(), None);

    saver.notify(document(&editor_with_nodes(1), "flow"));
    sleep(Duration::from_millis(1100)).await;
    saver.notify(document(&editor_with_nodes(3), "flow"));
    sleep(Duration::from_millis(1100)).await;

    assert_eq!(store.create_count(), 1);
    assert_eq!(store.update_count(), 1);

    let id = saver.status().workflow_id.unwrap();
    let stored = store.document(&id).await.unwrap();
    assert_eq!(stored.nodes.len(), 3);
    assert_eq!(stored.id.as_deref(), Some(id.as_str()));
}

#[tokio::test(start_paused = true)]
async fn test_known_id_goes_straight_to_update() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let id = store.create(&document(&Editor::default(), "existing")).await.unwrap();

    let saver = AutoSaver::spawn(store.clone(), &ClientConfig::default(), Some(id.clone()));
    saver.notify(document(&editor_with_nodes(1), "existing"));
    sleep(Duration::from_millis(1100)).await;

    assert_eq!(store.create_count(), 1, "only the setup create");
    assert_eq!(store.update_count(), 1);
    assert_eq!(saver.status().workflow_id, Some(id));
}

#[tokio::test(start_paused = true)]
async fn test_failed_save_keeps_dirty_flag() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    store.set_failing(true);
    let saver = AutoSaver::spawn(store.clone(), &ClientConfig::default(), None);

    // 1. The save fails and nothing is retried on its own
    saver.notify(document(&editor_with_nodes(1), "flaky"));
    sleep(Duration::from_millis(5000)).await;

    let status = saver.status();
    assert!(status.dirty);
    assert!(status.last_error.is_some());
    assert_eq!(status.workflow_id, None);
    assert_eq!(status.saves_completed, 0);

    // 2. Once the store recovers an explicit flush saves the pending document
    store.set_failing(false);
    saver.flush().await;

    let status = saver.status();
    assert!(!status.dirty);
    assert_eq!(status.last_error, None);
    assert_eq!(store.create_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_next_edit_retries_failed_save() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    store.set_failing(true);
    let saver = AutoSaver::spawn(store.clone(), &ClientConfig::default(), None);

    // 1. First save fails
    saver.notify(document(&editor_with_nodes(1), "flaky"));
    sleep(Duration::from_millis(1500)).await;
    assert!(saver.status().dirty);
    assert_eq!(store.create_count(), 0);

    // 2. The store recovers and the next edit goes through after its window
    store.set_failing(false);
    saver.notify(document(&editor_with_nodes(2), "flaky"));
    sleep(Duration::from_millis(1500)).await;

    let status = saver.status();
    assert!(!status.dirty);
    assert_eq!(status.last_error, None);
    assert_eq!(store.create_count(), 1);
    let id = status.workflow_id.unwrap();
    assert_eq!(store.document(&id).await.unwrap().nodes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_custom_debounce_window() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let config = ClientConfig::default().with_autosave_debounce(Duration::from_millis(200));
    let saver = AutoSaver::spawn(store.clone(), &config, None);

    saver.notify(document(&editor_with_nodes(1), "quick"));
    sleep(Duration::from_millis(250)).await;

    assert_eq!(store.create_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_pending_edit() {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let saver = AutoSaver::spawn(store.clone(), &ClientConfig::default(), None);
    let mut status_rx = saver.subscribe();

    saver.notify(document(&editor_with_nodes(1), "closing"));
    status_rx.changed().await.unwrap();
    assert!(status_rx.borrow().dirty);

    saver.shutdown().await;
    assert_eq!(store.create_count(), 1);
}

#[tokio::test]
async fn test_fork_copies_under_new_id() {
    let store = InMemoryWorkflowStore::new();
    let id = store
        .create(&document(&editor_with_nodes(2), "Pipeline"))
        .await
        .unwrap();

    let copy = fork(&store, &id, None).await.unwrap();
    assert_eq!(copy.name, "Copy of Pipeline");
    assert_ne!(copy.id.as_deref(), Some(id.as_str()));
    assert_eq!(copy.nodes.len(), 2);

    let named = fork(&store, &id, Some("Variant")).await.unwrap();
    assert_eq!(named.name, "Variant");
    assert_eq!(store.list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_fork_of_missing_workflow_fails() {
    let store = InMemoryWorkflowStore::new();
    let err = fork(&store, "nope", None).await.unwrap_err();
    assert!(err.is_not_found());
}
