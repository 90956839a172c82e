use glam::Vec2;
use serde_json::json;
use studio_canvas::{
    CanvasObjectKind, DocumentMeta, Editor, Endpoint, Node, Port, WorkflowDocument,
};

fn sample_editor() -> Editor {
    let mut editor = Editor::default();
    let a = editor
        .add_node(Node::new("trigger", Vec2::ZERO).with_output(Port::new("out", "any")))
        .unwrap();
    let b = editor
        .add_node(
            Node::new("http_request", Vec2::new(300.0, 0.0))
                .with_input(Port::new("in", "any"))
                .with_config(json!({ "url": "https://example.com" })),
        )
        .unwrap();
    let source = editor.state().node(&a).unwrap().outputs[0].id.clone();
    let target = editor.state().node(&b).unwrap().inputs[0].id.clone();
    editor
        .connect(Endpoint::new(a, source), Endpoint::new(b, target))
        .unwrap();
    editor.add_text("remember to set the token", Vec2::new(0.0, 200.0));
    editor
}

#[test]
fn test_roundtrip_document() {
    // 1. Serialize the present snapshot
    let editor = sample_editor();
    let mut meta = DocumentMeta::new("Fetch");
    meta.id = Some("wf_1".to_string());
    let json = editor.document(&meta).to_json().unwrap();

    // 2. Load it into a fresh editor
    let mut restored = Editor::default();
    let loaded_meta = restored.load_document(WorkflowDocument::from_json(&json).unwrap());

    assert_eq!(loaded_meta, meta);
    assert_eq!(restored.state().nodes, editor.state().nodes);
    assert_eq!(restored.state().connections, editor.state().connections);
    assert_eq!(restored.state().canvas_objects, editor.state().canvas_objects);
    assert!(!restored.can_undo());
}

#[test]
fn test_document_shape() {
    let editor = sample_editor();
    let value = serde_json::to_value(editor.document(&DocumentMeta::new("Fetch"))).unwrap();

    assert!(value.get("id").is_none(), "unsaved documents carry no id");
    assert_eq!(value["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(value["canvas_objects"][0]["type"], "text");
    assert!(value.get("selected_node_id").is_none());
}

#[test]
fn test_dangling_connections_are_dropped_on_load() {
    let raw = json!({
        "id": "wf_2",
        "name": "Broken",
        "nodes": [
            { "id": "n1", "node_type": "trigger", "name": "Start", "position": [0.0, 0.0],
              "outputs": [{ "id": "p1", "name": "out", "data_type": "any" }] }
        ],
        "connections": [
            { "id": "c1",
              "source": { "node": "n1", "port": "p1" },
              "target": { "node": "missing", "port": "p9" } }
        ]
    });

    let document: WorkflowDocument = serde_json::from_value(raw).unwrap();
    let (meta, state) = document.into_state();

    assert_eq!(meta.id.as_deref(), Some("wf_2"));
    assert_eq!(state.nodes.len(), 1);
    assert!(state.connections.is_empty());
    assert!(state.canvas_objects.is_empty());
}

#[test]
fn test_fork_clears_id() {
    let editor = sample_editor();
    let mut meta = DocumentMeta::new("Fetch");
    meta.id = Some("wf_1".to_string());

    let fork = editor.document(&meta).fork("Copy of Fetch");

    assert_eq!(fork.id, None);
    assert_eq!(fork.name, "Copy of Fetch");
    assert_eq!(fork.nodes.len(), 2);
}

#[test]
fn test_group_objects_deserialize() {
    let raw = r#"{
        "name": "Grouped",
        "canvas_objects": [
            {
                "id": "g1",
                "type": "group",
                "title": "Inputs",
                "position": [0, 0],
                "size": [300, 200]
            }
        ]
    }"#;

    let document = WorkflowDocument::from_json(raw).unwrap();
    let group = &document.canvas_objects[0];
    assert!(matches!(
        &group.kind,
        CanvasObjectKind::Group { title, color: None } if title == "Inputs"
    ));
}

#[test]
fn test_invalid_json_is_reported() {
    assert!(WorkflowDocument::from_json("{ not json").is_err());
}
