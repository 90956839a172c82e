use glam::Vec2;
use serde_json::json;
use studio_canvas::{
    CanvasConfig, CanvasError, Editor, Endpoint, Node, NodeDefinition, NodeFlags, Port,
    PortSchema,
};

fn http_node(position: Vec2) -> Node {
    Node::new("http_request", position)
        .with_input(Port::new("in", "any"))
        .with_output(Port::new("out", "any"))
}

fn out_of(editor: &Editor, id: &studio_canvas::NodeId) -> Endpoint {
    let node = editor.state().node(id).unwrap();
    Endpoint::new(id.clone(), node.outputs[0].id.clone())
}

fn in_of(editor: &Editor, id: &studio_canvas::NodeId) -> Endpoint {
    let node = editor.state().node(id).unwrap();
    Endpoint::new(id.clone(), node.inputs[0].id.clone())
}

#[test]
fn test_add_move_undo_scenario() {
    let mut editor = Editor::default();

    // 1. Add A and move it
    let a = editor.add_node(http_node(Vec2::new(100.0, 100.0))).unwrap();
    editor.move_node(&a, Vec2::new(300.0, 100.0)).unwrap();

    // 2. Add B
    let b = editor.add_node(http_node(Vec2::new(500.0, 100.0))).unwrap();
    assert_eq!(editor.state().nodes.len(), 2);
    assert_eq!(editor.selection().primary(), Some(&b));

    // 3. Undo twice: B disappears, then A returns to its first position
    assert!(editor.undo());
    assert!(editor.state().node(&b).is_none());
    assert!(editor.undo());
    assert_eq!(
        editor.state().node(&a).unwrap().position,
        Vec2::new(100.0, 100.0)
    );
    assert!(editor.selection().primary() != Some(&b));

    // 4. Redo restores the move
    assert!(editor.redo());
    assert_eq!(
        editor.state().node(&a).unwrap().position,
        Vec2::new(300.0, 100.0)
    );
}

#[test]
fn test_delete_node_cascades_in_one_step() {
    let mut editor = Editor::default();
    let a = editor.add_node(http_node(Vec2::ZERO)).unwrap();
    let b = editor.add_node(http_node(Vec2::new(400.0, 0.0))).unwrap();
    let c = editor.add_node(http_node(Vec2::new(800.0, 0.0))).unwrap();
    editor.connect(out_of(&editor, &a), in_of(&editor, &b)).unwrap();
    editor.connect(out_of(&editor, &b), in_of(&editor, &c)).unwrap();
    let len_before = editor.history_len();

    let removed = editor.delete_node(&b).unwrap();

    assert_eq!(removed, 2);
    assert!(editor.state().connections.is_empty());
    assert_eq!(editor.history_len(), len_before + 1);

    // One undo brings back the node and both connections.
    editor.undo();
    assert!(editor.state().node(&b).is_some());
    assert_eq!(editor.state().connections.len(), 2);
}

#[test]
fn test_connect_rejects_invalid_pairs() {
    let mut editor = Editor::default();
    let a = editor.add_node(http_node(Vec2::ZERO)).unwrap();
    let b = editor.add_node(http_node(Vec2::new(400.0, 0.0))).unwrap();

    assert_eq!(
        editor.connect(out_of(&editor, &a), in_of(&editor, &a)),
        Err(CanvasError::SelfConnection(a.clone()))
    );
    assert_eq!(
        editor.connect(in_of(&editor, &b), out_of(&editor, &a)),
        Err(CanvasError::IncompatiblePorts)
    );

    editor.connect(out_of(&editor, &a), in_of(&editor, &b)).unwrap();
    assert_eq!(
        editor.connect(out_of(&editor, &a), in_of(&editor, &b)),
        Err(CanvasError::DuplicateConnection)
    );

    let revision = editor.revision();
    assert!(editor.connect(out_of(&editor, &a), in_of(&editor, &b)).is_err());
    assert_eq!(editor.revision(), revision, "rejected edits do not bump revision");
}

#[test]
fn test_locked_nodes_cannot_move_or_delete() {
    let mut editor = Editor::default();
    let a = editor.add_node(http_node(Vec2::ZERO)).unwrap();
    editor.set_node_flags(&a, NodeFlags::LOCKED).unwrap();

    assert_eq!(
        editor.move_node(&a, Vec2::ONE),
        Err(CanvasError::NodeLocked(a.clone()))
    );
    assert_eq!(editor.delete_node(&a), Err(CanvasError::NodeLocked(a.clone())));

    editor.select_node(&a);
    assert_eq!(editor.delete_selection(), 0);
}

#[test]
fn test_noop_edits_do_not_grow_history() {
    let mut editor = Editor::default();
    let a = editor.add_node(http_node(Vec2::new(10.0, 10.0))).unwrap();
    let len = editor.history_len();

    editor.move_node(&a, Vec2::new(10.0, 10.0)).unwrap();
    editor.rename_node(&a, "http_request").unwrap();

    assert_eq!(editor.history_len(), len);
}

#[test]
fn test_canvas_objects() {
    let mut editor = Editor::new(CanvasConfig::default());

    let group = editor.add_group("Inputs", Vec2::ZERO, Vec2::new(300.0, 200.0));
    let text = editor.add_text("note", Vec2::new(50.0, 250.0));

    editor.resize_group(&group, Vec2::new(10.0, 10.0)).unwrap();
    let size = editor.state().object(&group).unwrap().size;
    assert_eq!(size, CanvasConfig::default().min_group_size);

    assert_eq!(
        editor.resize_group(&text, Vec2::new(500.0, 500.0)),
        Err(CanvasError::WrongObjectKind(text.clone(), "group"))
    );
    assert_eq!(
        editor.update_text(&group, "x"),
        Err(CanvasError::WrongObjectKind(group.clone(), "text"))
    );

    editor.update_text(&text, "updated").unwrap();
    editor.delete_object(&group).unwrap();
    assert_eq!(editor.state().canvas_objects.len(), 1);

    editor.undo();
    assert_eq!(editor.state().canvas_objects.len(), 2);
}

#[test]
fn test_node_config_and_definitions() {
    let definition = NodeDefinition {
        node_type: "llm".to_string(),
        name: "LLM".to_string(),
        category: "AI".to_string(),
        description: String::new(),
        inputs: vec![PortSchema {
            name: "prompt".to_string(),
            data_type: "string".to_string(),
        }],
        outputs: vec![PortSchema {
            name: "text".to_string(),
            data_type: "string".to_string(),
        }],
        default_config: json!({ "model": "default" }),
    };

    let mut editor = Editor::default();
    let id = editor
        .add_node_from_definition(&definition, Vec2::new(40.0, 40.0))
        .unwrap();

    let node = editor.state().node(&id).unwrap();
    assert_eq!(node.name, "LLM");
    assert_eq!(node.inputs.len(), 1);
    assert_eq!(node.config["model"], "default");

    editor
        .update_node_config(&id, json!({ "model": "large" }))
        .unwrap();
    assert_eq!(editor.state().node(&id).unwrap().config["model"], "large");
}

#[test]
fn test_load_resets_history_and_selection() {
    let mut editor = Editor::default();
    editor.add_node(http_node(Vec2::ZERO)).unwrap();
    assert!(editor.can_undo());

    let mut other = Editor::default();
    other.add_node(http_node(Vec2::ZERO)).unwrap();
    other.add_node(http_node(Vec2::new(400.0, 0.0))).unwrap();
    let mut loaded = other.present().clone();
    loaded.selected_node_id = None;

    editor.load(loaded);

    assert!(!editor.can_undo());
    assert!(editor.selection().is_empty());
    assert_eq!(editor.state().nodes.len(), 2);
}

#[test]
fn test_clear_is_undoable() {
    let mut editor = Editor::default();
    editor.add_node(http_node(Vec2::ZERO)).unwrap();
    editor.add_group("g", Vec2::ZERO, Vec2::new(200.0, 200.0));

    assert!(editor.clear());
    assert!(editor.state().nodes.is_empty());

    editor.undo();
    assert_eq!(editor.state().nodes.len(), 1);
    assert_eq!(editor.state().canvas_objects.len(), 1);
}

#[test]
fn test_clear_keeps_locked_nodes() {
    let mut editor = Editor::default();
    let a = editor.add_node(http_node(Vec2::ZERO)).unwrap();
    let b = editor.add_node(http_node(Vec2::new(300.0, 0.0))).unwrap();
    let source = out_of(&editor, &a);
    let target = in_of(&editor, &b);
    editor.connect(source, target).unwrap();
    editor.set_node_flags(&a, NodeFlags::LOCKED).unwrap();

    assert!(editor.clear());

    // The locked node stays; its connection to a removed node does not.
    assert_eq!(editor.state().nodes.len(), 1);
    assert!(editor.state().node(&a).is_some());
    assert!(editor.state().connections.is_empty());

    // Clearing again only meets the locked node and records nothing.
    let history_len = editor.history_len();
    assert!(!editor.clear());
    assert_eq!(editor.history_len(), history_len);
}

#[test]
fn test_undo_keeps_unrelated_selection() {
    let mut editor = Editor::default();
    let a = editor.add_node(http_node(Vec2::ZERO)).unwrap();
    let b = editor.add_node(http_node(Vec2::new(300.0, 0.0))).unwrap();
    assert_eq!(editor.selection().ids(), &[b.clone()]);

    // 1. The user picks A, then adds a note
    editor.select_node(&a);
    editor.add_text("todo", Vec2::new(0.0, 200.0));

    // 2. Undoing the note leaves the selection alone
    assert!(editor.undo());
    assert!(editor.state().canvas_objects.is_empty());
    assert_eq!(editor.selection().ids(), &[a.clone()]);

    // 3. Undoing the insert of B restores the primary recorded before it
    assert!(editor.undo());
    assert_eq!(editor.selection().ids(), &[a]);
}
