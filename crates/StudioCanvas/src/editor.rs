//! # Editor
//!
//! The `Editor` ties the canvas together: it owns the undo history, a working
//! copy of the present snapshot, the transient selection, the viewport and the
//! gesture state machine.
//!
//! ## Working copy
//!
//! Gestures (dragging, resizing) mutate `working` directly so the host can
//! repaint every frame without touching history. When a gesture ends the
//! interaction layer emits a commit event and the editor records exactly one
//! history entry for it, derived from the present snapshot. After every
//! commit, undo or redo the working copy is re-synced from the present one.

use glam::Vec2;
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::NodeDefinition;
use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::history::History;
use crate::input::{KeyEvent, PointerEvent, WheelEvent};
use crate::interaction::{self, InteractionMode, LogicEvent, Overlay};
use crate::model::{
    CanvasObject, CanvasObjectKind, CanvasState, ConnectionId, Endpoint, Node, NodeFlags, NodeId,
    ObjectId,
};
use crate::persistence::{DocumentMeta, WorkflowDocument};
use crate::selection::Selection;
use crate::view::Viewport;

/// Headless workflow editor.
pub struct Editor {
    pub config: CanvasConfig,
    pub viewport: Viewport,
    pub interaction_mode: InteractionMode,
    history: History<CanvasState>,
    working: CanvasState,
    selection: Selection,
    revision: u64,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Editor {
    pub fn new(config: CanvasConfig) -> Self {
        Self::with_state(config, CanvasState::default())
    }

    /// Creates an editor whose history starts at `state`.
    pub fn with_state(config: CanvasConfig, mut state: CanvasState) -> Self {
        state.prune_dangling_connections();
        let history = History::new(state.clone(), config.history_limit);
        let mut editor = Self {
            config,
            viewport: Viewport::default(),
            interaction_mode: InteractionMode::Idle,
            history,
            working: state,
            selection: Selection::default(),
            revision: 0,
        };
        editor.restore_primary_selection();
        editor
    }

    /// The state to render. Equal to [`Editor::present`] unless a gesture is in flight.
    pub fn state(&self) -> &CanvasState {
        &self.working
    }

    /// The snapshot at the history cursor.
    pub fn present(&self) -> &CanvasState {
        self.history.present()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History<CanvasState> {
        &self.history
    }

    /// Incremented on every recorded edit, undo and redo.
    ///
    /// Hosts compare revisions to decide when the document needs saving.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Replaces the document. History restarts at `state` and cannot be undone past it.
    pub fn load(&mut self, mut state: CanvasState) {
        let dropped = state.prune_dangling_connections();
        if dropped > 0 {
            warn!(dropped, "Dropped dangling connections while loading canvas");
        }
        self.history.replace(state);
        self.interaction_mode = InteractionMode::Idle;
        self.selection.clear();
        self.working = self.history.present().clone();
        self.restore_primary_selection();
        debug!(
            nodes = self.working.nodes.len(),
            connections = self.working.connections.len(),
            "Loaded canvas"
        );
    }

    /// Loads a backend document and returns its metadata.
    pub fn load_document(&mut self, document: WorkflowDocument) -> DocumentMeta {
        let (meta, state) = document.into_state();
        self.load(state);
        meta
    }

    /// Serializes the present snapshot.
    pub fn document(&self, meta: &DocumentMeta) -> WorkflowDocument {
        WorkflowDocument::from_state(meta, self.history.present())
    }

    // --- Recording ---

    fn record<F>(&mut self, action: &'static str, mutator: F) -> bool
    where
        F: FnOnce(&mut CanvasState),
    {
        let recorded = self.history.push_producer(mutator);
        self.after_edit(action, recorded);
        recorded
    }

    fn try_record<F, R>(&mut self, action: &'static str, mutator: F) -> Result<R, CanvasError>
    where
        F: FnOnce(&mut CanvasState) -> Result<R, CanvasError>,
    {
        match self.history.try_push_producer(mutator) {
            Ok((output, recorded)) => {
                self.after_edit(action, recorded);
                Ok(output)
            }
            Err(e) => {
                debug!(action, error = %e, "Canvas edit rejected");
                Err(e)
            }
        }
    }

    fn after_edit(&mut self, action: &'static str, recorded: bool) {
        if recorded {
            self.revision += 1;
            debug!(
                action,
                revision = self.revision,
                history_len = self.history.len(),
                "Recorded canvas edit"
            );
        } else {
            debug!(action, "Canvas edit changed nothing");
        }
        self.sync_working();
    }

    fn sync_working(&mut self) {
        self.working = self.history.present().clone();
        self.selection.retain_existing(&self.working);
    }

    fn restore_primary_selection(&mut self) {
        if let Some(id) = self.working.selected_node_id.clone()
            && self.working.node(&id).is_some()
            && !self.selection.contains(&id)
        {
            self.selection.select_only(id);
        }
    }

    // --- Nodes ---

    /// Adds a node and selects it.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, CanvasError> {
        let id = node.id.clone();
        let selected = id.clone();
        self.try_record("add_node", |draft| {
            if draft.node(&node.id).is_some() {
                return Err(CanvasError::DuplicateNode(node.id));
            }
            draft.nodes.push(node);
            draft.selected_node_id = Some(selected);
            Ok(())
        })?;
        self.selection.select_only(id.clone());
        Ok(id)
    }

    /// Instantiates a palette definition at `position` and adds it.
    pub fn add_node_from_definition(
        &mut self,
        definition: &NodeDefinition,
        position: Vec2,
    ) -> Result<NodeId, CanvasError> {
        self.add_node(definition.instantiate(position))
    }

    /// Removes a node and every connection touching it as one undoable step.
    ///
    /// Returns the number of connections removed with it.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<usize, CanvasError> {
        self.try_record("delete_node", |draft| {
            if draft.node(id).is_some_and(Node::is_locked) {
                return Err(CanvasError::NodeLocked(id.clone()));
            }
            draft.remove_node(id).map(|(_, removed)| removed)
        })
    }

    /// Deletes every selected, unlocked node in one step. Returns how many were removed.
    pub fn delete_selection(&mut self) -> usize {
        let ids: Vec<NodeId> = self
            .selection
            .ids()
            .iter()
            .filter(|id| self.present().node(id).is_some_and(|n| !n.is_locked()))
            .cloned()
            .collect();
        if ids.is_empty() {
            return 0;
        }

        self.record("delete_selection", |draft| {
            draft.nodes.retain(|n| !ids.contains(&n.id));
            draft
                .connections
                .retain(|c| !ids.iter().any(|id| c.touches(id)));
            if draft
                .selected_node_id
                .as_ref()
                .is_some_and(|s| ids.contains(s))
            {
                draft.selected_node_id = None;
            }
        });
        ids.len()
    }

    /// Removes everything but locked nodes from the canvas as one undoable step.
    ///
    /// Connections survive only between two locked nodes.
    pub fn clear(&mut self) -> bool {
        self.selection.clear();
        self.record("clear", |draft| {
            draft.nodes.retain(Node::is_locked);
            let kept: Vec<NodeId> = draft.nodes.iter().map(|n| n.id.clone()).collect();
            draft
                .connections
                .retain(|c| kept.contains(&c.source.node) && kept.contains(&c.target.node));
            draft.canvas_objects.clear();
            if draft
                .selected_node_id
                .as_ref()
                .is_some_and(|id| !kept.contains(id))
            {
                draft.selected_node_id = None;
            }
        })
    }

    pub fn move_node(&mut self, id: &NodeId, position: Vec2) -> Result<(), CanvasError> {
        self.try_record("move_node", |draft| {
            let node = draft
                .node_mut(id)
                .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;
            if node.is_locked() {
                return Err(CanvasError::NodeLocked(id.clone()));
            }
            node.position = position;
            Ok(())
        })
    }

    pub fn rename_node(&mut self, id: &NodeId, name: impl Into<String>) -> Result<(), CanvasError> {
        let name = name.into();
        self.try_record("rename_node", |draft| {
            let node = draft
                .node_mut(id)
                .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;
            node.name = name;
            Ok(())
        })
    }

    /// Replaces a node's configuration object.
    pub fn update_node_config(&mut self, id: &NodeId, config: Value) -> Result<(), CanvasError> {
        self.try_record("update_node_config", |draft| {
            let node = draft
                .node_mut(id)
                .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;
            node.config = config;
            Ok(())
        })
    }

    pub fn set_node_flags(&mut self, id: &NodeId, flags: NodeFlags) -> Result<(), CanvasError> {
        self.try_record("set_node_flags", |draft| {
            let node = draft
                .node_mut(id)
                .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;
            node.flags = flags;
            Ok(())
        })
    }

    // --- Connections ---

    pub fn connect(
        &mut self,
        source: Endpoint,
        target: Endpoint,
    ) -> Result<ConnectionId, CanvasError> {
        self.try_record("connect", |draft| draft.connect(source, target))
    }

    pub fn disconnect(&mut self, id: &ConnectionId) -> Result<(), CanvasError> {
        self.try_record("disconnect", |draft| draft.disconnect(id).map(|_| ()))
    }

    // --- Canvas objects ---

    pub fn add_group(&mut self, title: impl Into<String>, position: Vec2, size: Vec2) -> ObjectId {
        self.add_object("add_group", CanvasObject::group(title, position, size))
    }

    pub fn add_text(&mut self, content: impl Into<String>, position: Vec2) -> ObjectId {
        self.add_object("add_text", CanvasObject::text(content, position))
    }

    fn add_object(&mut self, action: &'static str, object: CanvasObject) -> ObjectId {
        let id = object.id.clone();
        self.record(action, |draft| draft.canvas_objects.push(object));
        id
    }

    pub fn move_object(&mut self, id: &ObjectId, position: Vec2) -> Result<(), CanvasError> {
        self.try_record("move_object", |draft| {
            let object = draft
                .object_mut(id)
                .ok_or_else(|| CanvasError::ObjectNotFound(id.clone()))?;
            object.position = position;
            Ok(())
        })
    }

    /// Resizes a group, clamped to the configured minimum size.
    pub fn resize_group(&mut self, id: &ObjectId, size: Vec2) -> Result<(), CanvasError> {
        let size = size.max(self.config.min_group_size);
        self.try_record("resize_group", |draft| {
            let object = draft
                .object_mut(id)
                .ok_or_else(|| CanvasError::ObjectNotFound(id.clone()))?;
            if !object.is_group() {
                return Err(CanvasError::WrongObjectKind(id.clone(), "group"));
            }
            object.size = size;
            Ok(())
        })
    }

    pub fn update_text(
        &mut self,
        id: &ObjectId,
        content: impl Into<String>,
    ) -> Result<(), CanvasError> {
        let content = content.into();
        self.try_record("update_text", |draft| {
            let object = draft
                .object_mut(id)
                .ok_or_else(|| CanvasError::ObjectNotFound(id.clone()))?;
            match &mut object.kind {
                CanvasObjectKind::Text { content: current } => {
                    *current = content;
                    Ok(())
                }
                CanvasObjectKind::Group { .. } => {
                    Err(CanvasError::WrongObjectKind(id.clone(), "text"))
                }
            }
        })
    }

    pub fn delete_object(&mut self, id: &ObjectId) -> Result<(), CanvasError> {
        self.try_record("delete_object", |draft| {
            let idx = draft
                .canvas_objects
                .iter()
                .position(|o| &o.id == id)
                .ok_or_else(|| CanvasError::ObjectNotFound(id.clone()))?;
            draft.canvas_objects.remove(idx);
            Ok(())
        })
    }

    // --- Selection ---

    pub fn select_node(&mut self, id: &NodeId) -> bool {
        if self.working.node(id).is_none() {
            return false;
        }
        self.selection.select_only(id.clone());
        true
    }

    /// Adds or removes a node from the selection. Returns whether it is selected afterwards.
    pub fn toggle_node_selection(&mut self, id: &NodeId) -> bool {
        if self.working.node(id).is_none() {
            return false;
        }
        self.selection.toggle(id.clone())
    }

    pub fn select_all(&mut self) -> bool {
        let ids = self.working.nodes.iter().map(|n| n.id.clone()).collect();
        self.selection.set(ids)
    }

    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear()
    }

    // --- History ---

    pub fn undo(&mut self) -> bool {
        self.step_history("undo", History::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.step_history("redo", History::redo)
    }

    fn step_history(
        &mut self,
        action: &'static str,
        step: fn(&mut History<CanvasState>) -> bool,
    ) -> bool {
        let primary_before = self.history.present().selected_node_id.clone();
        if !step(&mut self.history) {
            return false;
        }
        self.revision += 1;
        self.interaction_mode = InteractionMode::Idle;
        self.sync_working();
        // Only edits that changed the recorded primary move the live selection.
        if self.working.selected_node_id != primary_before {
            self.restore_primary_selection();
        }
        debug!(
            action,
            cursor = self.history.cursor(),
            revision = self.revision,
            "Moved through history"
        );
        true
    }

    // --- Input ---

    /// Feeds a pointer event through the gesture state machine and applies any commit.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Vec<LogicEvent> {
        let mut events = Vec::new();
        interaction::handle_pointer(
            &mut self.interaction_mode,
            &mut self.viewport,
            &self.config,
            event,
            &mut self.working,
            &mut self.selection,
            &mut events,
        );
        self.apply_logic_events(&events);
        events
    }

    pub fn handle_wheel(&mut self, event: &WheelEvent) -> Vec<LogicEvent> {
        let mut events = Vec::new();
        interaction::handle_wheel(&mut self.viewport, &self.config, event, &mut events);
        events
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> Vec<LogicEvent> {
        let mut events = Vec::new();
        interaction::handle_key(
            &mut self.interaction_mode,
            &mut self.viewport,
            event,
            &mut self.working,
            &mut self.selection,
            &mut events,
        );
        self.apply_logic_events(&events);
        events
    }

    /// Transient visuals for the active gesture.
    pub fn overlay(&self) -> Overlay {
        interaction::overlay(&self.interaction_mode, &self.working)
    }

    fn apply_logic_events(&mut self, events: &[LogicEvent]) {
        for event in events {
            match event {
                LogicEvent::NodesMoved { moves } => {
                    self.record("move_nodes", |draft| {
                        for (id, position) in moves {
                            if let Some(node) = draft.node_mut(id) {
                                node.position = *position;
                            }
                        }
                    });
                }
                LogicEvent::ObjectMoved { id, position } => {
                    if let Err(e) = self.move_object(id, *position) {
                        warn!(object_id = %id, error = %e, "Failed to commit object move");
                    }
                }
                LogicEvent::GroupResized { id, size } => {
                    if let Err(e) = self.resize_group(id, *size) {
                        warn!(object_id = %id, error = %e, "Failed to commit group resize");
                    }
                }
                LogicEvent::Connect { source, target } => {
                    match self.connect(source.clone(), target.clone()) {
                        Ok(connection_id) => {
                            debug!(connection_id = %connection_id, "Connected ports")
                        }
                        Err(e) => warn!(error = %e, "Connection rejected"),
                    }
                }
                LogicEvent::DeleteSelection => {
                    self.delete_selection();
                }
                LogicEvent::Undo => {
                    self.undo();
                }
                LogicEvent::Redo => {
                    self.redo();
                }
                LogicEvent::SelectionChanged
                | LogicEvent::ViewportChanged
                | LogicEvent::RepaintNeeded => {}
            }
        }
    }
}
