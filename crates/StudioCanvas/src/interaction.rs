use glam::Vec2;

use crate::config::CanvasConfig;
use crate::input::{Key, KeyEvent, PointerButton, PointerEvent, PointerKind, WheelEvent};
use crate::math::{self, Rect};
use crate::model::{CanvasState, Endpoint, NodeId, ObjectId, PortDirection};
use crate::selection::Selection;
use crate::view::Viewport;

/// Events emitted by the interaction layer to the editor.
///
/// Gestures only touch the working copy while they are active; the final value
/// is reported once, on release, so the editor can record a single history entry.
#[derive(Clone, Debug, PartialEq)]
pub enum LogicEvent {
    /// A drag of one or more nodes ended. Carries the final canvas positions.
    NodesMoved { moves: Vec<(NodeId, Vec2)> },
    /// A canvas object drag ended.
    ObjectMoved { id: ObjectId, position: Vec2 },
    /// A group resize ended.
    GroupResized { id: ObjectId, size: Vec2 },
    /// Request to connect an output port to an input port.
    Connect { source: Endpoint, target: Endpoint },
    /// Request to delete selected nodes.
    DeleteSelection,
    SelectionChanged,
    Undo,
    Redo,
    /// Pan or zoom changed.
    ViewportChanged,
    /// The working copy changed visually, requiring a repaint.
    RepaintNeeded,
}

/// The current state of user interaction.
#[derive(Clone, Debug, PartialEq)]
pub enum InteractionMode {
    /// No active interaction.
    Idle,
    /// User is panning the canvas (middle button drag).
    Panning {
        /// Pointer position at start of drag (client space).
        start_client: Vec2,
        /// Scroll offset at start of drag.
        initial_scroll: Vec2,
    },
    /// User is moving the selected nodes.
    DraggingNodes {
        /// Nodes being dragged and their positions when the drag started.
        initial_positions: Vec<(NodeId, Vec2)>,
        /// Pointer position when drag started (canvas space).
        start_canvas: Vec2,
        /// Pointer position when drag started (client space).
        start_client: Vec2,
        /// Node under a plain press that was already part of a multi-selection.
        /// A release without movement narrows the selection to it.
        pressed: Option<NodeId>,
    },
    /// User is moving a group or text annotation.
    DraggingObject {
        object: ObjectId,
        initial_position: Vec2,
        start_canvas: Vec2,
    },
    /// User is dragging a group's resize handle.
    ResizingGroup {
        object: ObjectId,
        initial_size: Vec2,
        start_canvas: Vec2,
    },
    /// User is drawing a selection rectangle.
    BoxSelecting {
        start_canvas: Vec2,
        current_canvas: Vec2,
        /// Start in client space, used for the click-vs-drag threshold.
        start_client: Vec2,
        /// Selection kept underneath the box (non-empty for additive selection).
        base: Vec<NodeId>,
    },
    /// User is drawing a connection from a port.
    Linking {
        source: Endpoint,
        direction: PortDirection,
        /// Current temporary endpoint of the wire (canvas space).
        current_canvas: Vec2,
    },
}

impl InteractionMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionMode::Idle)
    }
}

/// Transient visuals of the active gesture, for the host to draw on top of the canvas.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overlay {
    /// Selection rectangle in canvas space.
    pub selection_box: Option<Rect>,
    pub pending_wire: Option<WirePreview>,
}

/// A wire being drawn, oriented from the output side to the input side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WirePreview {
    pub from: Vec2,
    pub to: Vec2,
    pub control_points: (Vec2, Vec2),
}

/// Handles a pointer event and updates the working state.
///
/// This function acts as the central state machine for gestures. It processes
/// the event based on the current `InteractionMode` and transitions between
/// states. Commit events are pushed to `events` only when a gesture ends.
pub fn handle_pointer(
    mode: &mut InteractionMode,
    viewport: &mut Viewport,
    config: &CanvasConfig,
    event: &PointerEvent,
    state: &mut CanvasState,
    selection: &mut Selection,
    events: &mut Vec<LogicEvent>,
) {
    let next_mode = match mode {
        InteractionMode::Idle => {
            if event.kind == PointerKind::Down {
                handle_idle(viewport, config, event, state, selection, events)
            } else {
                None
            }
        }
        InteractionMode::Panning {
            start_client,
            initial_scroll,
        } => handle_panning(viewport, event, *start_client, *initial_scroll, events),
        InteractionMode::DraggingNodes {
            initial_positions,
            start_canvas,
            start_client,
            pressed,
        } => handle_dragging_nodes(
            viewport,
            config,
            event,
            state,
            selection,
            NodeDrag {
                initial_positions,
                start_canvas: *start_canvas,
                start_client: *start_client,
                pressed: pressed.as_ref(),
            },
            events,
        ),
        InteractionMode::DraggingObject {
            object,
            initial_position,
            start_canvas,
        } => handle_dragging_object(
            viewport,
            event,
            state,
            object,
            *initial_position,
            *start_canvas,
            events,
        ),
        InteractionMode::ResizingGroup {
            object,
            initial_size,
            start_canvas,
        } => handle_resizing_group(
            viewport,
            config,
            event,
            state,
            object,
            (*initial_size, *start_canvas),
            events,
        ),
        InteractionMode::BoxSelecting {
            start_canvas,
            current_canvas,
            start_client,
            base,
        } => handle_box_selecting(
            viewport,
            config,
            event,
            state,
            selection,
            BoxGesture {
                start_canvas: *start_canvas,
                current_canvas,
                start_client: *start_client,
                base,
            },
            events,
        ),
        InteractionMode::Linking {
            source,
            direction,
            current_canvas,
        } => handle_linking(
            viewport,
            config,
            event,
            state,
            (&*source, *direction),
            current_canvas,
            events,
        ),
    };

    if let Some(new_mode) = next_mode {
        *mode = new_mode;
    }
}

fn is_release(kind: PointerKind) -> bool {
    matches!(kind, PointerKind::Up | PointerKind::Leave)
}

/// Handles pointer-down in the `Idle` state.
///
/// Hit testing runs in priority order:
/// - ports start `Linking`
/// - nodes update the selection and start `DraggingNodes`
/// - group resize handles start `ResizingGroup`
/// - groups and text start `DraggingObject`
/// - empty canvas starts `BoxSelecting`
fn handle_idle(
    viewport: &Viewport,
    config: &CanvasConfig,
    event: &PointerEvent,
    state: &CanvasState,
    selection: &mut Selection,
    events: &mut Vec<LogicEvent>,
) -> Option<InteractionMode> {
    match event.button {
        PointerButton::Middle => {
            return Some(InteractionMode::Panning {
                start_client: event.client_pos,
                initial_scroll: viewport.scroll,
            });
        }
        PointerButton::Secondary => return None,
        PointerButton::Primary => {}
    }

    let canvas_pos = viewport.client_to_canvas(event.client_pos);

    if let Some((source, direction)) =
        state.port_at(canvas_pos, config.port_hit_radius / viewport.zoom)
    {
        return Some(InteractionMode::Linking {
            source,
            direction,
            current_canvas: canvas_pos,
        });
    }

    if let Some(node) = state.node_at(canvas_pos) {
        let node_id = node.id.clone();
        let mut pressed = None;

        if event.modifiers.toggles_selection() {
            let selected = selection.toggle(node_id);
            events.push(LogicEvent::SelectionChanged);
            if !selected {
                return None;
            }
        } else if !selection.contains(&node_id) {
            selection.select_only(node_id);
            events.push(LogicEvent::SelectionChanged);
        } else if selection.len() > 1 {
            pressed = Some(node_id);
        }

        // Locked nodes stay selectable but never move.
        let initial_positions: Vec<(NodeId, Vec2)> = selection
            .ids()
            .iter()
            .filter_map(|id| state.node(id))
            .filter(|n| !n.is_locked())
            .map(|n| (n.id.clone(), n.position))
            .collect();

        if initial_positions.is_empty() {
            if let Some(id) = pressed {
                selection.select_only(id);
                events.push(LogicEvent::SelectionChanged);
            }
            return None;
        }
        return Some(InteractionMode::DraggingNodes {
            initial_positions,
            start_canvas: canvas_pos,
            start_client: event.client_pos,
            pressed,
        });
    }

    if let Some(group) = state.resize_handle_at(canvas_pos, config.resize_handle_size) {
        return Some(InteractionMode::ResizingGroup {
            object: group.id.clone(),
            initial_size: group.size,
            start_canvas: canvas_pos,
        });
    }

    if let Some(object) = state.object_at(canvas_pos) {
        return Some(InteractionMode::DraggingObject {
            object: object.id.clone(),
            initial_position: object.position,
            start_canvas: canvas_pos,
        });
    }

    let base = if event.modifiers.toggles_selection() {
        selection.ids().to_vec()
    } else {
        Vec::new()
    };
    Some(InteractionMode::BoxSelecting {
        start_canvas: canvas_pos,
        current_canvas: canvas_pos,
        start_client: event.client_pos,
        base,
    })
}

/// Handles the `Panning` state: scroll follows the pointer until release.
fn handle_panning(
    viewport: &mut Viewport,
    event: &PointerEvent,
    start_client: Vec2,
    initial_scroll: Vec2,
    events: &mut Vec<LogicEvent>,
) -> Option<InteractionMode> {
    match event.kind {
        PointerKind::Down => None,
        PointerKind::Move => {
            viewport.scroll = initial_scroll;
            viewport.pan_by(event.client_pos - start_client);
            events.push(LogicEvent::ViewportChanged);
            None
        }
        PointerKind::Up | PointerKind::Leave => Some(InteractionMode::Idle),
    }
}

struct NodeDrag<'a> {
    initial_positions: &'a [(NodeId, Vec2)],
    start_canvas: Vec2,
    start_client: Vec2,
    pressed: Option<&'a NodeId>,
}

/// Handles the `DraggingNodes` state.
///
/// Moves every dragged node by the pointer delta in canvas space. On release
/// reports the final positions in one `NodesMoved`. A release under the click
/// threshold after a plain press on a multi-selection is a click: the nodes
/// snap back and the selection narrows to the pressed node.
fn handle_dragging_nodes(
    viewport: &Viewport,
    config: &CanvasConfig,
    event: &PointerEvent,
    state: &mut CanvasState,
    selection: &mut Selection,
    drag: NodeDrag<'_>,
    events: &mut Vec<LogicEvent>,
) -> Option<InteractionMode> {
    let initial_positions = drag.initial_positions;
    if matches!(event.kind, PointerKind::Move | PointerKind::Up) {
        let delta = viewport.client_to_canvas(event.client_pos) - drag.start_canvas;
        for (id, initial) in initial_positions {
            if let Some(node) = state.node_mut(id) {
                node.position = *initial + delta;
            }
        }
        events.push(LogicEvent::RepaintNeeded);
    }

    if !is_release(event.kind) {
        return None;
    }

    let travel = event.client_pos.distance(drag.start_client);
    if let Some(id) = drag.pressed
        && travel < config.box_select_threshold
    {
        for (node_id, initial) in initial_positions {
            if let Some(node) = state.node_mut(node_id) {
                node.position = *initial;
            }
        }
        selection.select_only(id.clone());
        events.push(LogicEvent::SelectionChanged);
        return Some(InteractionMode::Idle);
    }

    let moves = initial_positions
        .iter()
        .filter_map(|(id, _)| state.node(id).map(|n| (id.clone(), n.position)))
        .collect();
    events.push(LogicEvent::NodesMoved { moves });
    Some(InteractionMode::Idle)
}

/// Handles the `DraggingObject` state.
fn handle_dragging_object(
    viewport: &Viewport,
    event: &PointerEvent,
    state: &mut CanvasState,
    object: &ObjectId,
    initial_position: Vec2,
    start_canvas: Vec2,
    events: &mut Vec<LogicEvent>,
) -> Option<InteractionMode> {
    if matches!(event.kind, PointerKind::Move | PointerKind::Up)
        && let Some(obj) = state.object_mut(object)
    {
        let delta = viewport.client_to_canvas(event.client_pos) - start_canvas;
        obj.position = initial_position + delta;
        events.push(LogicEvent::RepaintNeeded);
    }

    if !is_release(event.kind) {
        return None;
    }

    if let Some(obj) = state.object(object) {
        events.push(LogicEvent::ObjectMoved {
            id: object.clone(),
            position: obj.position,
        });
    }
    Some(InteractionMode::Idle)
}

/// Handles the `ResizingGroup` state. The size never drops below `min_group_size`.
fn handle_resizing_group(
    viewport: &Viewport,
    config: &CanvasConfig,
    event: &PointerEvent,
    state: &mut CanvasState,
    object: &ObjectId,
    (initial_size, start_canvas): (Vec2, Vec2),
    events: &mut Vec<LogicEvent>,
) -> Option<InteractionMode> {
    if matches!(event.kind, PointerKind::Move | PointerKind::Up)
        && let Some(obj) = state.object_mut(object)
    {
        let delta = viewport.client_to_canvas(event.client_pos) - start_canvas;
        obj.size = (initial_size + delta).max(config.min_group_size);
        events.push(LogicEvent::RepaintNeeded);
    }

    if !is_release(event.kind) {
        return None;
    }

    if let Some(obj) = state.object(object) {
        events.push(LogicEvent::GroupResized {
            id: object.clone(),
            size: obj.size,
        });
    }
    Some(InteractionMode::Idle)
}

struct BoxGesture<'a> {
    start_canvas: Vec2,
    current_canvas: &'a mut Vec2,
    start_client: Vec2,
    base: &'a [NodeId],
}

/// Handles the `BoxSelecting` state.
///
/// The selection is recomputed on every move from the nodes intersecting the
/// box. A release closer than `box_select_threshold` to the start is a click on
/// empty canvas and clears the selection instead.
fn handle_box_selecting(
    viewport: &Viewport,
    config: &CanvasConfig,
    event: &PointerEvent,
    state: &CanvasState,
    selection: &mut Selection,
    gesture: BoxGesture<'_>,
    events: &mut Vec<LogicEvent>,
) -> Option<InteractionMode> {
    if matches!(event.kind, PointerKind::Move | PointerKind::Up) {
        *gesture.current_canvas = viewport.client_to_canvas(event.client_pos);

        let rect = Rect::from_corners(gesture.start_canvas, *gesture.current_canvas);
        let mut ids = gesture.base.to_vec();
        for id in state.nodes_in_rect(&rect) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if selection.set(ids) {
            events.push(LogicEvent::SelectionChanged);
        }
        events.push(LogicEvent::RepaintNeeded);
    }

    if !is_release(event.kind) {
        return None;
    }

    let distance = event.client_pos.distance(gesture.start_client);
    if distance < config.box_select_threshold && selection.clear() {
        events.push(LogicEvent::SelectionChanged);
    }
    Some(InteractionMode::Idle)
}

/// Handles the `Linking` state.
///
/// The wire end snaps to the nearest compatible port (opposite direction, other
/// node). Releasing over one emits `Connect`, oriented output → input.
fn handle_linking(
    viewport: &Viewport,
    config: &CanvasConfig,
    event: &PointerEvent,
    state: &CanvasState,
    (source, direction): (&Endpoint, PortDirection),
    current_canvas: &mut Vec2,
    events: &mut Vec<LogicEvent>,
) -> Option<InteractionMode> {
    if event.kind == PointerKind::Leave {
        events.push(LogicEvent::RepaintNeeded);
        return Some(InteractionMode::Idle);
    }
    if event.kind == PointerKind::Down {
        return None;
    }

    let pointer = viewport.client_to_canvas(event.client_pos);
    let snap_target = state.nearest_port(
        pointer,
        config.snap_threshold / viewport.zoom,
        |node, dir| node.id != source.node && dir != direction,
    );

    *current_canvas = snap_target
        .as_ref()
        .and_then(|(target, _)| state.find_port_position(target))
        .unwrap_or(pointer);
    events.push(LogicEvent::RepaintNeeded);

    if event.kind != PointerKind::Up {
        return None;
    }

    if let Some((target, _)) = snap_target {
        let (source, target) = match direction {
            PortDirection::Output => (source.clone(), target),
            PortDirection::Input => (target, source.clone()),
        };
        events.push(LogicEvent::Connect { source, target });
    }
    Some(InteractionMode::Idle)
}

/// Handles wheel input: Ctrl/Cmd + wheel zooms around the pointer, plain wheel scrolls.
pub fn handle_wheel(
    viewport: &mut Viewport,
    config: &CanvasConfig,
    event: &WheelEvent,
    events: &mut Vec<LogicEvent>,
) {
    if event.modifiers.command() {
        let factor = if event.delta.y < 0.0 {
            1.0 + config.zoom_speed
        } else if event.delta.y > 0.0 {
            1.0 / (1.0 + config.zoom_speed)
        } else {
            return;
        };
        if viewport.zoom_at(
            event.client_pos,
            viewport.zoom * factor,
            config.min_zoom,
            config.max_zoom,
        ) {
            events.push(LogicEvent::ViewportChanged);
        }
    } else if event.delta != Vec2::ZERO {
        viewport.pan_by(-event.delta);
        events.push(LogicEvent::ViewportChanged);
    }
}

/// Handles keyboard shortcuts.
///
/// Escape cancels an active gesture (restoring pre-gesture values) or clears
/// the selection. Every other shortcut is ignored while a gesture is active.
pub fn handle_key(
    mode: &mut InteractionMode,
    viewport: &mut Viewport,
    event: &KeyEvent,
    state: &mut CanvasState,
    selection: &mut Selection,
    events: &mut Vec<LogicEvent>,
) {
    if event.key == Key::Escape {
        if mode.is_idle() {
            if selection.clear() {
                events.push(LogicEvent::SelectionChanged);
            }
        } else {
            cancel_gesture(mode, viewport, state, selection, events);
        }
        return;
    }

    if !mode.is_idle() {
        return;
    }

    let command = event.modifiers.command();
    match event.key {
        Key::Delete | Key::Backspace => {
            if !selection.is_empty() {
                events.push(LogicEvent::DeleteSelection);
            }
        }
        Key::Z if command => {
            if event.modifiers.shift {
                events.push(LogicEvent::Redo);
            } else {
                events.push(LogicEvent::Undo);
            }
        }
        Key::Y if command => events.push(LogicEvent::Redo),
        Key::A if command => {
            let all = state.nodes.iter().map(|n| n.id.clone()).collect();
            if selection.set(all) {
                events.push(LogicEvent::SelectionChanged);
            }
        }
        _ => {}
    }
}

fn cancel_gesture(
    mode: &mut InteractionMode,
    viewport: &mut Viewport,
    state: &mut CanvasState,
    selection: &mut Selection,
    events: &mut Vec<LogicEvent>,
) {
    match std::mem::replace(mode, InteractionMode::Idle) {
        InteractionMode::Idle | InteractionMode::Linking { .. } => {}
        InteractionMode::Panning { initial_scroll, .. } => {
            viewport.scroll = initial_scroll;
            events.push(LogicEvent::ViewportChanged);
        }
        InteractionMode::DraggingNodes {
            initial_positions, ..
        } => {
            for (id, initial) in initial_positions {
                if let Some(node) = state.node_mut(&id) {
                    node.position = initial;
                }
            }
        }
        InteractionMode::DraggingObject {
            object,
            initial_position,
            ..
        } => {
            if let Some(obj) = state.object_mut(&object) {
                obj.position = initial_position;
            }
        }
        InteractionMode::ResizingGroup {
            object,
            initial_size,
            ..
        } => {
            if let Some(obj) = state.object_mut(&object) {
                obj.size = initial_size;
            }
        }
        InteractionMode::BoxSelecting { base, .. } => {
            if selection.set(base) {
                events.push(LogicEvent::SelectionChanged);
            }
        }
    }
    events.push(LogicEvent::RepaintNeeded);
}

/// Describes the transient visuals of the active gesture.
pub fn overlay(mode: &InteractionMode, state: &CanvasState) -> Overlay {
    match mode {
        InteractionMode::BoxSelecting {
            start_canvas,
            current_canvas,
            ..
        } => Overlay {
            selection_box: Some(Rect::from_corners(*start_canvas, *current_canvas)),
            pending_wire: None,
        },
        InteractionMode::Linking {
            source,
            direction,
            current_canvas,
        } => {
            let pending_wire = state.find_port_position(source).map(|anchor| {
                let (from, to) = match direction {
                    PortDirection::Output => (anchor, *current_canvas),
                    PortDirection::Input => (*current_canvas, anchor),
                };
                WirePreview {
                    from,
                    to,
                    control_points: math::wire_control_points(from, to),
                }
            });
            Overlay {
                selection_box: None,
                pending_wire,
            }
        }
        _ => Overlay::default(),
    }
}
