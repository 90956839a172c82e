//! # Core Data Models
//!
//! This module defines the undoable canvas state: nodes with their ports,
//! connections between ports, and free-form canvas objects (groups and text).
//!
//! Everything here is plain data. `CanvasState` derives `PartialEq` so the
//! history store can detect edits that did not change anything.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::CanvasError;
use crate::math::Rect;

/// Default layout size of a freshly created node.
pub const DEFAULT_NODE_SIZE: Vec2 = Vec2::new(180.0, 72.0);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generates a fresh, globally unique id.
            pub fn new() -> Self {
                Self(format!(concat!($prefix, "_{}"), uuid::Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Opaque identifier of a Node, stable across saves.
    NodeId,
    "node"
);
string_id!(
    /// Identifier of a Port, unique within its node.
    PortId,
    "port"
);
string_id!(
    /// Identifier of a Connection.
    ConnectionId,
    "conn"
);
string_id!(
    /// Identifier of a free-form canvas object (group or text).
    ObjectId,
    "obj"
);

bitflags! {
    /// Bitflags representing various boolean states of a Node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// The node cannot be moved or deleted.
        const LOCKED = 1 << 0;
        /// The node is skipped at execution time.
        const DISABLED = 1 << 1;
    }
}

// Flags travel as a plain integer so the backend can treat them as opaque.
impl Serialize for NodeFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for NodeFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

/// Which side of a node a port sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

/// A Port on a Node.
///
/// Ports are the anchors for Connections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    /// Declared payload type, `"any"` when unconstrained.
    #[serde(default = "any_type")]
    pub data_type: String,
}

fn any_type() -> String {
    "any".to_string()
}

impl Port {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            id: PortId::new(),
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A Node in the workflow.
///
/// Nodes are the primary entities. They have a position, size, a list of
/// input/output ports, and an opaque JSON configuration owned by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Registry type of the node (e.g. `"http_request"`).
    pub node_type: String,
    /// Display name.
    pub name: String,
    /// Canvas-space position of the top-left corner.
    pub position: Vec2,
    /// Size of the node layout.
    #[serde(default = "default_node_size")]
    pub size: Vec2,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub inputs: Vec<Port>,
    #[serde(default)]
    pub outputs: Vec<Port>,
    #[serde(default)]
    pub flags: NodeFlags,
}

fn default_node_size() -> Vec2 {
    DEFAULT_NODE_SIZE
}

impl Node {
    /// Creates a node of the given type with no ports and an empty configuration.
    pub fn new(node_type: impl Into<String>, position: Vec2) -> Self {
        let node_type = node_type.into();
        Self {
            id: NodeId::new(),
            name: node_type.clone(),
            node_type,
            position,
            size: DEFAULT_NODE_SIZE,
            config: Value::Object(Default::default()),
            inputs: Vec::new(),
            outputs: Vec::new(),
            flags: NodeFlags::empty(),
        }
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_size(mut self, size: Vec2) -> Self {
        self.size = size;
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_input(mut self, port: Port) -> Self {
        self.inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: Port) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn is_locked(&self) -> bool {
        self.flags.contains(NodeFlags::LOCKED)
    }

    /// Bounding box in canvas space.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    /// Looks up a port and reports which side it is on.
    pub fn port(&self, port_id: &PortId) -> Option<(PortDirection, &Port)> {
        if let Some(port) = self.inputs.iter().find(|p| &p.id == port_id) {
            return Some((PortDirection::Input, port));
        }
        self.outputs
            .iter()
            .find(|p| &p.id == port_id)
            .map(|port| (PortDirection::Output, port))
    }

    /// Canvas-space anchor of a port.
    ///
    /// Inputs are spread evenly down the left edge, outputs down the right edge.
    pub fn port_position(&self, port_id: &PortId) -> Option<Vec2> {
        if let Some(idx) = self.inputs.iter().position(|p| &p.id == port_id) {
            let spacing = self.size.y / (self.inputs.len() as f32 + 1.0);
            return Some(self.position + Vec2::new(0.0, spacing * (idx as f32 + 1.0)));
        }

        if let Some(idx) = self.outputs.iter().position(|p| &p.id == port_id) {
            let spacing = self.size.y / (self.outputs.len() as f32 + 1.0);
            return Some(self.position + Vec2::new(self.size.x, spacing * (idx as f32 + 1.0)));
        }

        None
    }

    /// Iterates every port with its direction and anchor position.
    pub fn port_anchors(&self) -> impl Iterator<Item = (PortDirection, &Port, Vec2)> + '_ {
        let inputs = self
            .inputs
            .iter()
            .map(|p| (PortDirection::Input, p));
        let outputs = self
            .outputs
            .iter()
            .map(|p| (PortDirection::Output, p));
        inputs.chain(outputs).filter_map(move |(dir, port)| {
            self.port_position(&port.id).map(|pos| (dir, port, pos))
        })
    }
}

/// One side of a connection: a port on a specific node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub port: PortId,
}

impl Endpoint {
    pub fn new(node: impl Into<NodeId>, port: impl Into<PortId>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

/// A Connection from an output port to an input port.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub source: Endpoint,
    pub target: Endpoint,
}

impl Connection {
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source.node == node || &self.target.node == node
    }
}

/// What a canvas object is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanvasObjectKind {
    /// A titled, resizable frame drawn behind nodes.
    Group {
        title: String,
        #[serde(default)]
        color: Option<String>,
    },
    /// A free text annotation.
    Text { content: String },
}

/// A group or text annotation, independent of nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasObject {
    pub id: ObjectId,
    #[serde(flatten)]
    pub kind: CanvasObjectKind,
    pub position: Vec2,
    pub size: Vec2,
}

impl CanvasObject {
    pub fn group(title: impl Into<String>, position: Vec2, size: Vec2) -> Self {
        Self {
            id: ObjectId::new(),
            kind: CanvasObjectKind::Group {
                title: title.into(),
                color: None,
            },
            position,
            size,
        }
    }

    pub fn text(content: impl Into<String>, position: Vec2) -> Self {
        Self {
            id: ObjectId::new(),
            kind: CanvasObjectKind::Text {
                content: content.into(),
            },
            position,
            size: Vec2::new(200.0, 40.0),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, CanvasObjectKind::Group { .. })
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.position, self.size)
    }
}

/// The entire undoable state of the canvas.
///
/// Vector order doubles as draw order: later entries are drawn on top.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasState {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub canvas_objects: Vec<CanvasObject>,
    #[serde(default)]
    pub selected_node_id: Option<NodeId>,
}

impl CanvasState {
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&CanvasObject> {
        self.canvas_objects.iter().find(|o| &o.id == id)
    }

    pub fn object_mut(&mut self, id: &ObjectId) -> Option<&mut CanvasObject> {
        self.canvas_objects.iter_mut().find(|o| &o.id == id)
    }

    /// Helper to find the canvas position of a port.
    pub fn find_port_position(&self, endpoint: &Endpoint) -> Option<Vec2> {
        self.node(&endpoint.node)?.port_position(&endpoint.port)
    }

    /// Removes a node together with every connection referencing it.
    ///
    /// Returns the removed node and how many connections went with it.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(Node, usize), CanvasError> {
        let idx = self
            .nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| CanvasError::NodeNotFound(id.clone()))?;
        let node = self.nodes.remove(idx);

        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(id));
        let removed = before - self.connections.len();

        if self.selected_node_id.as_ref() == Some(id) {
            self.selected_node_id = None;
        }
        Ok((node, removed))
    }

    /// Validates and inserts a connection.
    ///
    /// The source must be an output port and the target an input port on a
    /// different node, and the exact pair must not already be connected.
    pub fn connect(
        &mut self,
        source: Endpoint,
        target: Endpoint,
    ) -> Result<ConnectionId, CanvasError> {
        if source.node == target.node {
            return Err(CanvasError::SelfConnection(source.node));
        }
        let source_dir = self.port_direction(&source)?;
        let target_dir = self.port_direction(&target)?;
        if source_dir != PortDirection::Output || target_dir != PortDirection::Input {
            return Err(CanvasError::IncompatiblePorts);
        }
        if self
            .connections
            .iter()
            .any(|c| c.source == source && c.target == target)
        {
            return Err(CanvasError::DuplicateConnection);
        }

        let id = ConnectionId::new();
        self.connections.push(Connection {
            id: id.clone(),
            source,
            target,
        });
        Ok(id)
    }

    pub fn disconnect(&mut self, id: &ConnectionId) -> Result<Connection, CanvasError> {
        let idx = self
            .connections
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| CanvasError::ConnectionNotFound(id.clone()))?;
        Ok(self.connections.remove(idx))
    }

    fn port_direction(&self, endpoint: &Endpoint) -> Result<PortDirection, CanvasError> {
        let node = self
            .node(&endpoint.node)
            .ok_or_else(|| CanvasError::NodeNotFound(endpoint.node.clone()))?;
        node.port(&endpoint.port)
            .map(|(dir, _)| dir)
            .ok_or_else(|| CanvasError::PortNotFound {
                node: endpoint.node.clone(),
                port: endpoint.port.clone(),
            })
    }

    /// Drops connections whose endpoints no longer resolve. Returns how many were dropped.
    pub fn prune_dangling_connections(&mut self) -> usize {
        let before = self.connections.len();
        let nodes = &self.nodes;
        self.connections.retain(|c| {
            let resolves = |e: &Endpoint| {
                nodes
                    .iter()
                    .find(|n| n.id == e.node)
                    .is_some_and(|n| n.port(&e.port).is_some())
            };
            resolves(&c.source) && resolves(&c.target)
        });
        before - self.connections.len()
    }

    /// Topmost node whose bounds contain `point`.
    pub fn node_at(&self, point: Vec2) -> Option<&Node> {
        self.nodes.iter().rev().find(|n| n.bounds().contains(point))
    }

    /// Topmost canvas object whose bounds contain `point`.
    pub fn object_at(&self, point: Vec2) -> Option<&CanvasObject> {
        self.canvas_objects
            .iter()
            .rev()
            .find(|o| o.bounds().contains(point))
    }

    /// Topmost group whose bottom-right resize handle contains `point`.
    pub fn resize_handle_at(&self, point: Vec2, handle_size: f32) -> Option<&CanvasObject> {
        self.canvas_objects.iter().rev().find(|o| {
            if !o.is_group() {
                return false;
            }
            let corner = o.position + o.size;
            Rect::new(corner - Vec2::splat(handle_size), Vec2::splat(handle_size)).contains(point)
        })
    }

    /// Closest port within `radius` of `point`.
    pub fn port_at(&self, point: Vec2, radius: f32) -> Option<(Endpoint, PortDirection)> {
        self.nearest_port(point, radius, |_, _| true)
    }

    /// Closest port within `radius` of `point` accepted by `filter`.
    ///
    /// Ties go to the node drawn on top.
    pub fn nearest_port<F>(
        &self,
        point: Vec2,
        radius: f32,
        filter: F,
    ) -> Option<(Endpoint, PortDirection)>
    where
        F: Fn(&Node, PortDirection) -> bool,
    {
        let mut best: Option<(Endpoint, PortDirection, f32)> = None;
        for node in self.nodes.iter().rev() {
            for (dir, port, pos) in node.port_anchors() {
                if !filter(node, dir) {
                    continue;
                }
                let dist = pos.distance(point);
                if dist <= radius && best.as_ref().is_none_or(|(_, _, d)| dist < *d) {
                    best = Some((Endpoint::new(node.id.clone(), port.id.clone()), dir, dist));
                }
            }
        }
        best.map(|(endpoint, dir, _)| (endpoint, dir))
    }

    /// Ids of all nodes whose bounds intersect `rect`.
    pub fn nodes_in_rect(&self, rect: &Rect) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.bounds().intersects(rect))
            .map(|n| n.id.clone())
            .collect()
    }
}
