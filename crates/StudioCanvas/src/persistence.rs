use serde::{Deserialize, Serialize};

use crate::error::CanvasError;
use crate::model::{CanvasObject, CanvasState, Connection, Node};

/// Identity and descriptive fields of a workflow, independent of its canvas.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// Backend id; `None` until the first save is acknowledged.
    pub id: Option<String>,
    pub name: String,
    pub description: String,
}

impl DocumentMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
        }
    }
}

/// The workflow document exchanged with the backend.
///
/// This is the durable copy of a `CanvasState`; selection is editor-local and
/// is not part of it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub canvas_objects: Vec<CanvasObject>,
}

impl WorkflowDocument {
    /// Serializes a canvas snapshot together with its metadata.
    pub fn from_state(meta: &DocumentMeta, state: &CanvasState) -> Self {
        Self {
            id: meta.id.clone(),
            name: meta.name.clone(),
            description: meta.description.clone(),
            nodes: state.nodes.clone(),
            connections: state.connections.clone(),
            canvas_objects: state.canvas_objects.clone(),
        }
    }

    pub fn meta(&self) -> DocumentMeta {
        DocumentMeta {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    /// Splits the document into metadata and a canvas snapshot.
    ///
    /// Connections referencing missing nodes or ports are dropped.
    pub fn into_state(self) -> (DocumentMeta, CanvasState) {
        let meta = self.meta();
        let mut state = CanvasState {
            nodes: self.nodes,
            connections: self.connections,
            canvas_objects: self.canvas_objects,
            selected_node_id: None,
        };

        let dropped = state.prune_dangling_connections();
        if dropped > 0 {
            tracing::warn!(
                workflow_id = ?meta.id,
                dropped,
                "Dropped connections referencing missing nodes or ports"
            );
        }
        (meta, state)
    }

    /// A copy of this document that the backend will store as a new workflow.
    pub fn fork(&self, name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn to_json(&self) -> Result<String, CanvasError> {
        serde_json::to_string(self).map_err(|e| CanvasError::InvalidDocument(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        serde_json::from_str(json).map_err(|e| CanvasError::InvalidDocument(e.to_string()))
    }
}
