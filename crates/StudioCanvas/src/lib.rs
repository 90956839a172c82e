//! # StudioCanvas
//!
//! `studio_canvas` is the headless core of the workflow editor. It holds the
//! canvas document, undo/redo history and pointer/keyboard gesture logic, and
//! leaves drawing to the host application.
//!
//! ## Core Architecture
//! - **Model (`src/model.rs`)**: Nodes, ports, connections and canvas objects as plain data.
//! - **History (`src/history.rs`)**: Bounded snapshot history with producer-style edits.
//! - **View (`src/view.rs`)**: Client <-> canvas coordinate transforms, zoom and scroll.
//! - **Interaction (`src/interaction.rs`)**: The gesture state machine.
//! - **Editor (`src/editor.rs`)**: The façade a host talks to.

pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod input;
pub mod interaction;
pub mod math;
pub mod model;
pub mod persistence;
pub mod selection;
pub mod view;

// Re-exports for convenience
pub use catalog::{NodeCatalog, NodeDefinition, PortSchema};
pub use config::CanvasConfig;
pub use editor::Editor;
pub use error::CanvasError;
pub use history::History;
pub use interaction::{InteractionMode, LogicEvent, Overlay};
pub use model::{
    CanvasObject, CanvasObjectKind, CanvasState, Connection, ConnectionId, Endpoint, Node,
    NodeFlags, NodeId, ObjectId, Port, PortDirection, PortId,
};
pub use persistence::{DocumentMeta, WorkflowDocument};
pub use selection::Selection;
pub use view::Viewport;
