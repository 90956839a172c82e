use thiserror::Error;

use crate::model::{ConnectionId, NodeId, ObjectId, PortId};

/// Errors raised by canvas edits that reference missing or incompatible entities.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CanvasError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("node already exists: {0}")]
    DuplicateNode(NodeId),
    #[error("port {port} not found on node {node}")]
    PortNotFound { node: NodeId, port: PortId },
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
    #[error("canvas object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("cannot connect node {0} to itself")]
    SelfConnection(NodeId),
    #[error("connection already exists")]
    DuplicateConnection,
    #[error("ports are incompatible: a connection must run from an output to an input")]
    IncompatiblePorts,
    #[error("node {0} is locked")]
    NodeLocked(NodeId),
    #[error("canvas object {0} is not a {1}")]
    WrongObjectKind(ObjectId, &'static str),
    #[error("invalid workflow document: {0}")]
    InvalidDocument(String),
}
