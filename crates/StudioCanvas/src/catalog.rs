//! # Node Catalog
//!
//! Node definitions as served by the backend, grouped by category for the
//! palette. A definition knows how to instantiate a canvas `Node` with its
//! declared ports.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::model::{Node, Port};

/// Declared port of a node type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortSchema {
    pub name: String,
    #[serde(default = "any_type")]
    pub data_type: String,
}

fn any_type() -> String {
    "any".to_string()
}

/// A node type available in the palette.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub node_type: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<PortSchema>,
    #[serde(default)]
    pub outputs: Vec<PortSchema>,
    /// Configuration a new node starts with.
    #[serde(default)]
    pub default_config: Value,
}

impl NodeDefinition {
    /// Creates a fresh node of this type at `position`, with one port per declared schema.
    pub fn instantiate(&self, position: Vec2) -> Node {
        let config = if self.default_config.is_null() {
            Value::Object(Default::default())
        } else {
            self.default_config.clone()
        };

        let mut node = Node::new(self.node_type.clone(), position)
            .with_name(self.name.clone())
            .with_config(config);
        node.inputs = self
            .inputs
            .iter()
            .map(|p| Port::new(p.name.clone(), p.data_type.clone()))
            .collect();
        node.outputs = self
            .outputs
            .iter()
            .map(|p| Port::new(p.name.clone(), p.data_type.clone()))
            .collect();
        node
    }
}

/// Definitions grouped by category, both sorted for stable palette order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeCatalog {
    categories: BTreeMap<String, Vec<NodeDefinition>>,
}

impl NodeCatalog {
    pub fn from_definitions(definitions: impl IntoIterator<Item = NodeDefinition>) -> Self {
        let mut categories: BTreeMap<String, Vec<NodeDefinition>> = BTreeMap::new();
        for def in definitions {
            categories.entry(def.category.clone()).or_default().push(def);
        }
        for defs in categories.values_mut() {
            defs.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Self { categories }
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[NodeDefinition])> {
        self.categories
            .iter()
            .map(|(name, defs)| (name.as_str(), defs.as_slice()))
    }

    pub fn get(&self, node_type: &str) -> Option<&NodeDefinition> {
        self.categories
            .values()
            .flatten()
            .find(|d| d.node_type == node_type)
    }

    /// Case-insensitive match on name, type or description.
    pub fn search<'a>(&'a self, query: &str) -> Vec<&'a NodeDefinition> {
        let query = query.trim().to_lowercase();
        self.categories
            .values()
            .flatten()
            .filter(|d| {
                query.is_empty()
                    || d.name.to_lowercase().contains(&query)
                    || d.node_type.to_lowercase().contains(&query)
                    || d.description.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
