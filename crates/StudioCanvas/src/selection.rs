use crate::model::{CanvasState, NodeId};

/// The set of selected nodes.
///
/// Selection is transient editor state: it is not recorded in history. The
/// primary node is the one most recently clicked, mirrored into the snapshot's
/// `selected_node_id` only by edits that explicitly select something.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    ids: Vec<NodeId>,
    primary: Option<NodeId>,
}

impl Selection {
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn primary(&self) -> Option<&NodeId> {
        self.primary.as_ref()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replaces the selection with a single node.
    pub fn select_only(&mut self, id: NodeId) {
        self.ids.clear();
        self.ids.push(id.clone());
        self.primary = Some(id);
    }

    /// Adds or removes one node. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: NodeId) -> bool {
        if let Some(idx) = self.ids.iter().position(|s| s == &id) {
            self.ids.remove(idx);
            if self.primary.as_ref() == Some(&id) {
                self.primary = self.ids.last().cloned();
            }
            false
        } else {
            self.ids.push(id.clone());
            self.primary = Some(id);
            true
        }
    }

    /// Replaces the whole set. Returns true if membership changed.
    pub fn set(&mut self, ids: Vec<NodeId>) -> bool {
        let changed = ids.len() != self.ids.len() || ids.iter().any(|id| !self.ids.contains(id));
        self.ids = ids;
        if self
            .primary
            .as_ref()
            .is_none_or(|p| !self.ids.contains(p))
        {
            self.primary = self.ids.last().cloned();
        }
        changed
    }

    /// Clears the selection. Returns true if anything was selected.
    pub fn clear(&mut self) -> bool {
        self.primary = None;
        let had_any = !self.ids.is_empty();
        self.ids.clear();
        had_any
    }

    /// Forgets ids that no longer exist in `state`.
    pub fn retain_existing(&mut self, state: &CanvasState) {
        self.ids.retain(|id| state.node(id).is_some());
        if self
            .primary
            .as_ref()
            .is_some_and(|p| state.node(p).is_none())
        {
            self.primary = self.ids.last().cloned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_moves_primary_to_remaining_node() {
        let mut selection = Selection::default();
        selection.select_only(NodeId::from("a"));
        assert!(selection.toggle(NodeId::from("b")));
        assert_eq!(selection.primary(), Some(&NodeId::from("b")));

        assert!(!selection.toggle(NodeId::from("b")));
        assert_eq!(selection.ids(), &[NodeId::from("a")]);
        assert_eq!(selection.primary(), Some(&NodeId::from("a")));
    }

    #[test]
    fn set_reports_membership_changes_only() {
        let mut selection = Selection::default();
        assert!(selection.set(vec![NodeId::from("a"), NodeId::from("b")]));
        assert!(!selection.set(vec![NodeId::from("b"), NodeId::from("a")]));
        assert!(selection.set(vec![]));
        assert!(selection.primary().is_none());
    }
}
