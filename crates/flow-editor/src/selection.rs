//! Node selection bookkeeping.

use flow_core::NodeId;

/// Selected node IDs in insertion order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: Vec<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Click semantics: `multi` toggles membership, otherwise the selection
    /// is replaced by `id`. Returns true if the selection changed.
    pub fn select(&mut self, id: NodeId, multi: bool) -> bool {
        if multi {
            if let Some(pos) = self.ids.iter().position(|s| *s == id) {
                self.ids.remove(pos);
            } else {
                self.ids.push(id);
            }
            return true;
        }
        if self.ids.as_slice() == [id] {
            return false;
        }
        self.ids.clear();
        self.ids.push(id);
        true
    }

    /// Replace the selection wholesale (marquee, select-all, import).
    pub fn set(&mut self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        let before = std::mem::take(&mut self.ids);
        self.extend(ids);
        before != self.ids
    }

    /// Add IDs not already selected.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        let len = self.ids.len();
        self.ids.retain(|s| *s != id);
        self.ids.len() != len
    }

    pub fn retain(&mut self, keep: impl FnMut(&NodeId) -> bool) {
        self.ids.retain(keep);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
