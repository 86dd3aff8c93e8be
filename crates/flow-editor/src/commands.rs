//! Undo/Redo command stack.
//!
//! Every recorded edit captures the graph (nodes + connections) before and
//! after it ran; undo and redo swap the whole graph back in. Viewport and
//! selection are not part of history.
//!
//! Drag gestures use **batching**: the graph is captured when the gesture
//! starts and when it ends, so a drag that fired hundreds of `move_node`
//! calls undoes in a single step.

use crate::store::{CanvasStore, GraphState};

/// One undoable step.
#[derive(Debug, Clone)]
pub struct Command {
    before: GraphState,
    after: GraphState,
    description: String,
}

impl Command {
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
#[derive(Debug, Clone)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Graph captured at the start of the outermost batch.
    batch_snapshot: Option<(GraphState, String)>,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(128)),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_snapshot: None,
        }
    }

    fn push(&mut self, cmd: Command) {
        log::debug!("recorded `{}`", cmd.description);
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Run `edit` against the store and record it if the graph changed.
    /// Inside a batch the edit is applied live and folded into the batch.
    pub fn execute<T>(
        &mut self,
        store: &mut CanvasStore,
        description: &str,
        edit: impl FnOnce(&mut CanvasStore) -> T,
    ) -> T {
        if self.batch_depth > 0 {
            return edit(store);
        }
        let before = store.graph_state();
        let result = edit(store);
        let after = store.graph_state();
        if before != after {
            self.push(Command {
                before,
                after,
                description: description.to_string(),
            });
        }
        result
    }

    /// Start a batch group. Nested calls only bump the depth; the outermost
    /// description wins.
    pub fn begin_batch(&mut self, store: &CanvasStore, description: &str) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some((store.graph_state(), description.to_string()));
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the graph
    /// changed, one command is pushed.
    pub fn end_batch(&mut self, store: &CanvasStore) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let Some((before, description)) = self.batch_snapshot.take() else {
            return;
        };
        let after = store.graph_state();
        if before != after {
            self.push(Command {
                before,
                after,
                description,
            });
        }
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Undo the last command. Returns its description.
    pub fn undo(&mut self, store: &mut CanvasStore) -> Option<String> {
        if self.in_batch() {
            log::warn!("undo requested during a gesture, ignoring");
            return None;
        }
        let cmd = self.undo_stack.pop()?;
        store.restore_graph(cmd.before.clone());
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone command. Returns its description.
    pub fn redo(&mut self, store: &mut CanvasStore) -> Option<String> {
        if self.in_batch() {
            return None;
        }
        let cmd = self.redo_stack.pop()?;
        store.restore_graph(cmd.after.clone());
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop all history (after an import, for instance).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }
}
