//! Canvas state store: the single source of truth for a canvas.
//!
//! Holds the node list, connection list, viewport and selection, and exposes
//! the mutators the host and the interaction state machines go through.
//! Every mutator is atomic: it either applies fully and returns a truthy
//! result, or leaves the store untouched and returns `false` / `None` /
//! `Err`. Connections are validated before insertion so the graph stays a
//! DAG with no duplicate `(from, to)` pairs.

use crate::input::Modifiers;
use crate::selection::Selection;
use crate::viewport::TransformController;
use flow_core::geometry::route_connections;
use flow_core::validate::{audit_connections, check_connection, neighbors};
use flow_core::{
    AlignDirection, CanvasConfig, CanvasSize, CanvasSnapshot, Connection, ConnectionId,
    ConnectionRejection, ConnectionStyle, ConnectionType, Direction, Node, NodeId, NodePatch,
    Point, RoutedConnection, Vec2, Viewport, ViewportPatch, align_positions, snap_to_grid,
};
use std::collections::HashMap;

/// The part of the store that undo/redo snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphState {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

/// Owns all persistent canvas state.
#[derive(Debug, Clone)]
pub struct CanvasStore {
    config: CanvasConfig,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    /// Node ID → index into `nodes`. Rebuilt on structural changes.
    index: HashMap<NodeId, usize>,
    selection: Selection,
    transform: TransformController,
    /// Bumped on every change; hosts compare it to decide when to re-render
    /// or autosave.
    revision: u64,
}

impl Default for CanvasStore {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl CanvasStore {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            transform: TransformController::new(&config),
            config,
            nodes: Vec::new(),
            connections: Vec::new(),
            index: HashMap::new(),
            selection: Selection::new(),
            revision: 0,
        }
    }

    /// Create a store pre-populated from a snapshot.
    pub fn from_snapshot(snapshot: CanvasSnapshot, config: CanvasConfig) -> Self {
        let mut store = Self::new(config);
        store.import_canvas(snapshot);
        store
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let i = *self.index.get(&id)?;
        self.nodes.get_mut(i)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn transform(&self) -> &TransformController {
        &self.transform
    }

    pub fn viewport(&self) -> Viewport {
        self.transform.viewport()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
    }

    fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    fn fresh_node_id(&self, kind: &str) -> NodeId {
        let prefix = if kind.is_empty() { "node" } else { kind };
        loop {
            let id = NodeId::with_prefix(prefix);
            if !self.contains_node(id) {
                return id;
            }
        }
    }

    fn fresh_connection_id(&self) -> ConnectionId {
        loop {
            let id = ConnectionId::with_prefix("conn");
            if self.connection(id).is_none() {
                return id;
            }
        }
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// Append a node on top of the z-order. A colliding ID is replaced by a
    /// fresh one; the ID actually used is returned.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        if self.contains_node(node.id) {
            let fresh = self.fresh_node_id(&node.kind);
            log::debug!("node id {} already in use, assigning {}", node.id, fresh);
            node.id = fresh;
        }
        let id = node.id;
        log::debug!("add node {id} ({})", node.kind);
        self.index.insert(id, self.nodes.len());
        self.nodes.push(node);
        self.touch();
        id
    }

    /// Create and add a default node of `kind` at `position`.
    pub fn create_node(&mut self, kind: &str, position: Point) -> NodeId {
        let id = self.fresh_node_id(kind);
        self.add_node(Node::new(id, kind, position))
    }

    /// Merge a partial update into a node.
    pub fn update_node(&mut self, id: NodeId, patch: NodePatch) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        let hidden_now = patch.is_hidden == Some(true);
        if !patch.apply(node) {
            return false;
        }
        if hidden_now {
            self.selection.remove(id);
        }
        self.touch();
        true
    }

    /// Remove a node, every connection touching it, and its selection entry.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(&i) = self.index.get(&id) else {
            return false;
        };
        self.nodes.remove(i);
        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(id));
        self.selection.remove(id);
        self.rebuild_index();
        self.touch();
        log::debug!(
            "removed node {id} and {} connection(s)",
            before - self.connections.len()
        );
        true
    }

    /// Remove several nodes. Returns how many existed.
    pub fn remove_nodes(&mut self, ids: &[NodeId]) -> usize {
        ids.iter().filter(|&&id| self.remove_node(id)).count()
    }

    /// Copy a node (without its connections) offset by the configured amount.
    pub fn duplicate_node(&mut self, id: NodeId) -> Option<NodeId> {
        let original = self.node(id)?;
        let mut copy = original.clone();
        copy.id = self.fresh_node_id(&original.kind);
        copy.position += Vec2::new(self.config.duplicate_offset, self.config.duplicate_offset);
        copy.is_locked = false;
        Some(self.add_node(copy))
    }

    /// Move a node's top-left corner. Locked nodes stay put. Snaps to the
    /// grid when snapping is enabled.
    pub fn move_node(&mut self, id: NodeId, position: Point) -> bool {
        let snap = self.config.snap_to_grid.then_some(self.config.grid_size);
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if node.is_locked {
            log::trace!("node {id} is locked, not moving");
            return false;
        }
        let position = match snap {
            Some(grid) => snap_to_grid(position, grid),
            None => position,
        };
        if node.position == position {
            return false;
        }
        node.position = position;
        self.touch();
        true
    }

    fn toggle_flag(
        &mut self,
        id: NodeId,
        value: Option<bool>,
        flag: impl FnOnce(&mut Node) -> &mut bool,
    ) -> Option<bool> {
        let node = self.node_mut(id)?;
        let slot = flag(node);
        let next = value.unwrap_or(!*slot);
        if *slot != next {
            *slot = next;
            self.touch();
        }
        Some(next)
    }

    /// Flip (or force) the expanded flag. Returns the new value.
    pub fn toggle_node_expanded(&mut self, id: NodeId, value: Option<bool>) -> Option<bool> {
        self.toggle_flag(id, value, |n| &mut n.is_expanded)
    }

    pub fn toggle_node_locked(&mut self, id: NodeId, value: Option<bool>) -> Option<bool> {
        self.toggle_flag(id, value, |n| &mut n.is_locked)
    }

    /// Flip (or force) visibility. Hidden nodes leave the selection.
    pub fn toggle_node_visibility(&mut self, id: NodeId, visible: Option<bool>) -> Option<bool> {
        let hidden = self.toggle_flag(id, visible.map(|v| !v), |n| &mut n.is_hidden)?;
        if hidden {
            self.selection.remove(id);
        }
        Some(!hidden)
    }

    /// Move a node to the end of the list so it draws (and hit-tests) on top.
    pub fn bring_to_front(&mut self, id: NodeId) -> bool {
        let Some(&i) = self.index.get(&id) else {
            return false;
        };
        if i + 1 == self.nodes.len() {
            return false;
        }
        let node = self.nodes.remove(i);
        self.nodes.push(node);
        self.rebuild_index();
        self.touch();
        true
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Validate a prospective edge against the current graph.
    ///
    /// # Errors
    /// Fails with [`ConnectionRejection::UnknownNode`] for a missing endpoint,
    /// otherwise with whatever [`check_connection`] reports.
    pub fn check_connection(&self, from: NodeId, to: NodeId) -> Result<(), ConnectionRejection> {
        for id in [from, to] {
            if !self.contains_node(id) {
                return Err(ConnectionRejection::UnknownNode(id));
            }
        }
        check_connection(from, to, &self.connections)
    }

    pub fn is_valid_connection(&self, from: NodeId, to: NodeId) -> bool {
        self.check_connection(from, to).is_ok()
    }

    /// Add a validated connection. An explicit `id` must be unused.
    ///
    /// # Errors
    /// Returns why the edge was refused; the store is unchanged.
    pub fn add_connection(
        &mut self,
        from: NodeId,
        to: NodeId,
        kind: ConnectionType,
        id: Option<ConnectionId>,
        label: Option<String>,
    ) -> Result<ConnectionId, ConnectionRejection> {
        if let Err(reason) = self.check_connection(from, to) {
            log::debug!("rejected connection {from} -> {to}: {reason}");
            return Err(reason);
        }
        let id = match id {
            Some(id) if self.connection(id).is_some() => {
                return Err(ConnectionRejection::IdInUse);
            }
            Some(id) => id,
            None => self.fresh_connection_id(),
        };
        let mut conn = Connection::new(id, from, to, kind);
        conn.label = label;
        log::debug!("add connection {id}: {from} -> {to}");
        self.connections.push(conn);
        self.touch();
        Ok(id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let len = self.connections.len();
        self.connections.retain(|c| c.id != id);
        let removed = self.connections.len() != len;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn update_connection_type(&mut self, id: ConnectionId, kind: ConnectionType) -> bool {
        let Some(conn) = self.connection_mut(id) else {
            return false;
        };
        if conn.kind == kind {
            return false;
        }
        conn.kind = kind;
        self.touch();
        true
    }

    /// Set or clear (`None` or empty) a connection's label.
    pub fn update_connection_label(&mut self, id: ConnectionId, label: Option<String>) -> bool {
        let label = label.filter(|l| !l.is_empty());
        let Some(conn) = self.connection_mut(id) else {
            return false;
        };
        if conn.label == label {
            return false;
        }
        conn.label = label;
        self.touch();
        true
    }

    pub fn update_connection_style(&mut self, id: ConnectionId, style: ConnectionStyle) -> bool {
        let style = (style != ConnectionStyle::default()).then_some(style);
        let Some(conn) = self.connection_mut(id) else {
            return false;
        };
        if conn.style == style {
            return false;
        }
        conn.style = style;
        self.touch();
        true
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn connections_for_node(&self, id: NodeId, direction: Direction) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| direction.matches(c, id))
            .collect()
    }

    /// Nodes one hop away from `id`, skipping dangling references.
    pub fn connected_nodes(&self, id: NodeId, direction: Direction) -> Vec<&Node> {
        neighbors(&self.connections, id, direction)
            .into_iter()
            .filter_map(|n| self.node(n))
            .collect()
    }

    pub fn has_outgoing_connections(&self, id: NodeId) -> bool {
        self.connections.iter().any(|c| c.from == id)
    }

    pub fn has_incoming_connections(&self, id: NodeId) -> bool {
        self.connections.iter().any(|c| c.to == id)
    }

    /// Paths for every renderable connection.
    pub fn routed_connections(&self) -> Vec<RoutedConnection> {
        route_connections(&self.nodes, &self.connections)
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    fn viewport_op(&mut self, op: impl FnOnce(&mut TransformController) -> bool) -> bool {
        let changed = op(&mut self.transform);
        if changed {
            self.touch();
        }
        changed
    }

    pub fn zoom_in(&mut self) -> bool {
        self.viewport_op(TransformController::zoom_in)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.viewport_op(TransformController::zoom_out)
    }

    pub fn reset_view(&mut self) -> bool {
        self.viewport_op(TransformController::reset_view)
    }

    pub fn zoom_to_fit(&mut self) -> bool {
        let changed = self.transform.zoom_to_fit(&self.nodes);
        if changed {
            self.touch();
        }
        changed
    }

    pub fn set_viewport(&mut self, patch: ViewportPatch) -> bool {
        self.viewport_op(|t| t.set_viewport(patch))
    }

    pub fn resize(&mut self, size: CanvasSize) {
        self.transform.resize(size);
    }

    /// Zoom by `factor` around a screen point.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> bool {
        self.viewport_op(|t| t.zoom_at(screen, factor))
    }

    pub fn handle_wheel(&mut self, cursor: Point, delta: Vec2, modifiers: Modifiers) -> bool {
        self.viewport_op(|t| t.handle_wheel(cursor, delta, modifiers))
    }

    pub fn begin_pan(&mut self, screen: Point) {
        self.transform.begin_pan(screen);
    }

    pub fn update_pan(&mut self, screen: Point) -> bool {
        self.viewport_op(|t| t.update_pan(screen))
    }

    /// Returns true if a pan was in progress.
    pub fn end_pan(&mut self) -> bool {
        self.transform.end_pan()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Replace or toggle the selection. Unknown or hidden nodes are ignored.
    pub fn select_node(&mut self, id: NodeId, multi: bool) -> bool {
        if !self.node(id).is_some_and(|n| !n.is_hidden) {
            return false;
        }
        let changed = self.selection.select(id, multi);
        if changed {
            self.touch();
        }
        changed
    }

    /// Replace the selection with the given visible nodes.
    pub fn set_selection(&mut self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        let ids: Vec<NodeId> = ids
            .into_iter()
            .filter(|id| self.node(*id).is_some_and(|n| !n.is_hidden))
            .collect();
        let changed = self.selection.set(ids);
        if changed {
            self.touch();
        }
        changed
    }

    /// Add the given visible nodes to the selection.
    pub fn extend_selection(&mut self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        let mut next = self.selection.ids().to_vec();
        next.extend(ids);
        self.set_selection(next)
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.selection.clear();
        if changed {
            self.touch();
        }
        changed
    }

    pub fn select_all(&mut self) -> bool {
        let ids: Vec<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        self.set_selection(ids)
    }

    /// Align nodes against their shared bounding box. Locked nodes count
    /// toward the box but are not moved. Fewer than two nodes is a no-op.
    pub fn align_nodes(&mut self, ids: &[NodeId], direction: AlignDirection) -> bool {
        let targets = {
            let nodes: Vec<&Node> = ids.iter().filter_map(|id| self.node(*id)).collect();
            align_positions(&nodes, direction)
        };
        let mut moved = false;
        for (id, position) in targets {
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            if node.is_locked || node.position == position {
                continue;
            }
            node.position = position;
            moved = true;
        }
        if moved {
            self.touch();
        }
        moved
    }

    pub fn align_selected(&mut self, direction: AlignDirection) -> bool {
        let ids = self.selection.ids().to_vec();
        self.align_nodes(&ids, direction)
    }

    // ─── Snapshots ───────────────────────────────────────────────────────

    pub fn export_canvas(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
            viewport: self.transform.viewport(),
            selected_nodes: self.selection.ids().to_vec(),
        }
    }

    /// Replace the whole canvas. Duplicate node IDs keep their first
    /// occurrence. Connections are replayed through the same checks as
    /// [`CanvasStore::add_connection`]; self-loops, duplicates, cycles and
    /// reused IDs are dropped, dangling connections are kept but reported.
    pub fn import_canvas(&mut self, snapshot: CanvasSnapshot) {
        let CanvasSnapshot {
            nodes,
            connections,
            viewport,
            selected_nodes,
        } = snapshot;

        self.nodes.clear();
        self.index.clear();
        for node in nodes {
            if self.contains_node(node.id) {
                log::warn!("import: duplicate node id {}, dropping", node.id);
                continue;
            }
            self.index.insert(node.id, self.nodes.len());
            self.nodes.push(node);
        }

        let index = &self.index;
        let audit = audit_connections(connections, |id| index.contains_key(&id));
        for (conn, reason) in &audit.rejected {
            log::warn!(
                "import: dropping connection {} ({} -> {}): {reason}",
                conn.id,
                conn.from,
                conn.to
            );
        }
        for (conn, end) in &audit.dangling {
            log::warn!("import: connection {conn} references missing node {end}");
        }
        self.connections = audit.accepted;

        self.transform.replace(viewport);
        self.selection.clear();
        self.selection
            .extend(selected_nodes.into_iter().filter(|id| self.index.contains_key(id)));
        self.touch();
        log::debug!(
            "imported {} node(s), {} connection(s)",
            self.nodes.len(),
            self.connections.len()
        );
    }

    /// Serialize the canvas to its persisted JSON layout.
    ///
    /// # Errors
    /// Propagates `serde_json` serialization failures.
    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.export_canvas())
    }

    /// Parse and import a JSON snapshot. On error the store is unchanged.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input.
    pub fn import_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let snapshot = CanvasSnapshot::from_json(json).inspect_err(|e| {
            log::warn!("import rejected: {e}");
        })?;
        self.import_canvas(snapshot);
        Ok(())
    }

    /// Remove every node and connection and reset the view.
    pub fn clear_canvas(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.index.clear();
        self.selection.clear();
        self.transform.reset_view();
        self.touch();
    }

    // ─── Undo support ────────────────────────────────────────────────────

    pub fn graph_state(&self) -> GraphState {
        GraphState {
            nodes: self.nodes.clone(),
            connections: self.connections.clone(),
        }
    }

    /// Restore nodes and connections; selection entries for nodes that no
    /// longer exist are dropped.
    pub fn restore_graph(&mut self, state: GraphState) {
        self.nodes = state.nodes;
        self.connections = state.connections;
        self.rebuild_index();
        let index = &self.index;
        self.selection.retain(|id| index.contains_key(id));
        self.touch();
    }
}
