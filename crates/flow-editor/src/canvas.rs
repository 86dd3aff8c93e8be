//! `FlowCanvas`: the controller that owns a canvas and routes host events.
//!
//! The host forwards every pointer, wheel and key event (with its clock) to
//! [`FlowCanvas::handle`], calls [`FlowCanvas::tick`] from its animation
//! loop, and reads the store for rendering. All state lives here; there are
//! no globals and no background tasks.

use crate::commands::CommandStack;
use crate::connect::{ConnectionDrag, ConnectionPreview, DragSource};
use crate::drag::{DragRelease, NodeDrag};
use crate::hover::HoverIntent;
use crate::input::{InputEvent, Modifiers, PointerButton, PointerTarget};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::store::CanvasStore;
use crate::viewport::TransformController;
use flow_core::hit::{find_connection_at_point, nodes_in_rect};
use flow_core::{
    Bounds, CanvasConfig, CanvasSize, CanvasSnapshot, ConnectionId, ConnectionPath,
    ConnectionType, NodeId, NodePatch, Point, Vec2, find_node_at_point,
};
use serde::Serialize;

/// Rubber-band selection in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Marquee {
    start: Point,
    start_screen: Point,
    current: Point,
    additive: bool,
}

/// What an event did, for the host to react to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasResponse {
    /// Persistent state (graph, viewport, selection) changed.
    pub changed: bool,
    /// Something visible changed, including previews and hover.
    pub redraw: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_node: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_connection: Option<ConnectionId>,
    /// A connection drag committed and created this connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<ConnectionId>,
    /// The host should not run its own click handler.
    pub click_suppressed: bool,
    /// Description of the step an undo/redo shortcut reverted or reapplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
}

pub struct FlowCanvas {
    store: CanvasStore,
    history: CommandStack,
    node_drag: NodeDrag,
    connection_drag: ConnectionDrag,
    hover: HoverIntent,
    marquee: Option<Marquee>,
    space_held: bool,
}

impl Default for FlowCanvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl FlowCanvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            history: CommandStack::new(config.undo_depth),
            node_drag: NodeDrag::new(&config),
            connection_drag: ConnectionDrag::new(&config),
            hover: HoverIntent::new(&config),
            store: CanvasStore::new(config),
            marquee: None,
            space_held: false,
        }
    }

    /// Create a canvas showing `snapshot`, with empty history.
    pub fn from_snapshot(snapshot: CanvasSnapshot, config: CanvasConfig) -> Self {
        let mut canvas = Self::new(config);
        canvas.store.import_canvas(snapshot);
        canvas
    }

    // ─── State access ────────────────────────────────────────────────────

    pub fn store(&self) -> &CanvasStore {
        &self.store
    }

    /// Direct store access. Graph edits made through this bypass undo
    /// history; prefer [`FlowCanvas::edit`] for those.
    pub fn store_mut(&mut self) -> &mut CanvasStore {
        &mut self.store
    }

    /// Run a recorded (undoable) edit.
    pub fn edit<T>(&mut self, description: &str, edit: impl FnOnce(&mut CanvasStore) -> T) -> T {
        self.history.execute(&mut self.store, description, edit)
    }

    pub fn undo(&mut self) -> Option<String> {
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> Option<String> {
        self.history.redo(&mut self.store)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Replace the canvas content and forget history.
    pub fn load(&mut self, snapshot: CanvasSnapshot) {
        self.teardown();
        self.store.import_canvas(snapshot);
        self.history.clear();
    }

    /// Parse and load a JSON snapshot. On error nothing changes.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input.
    pub fn load_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let snapshot = CanvasSnapshot::from_json(json)?;
        self.load(snapshot);
        Ok(())
    }

    pub fn resize(&mut self, size: CanvasSize) {
        self.store.resize(size);
    }

    /// Host reports whether the space bar is held (space + drag pans).
    pub fn set_space_held(&mut self, held: bool) {
        self.space_held = held;
    }

    pub fn connection_preview(&self) -> Option<&ConnectionPreview> {
        self.connection_drag.preview()
    }

    pub fn connection_preview_path(&self) -> Option<ConnectionPath> {
        self.connection_drag.preview_path(ConnectionType::default())
    }

    /// Marquee rectangle in canvas space while a box selection is dragged.
    pub fn marquee(&self) -> Option<Bounds> {
        self.marquee
            .filter(|m| m.start != m.current)
            .map(|m| Bounds::from_corners(m.start, m.current))
    }

    pub fn hovered_node(&self) -> Option<NodeId> {
        self.hover.hovered()
    }

    /// Pointer entered the hovered node's floating actions; keep them shown.
    pub fn hold_hover(&mut self) {
        self.hover.hold();
    }

    /// Pointer left the floating actions; hide after the usual delay.
    pub fn release_hover(&mut self, now: f64) {
        self.hover.leave(now);
    }

    pub fn is_dragging_node(&self) -> bool {
        self.node_drag.is_dragging()
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Route one host event.
    pub fn handle(&mut self, event: InputEvent) -> CanvasResponse {
        let revision = self.store.revision();
        let mut response = CanvasResponse::default();
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
                target,
                time_ms,
            } => self.pointer_down(Point::new(x, y), button, modifiers, target, time_ms, &mut response),
            InputEvent::PointerMove { x, y, time_ms, .. } => {
                self.pointer_move(Point::new(x, y), time_ms, &mut response);
            }
            InputEvent::PointerUp { x, y, time_ms, .. } => {
                self.pointer_up(Point::new(x, y), time_ms, &mut response);
            }
            InputEvent::PointerCancel { .. } => {
                response.redraw = self.cancel_gestures();
            }
            InputEvent::Click { time_ms, .. } => {
                response.click_suppressed = !self.node_drag.accept_click(time_ms);
            }
            InputEvent::Wheel {
                x,
                y,
                dx,
                dy,
                modifiers,
            } => {
                self.store
                    .handle_wheel(Point::new(x, y), Vec2::new(dx, dy), modifiers);
            }
            InputEvent::Key { key, modifiers } => {
                if let Some(action) = ShortcutMap::resolve(&key, modifiers) {
                    self.run_action(action, &mut response);
                }
            }
        }
        response.changed = self.store.revision() != revision;
        response.redraw |= response.changed;
        response
    }

    fn pointer_down(
        &mut self,
        screen: Point,
        button: PointerButton,
        modifiers: Modifiers,
        target: PointerTarget,
        now: f64,
        response: &mut CanvasResponse,
    ) {
        if TransformController::is_pan_trigger(button, modifiers, self.space_held) {
            self.store.begin_pan(screen);
            return;
        }
        if button != PointerButton::Primary {
            return;
        }
        // A press always starts a fresh gesture.
        self.cancel_gestures();

        let canvas = self.store.transform().screen_to_canvas(screen);
        match target {
            PointerTarget::PlusIndicator { node } => {
                response.redraw = self
                    .connection_drag
                    .begin(DragSource::PlusIndicator { node }, self.store.nodes());
            }
            PointerTarget::Port {
                node,
                port,
                port_kind,
            } => {
                let source = DragSource::Port {
                    node,
                    port,
                    port_kind,
                };
                response.redraw = self.connection_drag.begin(source, self.store.nodes());
            }
            PointerTarget::Canvas => {
                match find_node_at_point(canvas, self.store.nodes(), None, 0.0).map(|n| n.id) {
                    Some(id) => {
                        let origins = self.drag_origins(id);
                        self.node_drag
                            .pointer_down(id, screen, now, modifiers.multi_select(), origins);
                    }
                    None => {
                        self.marquee = Some(Marquee {
                            start: canvas,
                            start_screen: screen,
                            current: canvas,
                            additive: modifiers.multi_select(),
                        });
                    }
                }
            }
        }
    }

    /// Nodes that move when `id` is dragged: the whole selection if `id`
    /// is part of it, else just `id`. Locked nodes stay behind.
    fn drag_origins(&self, id: NodeId) -> Vec<(NodeId, Point)> {
        let group: Vec<NodeId> = if self.store.selection().contains(id) {
            self.store.selection().ids().to_vec()
        } else {
            vec![id]
        };
        group
            .into_iter()
            .filter_map(|g| self.store.node(g))
            .filter(|n| !n.is_locked)
            .map(|n| (n.id, n.position))
            .collect()
    }

    fn pointer_move(&mut self, screen: Point, now: f64, response: &mut CanvasResponse) {
        if self.store.transform().is_panning() {
            self.store.update_pan(screen);
            return;
        }
        let canvas = self.store.transform().screen_to_canvas(screen);

        if self.connection_drag.is_active() {
            response.redraw = self.connection_drag.update(
                canvas,
                self.store.nodes(),
                self.store.connections(),
                now,
            );
            return;
        }

        if self.node_drag.is_active() {
            if self.node_drag.pointer_move(screen) {
                self.history.begin_batch(&self.store, "Move nodes");
                self.hover.clear();
            }
            let zoom = self.store.viewport().zoom;
            for (id, position) in self.node_drag.positions(screen, zoom) {
                self.store.move_node(id, position);
            }
            return;
        }

        if let Some(marquee) = self.marquee.as_mut() {
            marquee.current = canvas;
            response.redraw = true;
            return;
        }

        match find_node_at_point(canvas, self.store.nodes(), None, 0.0).map(|n| n.id) {
            Some(id) => response.redraw = self.hover.enter(id),
            None => self.hover.leave(now),
        }
    }

    fn pointer_up(&mut self, screen: Point, now: f64, response: &mut CanvasResponse) {
        if self.store.end_pan() {
            return;
        }
        let canvas = self.store.transform().screen_to_canvas(screen);

        if self.connection_drag.is_active() {
            let resolved =
                self.connection_drag
                    .finish(canvas, self.store.nodes(), self.store.connections(), now);
            if let Some((from, to)) = resolved {
                let added = self.history.execute(&mut self.store, "Connect nodes", |s| {
                    s.add_connection(from, to, ConnectionType::default(), None, None)
                });
                match added {
                    Ok(id) => response.connected = Some(id),
                    Err(reason) => log::debug!("drop on {to} rejected: {reason}"),
                }
            }
            response.redraw = true;
            return;
        }

        match self.node_drag.pointer_up(now) {
            DragRelease::None => {}
            DragRelease::Click { node, multi } => {
                self.store.select_node(node, multi);
                response.clicked_node = Some(node);
                return;
            }
            DragRelease::Dropped { node, moved } => {
                log::trace!("drag of {node} dropped, {} node(s) moved", moved.len());
                self.history.end_batch(&self.store);
                return;
            }
        }

        if let Some(marquee) = self.marquee.take() {
            response.redraw = true;
            let travel = (screen - marquee.start_screen).hypot();
            if travel <= self.store.config().drag_threshold {
                // Background click.
                let tolerance = self.store.config().connection_hit_tolerance;
                response.clicked_connection =
                    find_connection_at_point(canvas, &self.store.routed_connections(), tolerance);
                if !marquee.additive {
                    self.store.clear_selection();
                }
                return;
            }
            let hits = nodes_in_rect(Bounds::from_corners(marquee.start, canvas), self.store.nodes());
            if marquee.additive {
                self.store.extend_selection(hits);
            } else {
                self.store.set_selection(hits);
            }
        }
    }

    fn run_action(&mut self, action: ShortcutAction, response: &mut CanvasResponse) {
        log::trace!("shortcut {action:?}");
        match action {
            ShortcutAction::Undo => response.history = self.undo(),
            ShortcutAction::Redo => response.history = self.redo(),
            ShortcutAction::Delete => {
                let ids = self.store.selection().ids().to_vec();
                if !ids.is_empty() {
                    self.edit("Delete nodes", |s| s.remove_nodes(&ids));
                }
            }
            ShortcutAction::SelectAll => {
                self.store.select_all();
            }
            ShortcutAction::Duplicate => {
                let ids = self.store.selection().ids().to_vec();
                let copies: Vec<NodeId> = self.edit("Duplicate nodes", |s| {
                    ids.iter().filter_map(|id| s.duplicate_node(*id)).collect()
                });
                if !copies.is_empty() {
                    self.store.set_selection(copies);
                }
            }
            ShortcutAction::ZoomIn => {
                self.store.zoom_in();
            }
            ShortcutAction::ZoomOut => {
                self.store.zoom_out();
            }
            ShortcutAction::ZoomToFit => {
                self.store.zoom_to_fit();
            }
            ShortcutAction::ResetView => {
                self.store.reset_view();
            }
            ShortcutAction::Deselect => {
                response.redraw = self.cancel_gestures();
                self.store.clear_selection();
            }
        }
    }

    /// Abort every gesture in progress. A node drag is rolled back.
    fn cancel_gestures(&mut self) -> bool {
        let mut cancelled = self.connection_drag.cancel();
        cancelled |= self.marquee.take().is_some();
        cancelled |= self.store.end_pan();

        let was_dragging = self.node_drag.is_dragging();
        for (id, position) in self.node_drag.cancel() {
            self.store.update_node(
                id,
                NodePatch {
                    position: Some(position),
                    ..Default::default()
                },
            );
        }
        if was_dragging {
            self.history.end_batch(&self.store);
            cancelled = true;
        }
        cancelled
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Fire due timers. Returns true if anything visible changed.
    pub fn tick(&mut self, now: f64) -> bool {
        let suppression = self.node_drag.tick(now);
        let grace = self.connection_drag.tick(now);
        let hover = self.hover.tick(now);
        if suppression || grace {
            log::trace!("timers fired at {now}");
        }
        hover
    }

    /// Cancel every gesture and pending timer (canvas unmount).
    pub fn teardown(&mut self) {
        self.cancel_gestures();
        self.hover.clear();
    }
}
