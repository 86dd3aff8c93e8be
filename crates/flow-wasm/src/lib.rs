//! WASM bridge for Flow Canvas: exposes the canvas engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Everything crosses the
//! boundary as numbers, strings, or JSON strings, so the host never has to
//! mirror Rust types. Mutating calls return `bool` (did anything change) or
//! a JSON object with an `ok` field.

mod console;

use flow_core::{
    AlignDirection, CanvasConfig, CanvasSize, CanvasSnapshot, ConnectionId, ConnectionRejection,
    ConnectionStyle, ConnectionType, Direction, Node, NodeId, NodePatch, Point, PortKind,
    ViewportPatch, audit_connections,
};
use flow_editor::{CanvasResponse, FlowCanvas, InputEvent, Modifiers, PointerButton, PointerTarget};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashSet;
use wasm_bindgen::prelude::*;

/// The main WASM-facing canvas controller.
///
/// Wraps a [`FlowCanvas`]; all interaction from the web host goes through
/// this struct.
#[wasm_bindgen]
pub struct WasmCanvas {
    canvas: FlowCanvas,
}

#[wasm_bindgen]
impl WasmCanvas {
    /// Create a canvas of the given element size. `config_json` is a
    /// (possibly empty or partial) `CanvasConfig` object; invalid config is
    /// reported to the console and replaced by defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, config_json: &str) -> Self {
        console::install_panic_hook();
        console::init_logging(log::LevelFilter::Warn);

        let config = if config_json.trim().is_empty() {
            CanvasConfig::default()
        } else {
            CanvasConfig::from_json(config_json).unwrap_or_else(|e| {
                log::warn!("invalid canvas config, using defaults: {e}");
                CanvasConfig::default()
            })
        };
        let mut canvas = FlowCanvas::new(config);
        canvas.resize(CanvasSize { width, height });
        Self { canvas }
    }

    /// Set the console log level (`"error"` … `"trace"`).
    pub fn set_log_level(&self, level: &str) {
        console::init_logging(console::parse_level(level));
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.canvas.resize(CanvasSize { width, height });
    }

    // ─── Snapshot ────────────────────────────────────────────────────────

    /// Replace the canvas with a `{nodes, connections, viewport,
    /// selectedNodes}` snapshot. Returns `false` (and keeps the current
    /// canvas) if the JSON does not parse.
    pub fn import_canvas(&mut self, json: &str) -> bool {
        match self.canvas.load_json(json) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("import rejected: {e}");
                false
            }
        }
    }

    pub fn export_canvas(&self) -> String {
        self.canvas
            .store()
            .export_json()
            .unwrap_or_else(error_json)
    }

    pub fn clear_canvas(&mut self) -> bool {
        let had_content = !self.canvas.store().nodes().is_empty();
        self.canvas.edit("Clear canvas", |s| s.clear_canvas());
        had_content
    }

    /// Monotonic change counter for autosave / re-render checks.
    pub fn revision(&self) -> f64 {
        self.canvas.store().revision() as f64
    }

    // ─── Pointer / keyboard input ────────────────────────────────────────

    /// Handle pointer down. `button` is the DOM `MouseEvent.button` code;
    /// `target_json` describes a plus indicator or port under the pointer
    /// (`""` for plain canvas). Returns a `CanvasResponse` JSON object.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        target_json: &str,
        time_ms: f64,
    ) -> String {
        let target = if target_json.trim().is_empty() {
            PointerTarget::Canvas
        } else {
            parse_object::<PointerTarget>(target_json).unwrap_or_default()
        };
        self.dispatch(InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: modifiers(shift, ctrl, alt, meta),
            target,
            time_ms,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        time_ms: f64,
    ) -> String {
        self.dispatch(InputEvent::PointerMove {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
            time_ms,
        })
    }

    /// Handle pointer up. Hosts should also forward window-level releases.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_up(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        time_ms: f64,
    ) -> String {
        self.dispatch(InputEvent::PointerUp {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
            time_ms,
        })
    }

    pub fn handle_pointer_cancel(&mut self, time_ms: f64) -> String {
        self.dispatch(InputEvent::PointerCancel { time_ms })
    }

    /// Synthetic click. `clickSuppressed` in the response tells the host to
    /// skip its own click handler (the click ended a drag).
    #[allow(clippy::too_many_arguments)]
    pub fn handle_click(
        &mut self,
        x: f64,
        y: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        time_ms: f64,
    ) -> String {
        self.dispatch(InputEvent::Click {
            x,
            y,
            modifiers: modifiers(shift, ctrl, alt, meta),
            time_ms,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_wheel(
        &mut self,
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> String {
        self.dispatch(InputEvent::Wheel {
            x,
            y,
            dx,
            dy,
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    /// Handle a keyboard shortcut (`KeyboardEvent.key`).
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        self.dispatch(InputEvent::Key {
            key: key.to_string(),
            modifiers: modifiers(shift, ctrl, alt, meta),
        })
    }

    pub fn set_space_held(&mut self, held: bool) {
        self.canvas.set_space_held(held);
    }

    /// Fire due timers. Call from `requestAnimationFrame`; returns true if
    /// the canvas needs a redraw.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.canvas.tick(now_ms)
    }

    /// Cancel gestures and timers before the host element unmounts.
    pub fn teardown(&mut self) {
        self.canvas.teardown();
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// Add a node from its JSON form. Returns the ID used, or `""` if the
    /// JSON is not a node.
    pub fn add_node(&mut self, node_json: &str) -> String {
        let Some(node) = parse_object::<Node>(node_json) else {
            return String::new();
        };
        self.canvas
            .edit("Add node", |s| s.add_node(node))
            .to_string()
    }

    /// Create a default node of `kind` with its top-left at `(x, y)`.
    pub fn create_node(&mut self, kind: &str, x: f64, y: f64) -> String {
        self.canvas
            .edit("Add node", |s| s.create_node(kind, Point::new(x, y)))
            .to_string()
    }

    pub fn update_node(&mut self, node_id: &str, patch_json: &str) -> bool {
        let Some(patch) = parse_object::<NodePatch>(patch_json) else {
            return false;
        };
        let id = NodeId::intern(node_id);
        self.canvas.edit("Edit node", |s| s.update_node(id, patch))
    }

    pub fn remove_node(&mut self, node_id: &str) -> bool {
        let id = NodeId::intern(node_id);
        self.canvas.edit("Delete node", |s| s.remove_node(id))
    }

    /// Duplicate a node. Returns the new ID or `""`.
    pub fn duplicate_node(&mut self, node_id: &str) -> String {
        let id = NodeId::intern(node_id);
        self.canvas
            .edit("Duplicate node", |s| s.duplicate_node(id))
            .map(|n| n.to_string())
            .unwrap_or_default()
    }

    pub fn move_node(&mut self, node_id: &str, x: f64, y: f64) -> bool {
        let id = NodeId::intern(node_id);
        self.canvas
            .edit("Move node", |s| s.move_node(id, Point::new(x, y)))
    }

    /// Flip the expanded flag. Returns `{"ok":true,"value":bool}`.
    pub fn toggle_node_expanded(&mut self, node_id: &str) -> String {
        let id = NodeId::intern(node_id);
        toggle_json(self.canvas.edit("Expand node", |s| s.toggle_node_expanded(id, None)))
    }

    pub fn toggle_node_locked(&mut self, node_id: &str) -> String {
        let id = NodeId::intern(node_id);
        toggle_json(self.canvas.edit("Lock node", |s| s.toggle_node_locked(id, None)))
    }

    /// Flip visibility. `value` in the result is the new *visible* state.
    pub fn toggle_node_visibility(&mut self, node_id: &str) -> String {
        let id = NodeId::intern(node_id);
        toggle_json(
            self.canvas
                .edit("Toggle visibility", |s| s.toggle_node_visibility(id, None)),
        )
    }

    pub fn bring_to_front(&mut self, node_id: &str) -> bool {
        let id = NodeId::intern(node_id);
        self.canvas.edit("Bring to front", |s| s.bring_to_front(id))
    }

    // ─── Connections ─────────────────────────────────────────────────────

    /// Add a connection. `kind` is `"bezier"`, `"straight"` or `"step"`
    /// (empty = bezier). Returns `{"ok":true,"id":…}` or
    /// `{"ok":false,"error":…}`.
    pub fn add_connection(&mut self, from: &str, to: &str, kind: &str, label: &str) -> String {
        let kind = if kind.is_empty() {
            ConnectionType::default()
        } else {
            match parse_enum::<ConnectionType>(kind) {
                Some(kind) => kind,
                None => return error_json(format!("unknown connection type `{kind}`")),
            }
        };
        let (from, to) = (NodeId::intern(from), NodeId::intern(to));
        let label = (!label.is_empty()).then(|| label.to_string());
        let added = self
            .canvas
            .edit("Connect nodes", |s| s.add_connection(from, to, kind, None, label));
        match added {
            Ok(id) => json!({ "ok": true, "id": id }).to_string(),
            Err(reason) => error_json(reason),
        }
    }

    pub fn remove_connection(&mut self, connection_id: &str) -> bool {
        let id = ConnectionId::intern(connection_id);
        self.canvas
            .edit("Delete connection", |s| s.remove_connection(id))
    }

    pub fn update_connection_type(&mut self, connection_id: &str, kind: &str) -> bool {
        let Some(kind) = parse_enum::<ConnectionType>(kind) else {
            return false;
        };
        let id = ConnectionId::intern(connection_id);
        self.canvas
            .edit("Change connection type", |s| s.update_connection_type(id, kind))
    }

    /// Set the label; `""` clears it.
    pub fn update_connection_label(&mut self, connection_id: &str, label: &str) -> bool {
        let id = ConnectionId::intern(connection_id);
        let label = (!label.is_empty()).then(|| label.to_string());
        self.canvas
            .edit("Label connection", |s| s.update_connection_label(id, label))
    }

    pub fn update_connection_style(&mut self, connection_id: &str, style_json: &str) -> bool {
        let Some(style) = parse_object::<ConnectionStyle>(style_json) else {
            return false;
        };
        let id = ConnectionId::intern(connection_id);
        self.canvas
            .edit("Style connection", |s| s.update_connection_style(id, style))
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Connections touching a node as a JSON array. `direction` is
    /// `"incoming"`, `"outgoing"` or `"both"` (empty = both).
    pub fn connections_for_node(&self, node_id: &str, direction: &str) -> String {
        let direction = parse_enum::<Direction>(direction).unwrap_or_default();
        to_json(
            &self
                .canvas
                .store()
                .connections_for_node(NodeId::intern(node_id), direction),
        )
    }

    pub fn connected_nodes(&self, node_id: &str, direction: &str) -> String {
        let direction = parse_enum::<Direction>(direction).unwrap_or_default();
        to_json(
            &self
                .canvas
                .store()
                .connected_nodes(NodeId::intern(node_id), direction),
        )
    }

    pub fn is_valid_connection(&self, from: &str, to: &str) -> bool {
        self.canvas
            .store()
            .is_valid_connection(NodeId::intern(from), NodeId::intern(to))
    }

    pub fn has_outgoing_connections(&self, node_id: &str) -> bool {
        self.canvas
            .store()
            .has_outgoing_connections(NodeId::intern(node_id))
    }

    pub fn has_incoming_connections(&self, node_id: &str) -> bool {
        self.canvas
            .store()
            .has_incoming_connections(NodeId::intern(node_id))
    }

    // ─── Rendering data ──────────────────────────────────────────────────

    /// Every renderable connection with its SVG path and label anchor.
    pub fn routed_connections(&self) -> String {
        to_json(&self.canvas.store().routed_connections())
    }

    /// The in-progress connection drag with its path, or `null`.
    pub fn connection_preview(&self) -> String {
        match (
            self.canvas.connection_preview(),
            self.canvas.connection_preview_path(),
        ) {
            (Some(preview), Some(path)) => to_json(&json!({
                "preview": preview,
                "path": path,
            })),
            _ => "null".to_string(),
        }
    }

    /// Marquee rectangle in canvas space, or `null`.
    pub fn marquee(&self) -> String {
        match self.canvas.marquee() {
            Some(b) => json!({ "x": b.x, "y": b.y, "width": b.width, "height": b.height })
                .to_string(),
            None => "null".to_string(),
        }
    }

    /// Node whose contextual actions should be visible, or `""`.
    pub fn hovered_node(&self) -> String {
        self.canvas
            .hovered_node()
            .map(|id| id.to_string())
            .unwrap_or_default()
    }

    /// Host is over the floating actions of the hovered node.
    pub fn hold_hover(&mut self) {
        self.canvas.hold_hover();
    }

    /// Pointer left the floating actions.
    pub fn release_hover(&mut self, time_ms: f64) {
        self.canvas.release_hover(time_ms);
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn get_viewport(&self) -> String {
        to_json(&self.canvas.store().viewport())
    }

    /// Partial update: any of `x`, `y`, `zoom`.
    pub fn set_viewport(&mut self, patch_json: &str) -> bool {
        match parse_object::<ViewportPatch>(patch_json) {
            Some(patch) => self.canvas.store_mut().set_viewport(patch),
            None => false,
        }
    }

    pub fn zoom_in(&mut self) -> bool {
        self.canvas.store_mut().zoom_in()
    }

    pub fn zoom_out(&mut self) -> bool {
        self.canvas.store_mut().zoom_out()
    }

    pub fn reset_view(&mut self) -> bool {
        self.canvas.store_mut().reset_view()
    }

    pub fn zoom_to_fit(&mut self) -> bool {
        self.canvas.store_mut().zoom_to_fit()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_node(&mut self, node_id: &str, multi: bool) -> bool {
        self.canvas
            .store_mut()
            .select_node(NodeId::intern(node_id), multi)
    }

    pub fn clear_selection(&mut self) -> bool {
        self.canvas.store_mut().clear_selection()
    }

    pub fn select_all(&mut self) -> bool {
        self.canvas.store_mut().select_all()
    }

    /// Selected node IDs as a JSON array.
    pub fn get_selected_ids(&self) -> String {
        to_json(&self.canvas.store().selection().ids())
    }

    /// Align nodes (JSON array of IDs; `"[]"` or `""` = current selection).
    /// `direction` is one of left/right/center/middle/top/bottom.
    pub fn align_nodes(&mut self, ids_json: &str, direction: &str) -> bool {
        let Some(direction) = parse_enum::<AlignDirection>(direction) else {
            return false;
        };
        let ids: Vec<NodeId> = if ids_json.trim().is_empty() {
            Vec::new()
        } else {
            parse_json(ids_json).unwrap_or_default()
        };
        if ids.is_empty() {
            return self
                .canvas
                .edit("Align", |s| s.align_selected(direction));
        }
        self.canvas
            .edit("Align", |s| s.align_nodes(&ids, direction))
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.canvas.undo().is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.canvas.redo().is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.canvas.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.canvas.can_redo()
    }
}

impl WasmCanvas {
    fn dispatch(&mut self, event: InputEvent) -> String {
        let response: CanvasResponse = self.canvas.handle(event);
        to_json(&response)
    }
}

// ─── JSON helpers ────────────────────────────────────────────────────────

fn modifiers(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

/// Parse a struct argument; the top level must be a JSON object.
fn parse_object<T: DeserializeOwned>(json: &str) -> Option<T> {
    flow_core::from_json_object(json)
        .inspect_err(|e| log::warn!("rejected JSON argument: {e}"))
        .ok()
}

fn parse_json<T: DeserializeOwned>(json: &str) -> Option<T> {
    serde_json::from_str(json)
        .inspect_err(|e| log::warn!("rejected JSON argument: {e}"))
        .ok()
}

/// Parse a bare lowercase enum name such as `"step"` or `"outgoing"`.
fn parse_enum<T: DeserializeOwned>(name: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(name.to_string())).ok()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(error_json)
}

fn error_json(error: impl std::fmt::Display) -> String {
    json!({ "ok": false, "error": error.to_string() }).to_string()
}

fn toggle_json(value: Option<bool>) -> String {
    match value {
        Some(value) => json!({ "ok": true, "value": value }).to_string(),
        None => error_json("node not found"),
    }
}

/// Port sides as the host spells them, for building `target_json`.
#[wasm_bindgen]
pub fn port_kind_names() -> String {
    to_json(&[PortKind::Input, PortKind::Output])
}

// ─── Standalone validation (no canvas needed) ────────────────────────────

/// Validate a canvas snapshot without loading it.
///
/// Returns `{"ok":bool,"nodes":n,"connections":m,"issues":[...]}` where each
/// issue names the offending node or connection and why: duplicate node IDs,
/// self-loops, duplicate pairs, cycles, reused connection IDs and dangling
/// endpoints. `ok` is true only with no issues. Unparseable input gives
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_snapshot(json: &str) -> String {
    let snapshot = match CanvasSnapshot::from_json(json) {
        Ok(snapshot) => snapshot,
        Err(e) => return error_json(e),
    };

    let mut issues = Vec::new();
    let mut seen = HashSet::with_capacity(snapshot.nodes.len());
    for node in &snapshot.nodes {
        if !seen.insert(node.id) {
            issues.push(json!({ "node": node.id, "error": "duplicate node id" }));
        }
    }

    let connection_count = snapshot.connections.len();
    let audit = audit_connections(snapshot.connections, |id| seen.contains(&id));
    for (conn, reason) in &audit.rejected {
        issues.push(json!({ "connection": conn.id, "error": reason.to_string() }));
    }
    for (conn, end) in &audit.dangling {
        let reason = ConnectionRejection::UnknownNode(*end);
        issues.push(json!({ "connection": conn, "error": reason.to_string() }));
    }

    json!({
        "ok": issues.is_empty(),
        "nodes": snapshot.nodes.len(),
        "connections": connection_count,
        "issues": issues,
    })
    .to_string()
}
