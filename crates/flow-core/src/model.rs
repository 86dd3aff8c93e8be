//! Core data model for workflow canvases.
//!
//! A canvas is a flat list of [`Node`]s joined by directed [`Connection`]s
//! (output side → input side). The connection set is kept acyclic by the
//! store, which validates every new edge through [`crate::validate`].
//! Array order of `nodes` doubles as z-order: later nodes are drawn on top.
//!
//! Everything here serializes to the JSON layout hosts persist:
//! `{ nodes, connections, viewport: {x, y, zoom}, selectedNodes }`.

use crate::id::{ConnectionId, NodeId};
use kurbo::{Point, Rect};
use serde::de::{self, DeserializeOwned, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;

/// Width used for nodes that don't declare one.
pub const DEFAULT_NODE_WIDTH: f64 = 70.0;
/// Height used for nodes that don't declare one.
pub const DEFAULT_NODE_HEIGHT: f64 = 70.0;

/// Port identifiers as they appear in `inputs` / `outputs`.
pub type PortList = SmallVec<[String; 2]>;

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A positioned, typed box with named input and output ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    /// Node type, e.g. `"trigger"` or `"http_request"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Top-left corner in canvas space.
    pub position: Point,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub inputs: PortList,

    #[serde(default)]
    pub outputs: PortList,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_locked: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_hidden: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_expanded: bool,

    /// Free-form node configuration, opaque to the canvas.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Node {
    /// Create a node with one input and one output port and default size.
    pub fn new(id: NodeId, kind: impl Into<String>, position: Point) -> Self {
        let kind = kind.into();
        Self {
            id,
            name: kind.clone(),
            kind,
            position,
            width: None,
            height: None,
            inputs: smallvec::smallvec!["in".to_string()],
            outputs: smallvec::smallvec!["out".to_string()],
            is_locked: false,
            is_hidden: false,
            is_expanded: false,
            parameters: Map::new(),
        }
    }

    /// Builder-style explicit size.
    #[must_use]
    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Builder-style display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Effective width (declared or default).
    pub fn width(&self) -> f64 {
        self.width.unwrap_or(DEFAULT_NODE_WIDTH)
    }

    /// Effective height (declared or default).
    pub fn height(&self) -> f64 {
        self.height.unwrap_or(DEFAULT_NODE_HEIGHT)
    }

    /// Axis-aligned bounding box in canvas space.
    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.position.x,
            y: self.position.y,
            width: self.width(),
            height: self.height(),
        }
    }

    /// Port list for one side of the node.
    pub fn ports(&self, kind: PortKind) -> &PortList {
        match kind {
            PortKind::Input => &self.inputs,
            PortKind::Output => &self.outputs,
        }
    }
}

/// Partial update for [`Node`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub position: Option<Point>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub name: Option<String>,
    pub inputs: Option<PortList>,
    pub outputs: Option<PortList>,
    pub is_locked: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_expanded: Option<bool>,
    /// Keys merged into the existing parameter map; `null` removes a key.
    pub parameters: Option<Map<String, Value>>,
}

impl NodePatch {
    /// Apply this patch to `node`. Returns true if anything was set.
    pub fn apply(self, node: &mut Node) -> bool {
        let mut touched = false;
        if let Some(kind) = self.kind {
            node.kind = kind;
            touched = true;
        }
        if let Some(position) = self.position {
            node.position = position;
            touched = true;
        }
        if let Some(width) = self.width {
            node.width = Some(width);
            touched = true;
        }
        if let Some(height) = self.height {
            node.height = Some(height);
            touched = true;
        }
        if let Some(name) = self.name {
            node.name = name;
            touched = true;
        }
        if let Some(inputs) = self.inputs {
            node.inputs = inputs;
            touched = true;
        }
        if let Some(outputs) = self.outputs {
            node.outputs = outputs;
            touched = true;
        }
        if let Some(locked) = self.is_locked {
            node.is_locked = locked;
            touched = true;
        }
        if let Some(hidden) = self.is_hidden {
            node.is_hidden = hidden;
            touched = true;
        }
        if let Some(expanded) = self.is_expanded {
            node.is_expanded = expanded;
            touched = true;
        }
        if let Some(params) = self.parameters {
            for (key, value) in params {
                if value.is_null() {
                    node.parameters.remove(&key);
                } else {
                    node.parameters.insert(key, value);
                }
            }
            touched = true;
        }
        touched
    }
}

// ─── Ports ───────────────────────────────────────────────────────────────

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Input,
    Output,
}

impl PortKind {
    pub fn opposite(self) -> Self {
        match self {
            PortKind::Input => PortKind::Output,
            PortKind::Output => PortKind::Input,
        }
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// How the connection path is routed between two ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Bezier,
    Straight,
    Step,
}

/// Visual hints for a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashed: Option<bool>,
}

/// A directed link from one node's output side to another's input side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(rename = "type", default)]
    pub kind: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ConnectionStyle>,
}

impl Connection {
    pub fn new(id: ConnectionId, from: NodeId, to: NodeId, kind: ConnectionType) -> Self {
        Self {
            id,
            from,
            to,
            kind,
            label: None,
            style: None,
        }
    }

    /// Whether this connection touches `node` at either end.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from == node || self.to == node
    }
}

/// Which connections to consider when querying around a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Connections ending at the node.
    Incoming,
    /// Connections starting at the node.
    Outgoing,
    #[default]
    Both,
}

impl Direction {
    /// Whether `conn` matches this direction relative to `node`.
    pub fn matches(self, conn: &Connection, node: NodeId) -> bool {
        match self {
            Direction::Incoming => conn.to == node,
            Direction::Outgoing => conn.from == node,
            Direction::Both => conn.touches(node),
        }
    }
}

// ─── Viewport ────────────────────────────────────────────────────────────

/// Pan offset + zoom factor: `screen = canvas * zoom + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Map a screen-space point (relative to the canvas element) into canvas space.
    pub fn screen_to_canvas(&self, p: Point) -> Point {
        Point::new((p.x - self.x) / self.zoom, (p.y - self.y) / self.zoom)
    }

    /// Map a canvas-space point to screen space.
    pub fn canvas_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.x, p.y * self.zoom + self.y)
    }
}

/// Partial viewport update for `set_viewport`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub zoom: Option<f64>,
}

/// Size of the host canvas element in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────

/// The persisted canvas layout, used for export/import round-trips.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasSnapshot {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub viewport: Viewport,
    pub selected_nodes: Vec<NodeId>,
}

impl CanvasSnapshot {
    /// Parse a persisted snapshot. The top level must be a JSON object.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        from_json_object(json)
    }
}

/// Deserialize a struct from text whose top level must be a JSON object.
///
/// serde's derived struct impls also take arrays as positional fields, so
/// `[1, 2]` would otherwise read as a struct.
///
/// # Errors
/// Returns the `serde_json` error for malformed input or a non-object.
pub fn from_json_object<T: DeserializeOwned>(json: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str::<Value>(json)? {
        value @ Value::Object(_) => serde_json::from_value(value),
        other => Err(de::Error::invalid_type(unexpected(&other), &"a JSON object")),
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

// ─── Bounds ──────────────────────────────────────────────────────────────

/// Axis-aligned box in canvas space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Inclusive containment: points on the edge are inside.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Grow (or shrink, for negative `m`) on every side.
    #[must_use]
    pub fn inflate(&self, m: f64) -> Self {
        Self {
            x: self.x - m,
            y: self.y - m,
            width: self.width + 2.0 * m,
            height: self.height + 2.0 * m,
        }
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Bounds) -> Self {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Self {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Check if this bounds intersects with a rectangle (AABB overlap).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x <= other.right()
            && self.right() >= other.x
            && self.y <= other.bottom()
            && self.bottom() >= other.y
    }

    /// Bounding box of a set of boxes, or `None` for an empty set.
    pub fn enclosing<I: IntoIterator<Item = Bounds>>(boxes: I) -> Option<Bounds> {
        boxes.into_iter().reduce(|acc, b| acc.union(&b))
    }

    /// Normalized box spanning two corner points (marquee drag).
    pub fn from_corners(a: Point, b: Point) -> Self {
        let r = Rect::from_points(a, b);
        Self {
            x: r.x0,
            y: r.y0,
            width: r.width(),
            height: r.height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn node_defaults_to_70_square() {
        let node = Node::new(NodeId::intern("a"), "trigger", Point::new(100.0, 100.0));
        assert_eq!(node.width(), 70.0);
        assert_eq!(node.height(), 70.0);
        assert_eq!(
            node.bounds(),
            Bounds {
                x: 100.0,
                y: 100.0,
                width: 70.0,
                height: 70.0
            }
        );
    }

    #[test]
    fn node_json_layout() {
        let json = r#"{
            "id": "fetch",
            "type": "http_request",
            "position": {"x": 10, "y": 20},
            "name": "Fetch",
            "inputs": ["in"],
            "outputs": ["ok", "err"],
            "isLocked": true,
            "parameters": {"url": "https://example.com"}
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.id, NodeId::intern("fetch"));
        assert_eq!(node.kind, "http_request");
        assert_eq!(node.position, Point::new(10.0, 20.0));
        assert_eq!(node.outputs.len(), 2);
        assert!(node.is_locked);
        assert!(!node.is_hidden);
        assert_eq!(node.width, None);

        let out = serde_json::to_value(&node).unwrap();
        assert_eq!(out["type"], "http_request");
        assert_eq!(out["isLocked"], true);
        assert!(out.get("isHidden").is_none());
        assert!(out.get("width").is_none());
    }

    #[test]
    fn connection_type_defaults_to_bezier() {
        let conn: Connection = serde_json::from_str(r#"{"id":"c1","from":"a","to":"b"}"#).unwrap();
        assert_eq!(conn.kind, ConnectionType::Bezier);
        let conn: Connection =
            serde_json::from_str(r#"{"id":"c2","from":"a","to":"b","type":"step","style":{"dashed":true}}"#)
                .unwrap();
        assert_eq!(conn.kind, ConnectionType::Step);
        assert_eq!(conn.style, Some(ConnectionStyle { dashed: Some(true) }));
    }

    #[test]
    fn patch_merges_parameters() {
        let mut node = Node::new(NodeId::intern("p"), "set", Point::ZERO);
        node.parameters.insert("keep".into(), Value::from(1));
        node.parameters.insert("drop".into(), Value::from(2));

        let patch: NodePatch = serde_json::from_str(
            r#"{"name": "Renamed", "parameters": {"drop": null, "add": "x"}}"#,
        )
        .unwrap();
        assert!(patch.apply(&mut node));

        assert_eq!(node.name, "Renamed");
        assert_eq!(node.parameters.get("keep"), Some(&Value::from(1)));
        assert_eq!(node.parameters.get("add"), Some(&Value::from("x")));
        assert!(!node.parameters.contains_key("drop"));
    }

    #[test]
    fn empty_patch_touches_nothing() {
        let mut node = Node::new(NodeId::intern("q"), "set", Point::ZERO);
        let before = node.clone();
        assert!(!NodePatch::default().apply(&mut node));
        assert_eq!(node, before);
    }

    #[test]
    fn viewport_mapping_roundtrip() {
        let vp = Viewport {
            x: 40.0,
            y: -10.0,
            zoom: 1.5,
        };
        let p = Point::new(123.0, 45.0);
        let back = vp.canvas_to_screen(vp.screen_to_canvas(p));
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
    }

    #[test]
    fn bounds_union_and_intersection() {
        let a = Bounds {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        let b = Bounds {
            x: 20.0,
            y: 5.0,
            width: 10.0,
            height: 10.0,
        };
        let u = a.union(&b);
        assert_eq!((u.x, u.y, u.width, u.height), (0.0, 0.0, 30.0, 15.0));
        assert!(!a.intersects(&b));
        assert!(u.intersects(&a));
        assert_eq!(Bounds::enclosing([a, b]), Some(u));
        assert_eq!(Bounds::enclosing(std::iter::empty()), None);
    }

    #[test]
    fn snapshot_must_be_an_object() {
        assert!(CanvasSnapshot::from_json("[]").is_err());
        assert!(CanvasSnapshot::from_json("[[], []]").is_err());
        assert!(CanvasSnapshot::from_json("null").is_err());
        let snap = CanvasSnapshot::from_json(r#"{"selectedNodes": ["a"]}"#).unwrap();
        assert_eq!(snap.selected_nodes, vec![NodeId::intern("a")]);
    }

    #[test]
    fn snapshot_uses_camel_case() {
        let snap = CanvasSnapshot {
            selected_nodes: vec![NodeId::intern("a")],
            ..Default::default()
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["selectedNodes"][0], "a");
        assert_eq!(json["viewport"]["zoom"], 1.0);
    }
}
