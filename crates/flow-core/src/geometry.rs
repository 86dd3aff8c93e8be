//! Geometry engine: port anchors and connection routing.
//!
//! Pure functions over [`Node`] values. Connections leave a node on its
//! right edge (outputs) and enter on its left edge (inputs). Paths are built
//! as `kurbo::BezPath` so consumers can both emit SVG `d` strings and measure
//! them (label anchors, hit testing).

use crate::id::{ConnectionId, NodeId};
use crate::model::{Connection, ConnectionType, Node, PortKind};
use kurbo::{BezPath, ParamCurve, ParamCurveArclen, Point};
use serde::Serialize;
use std::collections::HashMap;

/// Bezier control points never sit closer than this to their endpoint.
pub const MIN_CONTROL_OFFSET: f64 = 50.0;
/// ... nor further than this.
pub const MAX_CONTROL_OFFSET: f64 = 200.0;
/// Share of the endpoint distance used as control offset before clamping.
pub const CONTROL_OFFSET_RATIO: f64 = 0.25;

const ARCLEN_ACCURACY: f64 = 1e-3;

// ─── Port anchors ────────────────────────────────────────────────────────

/// Right-centre point of a node, where outgoing connections start.
pub fn node_output_position(node: &Node) -> Point {
    Point::new(
        node.position.x + node.width(),
        node.position.y + node.height() / 2.0,
    )
}

/// Left-centre point of a node, where incoming connections end.
pub fn node_input_position(node: &Node) -> Point {
    Point::new(node.position.x, node.position.y + node.height() / 2.0)
}

/// Anchor of the `index`-th port on one side of a node.
///
/// Ports are spread evenly along the side: port `i` of `n` sits at
/// `y + height * (i + 1) / (n + 1)`, so a lone port lands on the side's
/// centre and matches [`node_output_position`] / [`node_input_position`].
pub fn port_position(node: &Node, kind: PortKind, index: usize) -> Point {
    let count = node.ports(kind).len().max(1);
    let index = index.min(count - 1);
    let x = match kind {
        PortKind::Input => node.position.x,
        PortKind::Output => node.position.x + node.width(),
    };
    let y = node.position.y + node.height() * (index as f64 + 1.0) / (count as f64 + 1.0);
    Point::new(x, y)
}

/// Anchor of a named port, or the side's centre if the node has no such port.
pub fn port_anchor(node: &Node, kind: PortKind, port: &str) -> Point {
    match node.ports(kind).iter().position(|p| p == port) {
        Some(index) => port_position(node, kind, index),
        None => match kind {
            PortKind::Input => node_input_position(node),
            PortKind::Output => node_output_position(node),
        },
    }
}

// ─── Paths ───────────────────────────────────────────────────────────────

/// A routed connection curve between two anchors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPath {
    /// SVG path data (`d` attribute).
    pub path: String,
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
    #[serde(skip)]
    pub curve: BezPath,
}

impl ConnectionPath {
    pub fn from(&self) -> Point {
        Point::new(self.from_x, self.from_y)
    }

    pub fn to(&self) -> Point {
        Point::new(self.to_x, self.to_y)
    }

    /// Point halfway along the curve, used to anchor labels.
    ///
    /// Falls back to the straight-line midpoint of the endpoints when the
    /// arc length can't be measured (degenerate or non-finite curves).
    pub fn midpoint(&self) -> Point {
        match measure_midpoint(&self.curve) {
            Some(p) => p,
            None => {
                log::debug!("arc length unavailable, using linear midpoint");
                self.from().midpoint(self.to())
            }
        }
    }
}

/// Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Horizontal control-point offset for a bezier between `from` and `to`.
///
/// Short connections still get a visible bulge; long ones don't swing wide.
pub fn bezier_control_offset(from: Point, to: Point) -> f64 {
    (distance(from, to) * CONTROL_OFFSET_RATIO).clamp(MIN_CONTROL_OFFSET, MAX_CONTROL_OFFSET)
}

/// Route a path between two arbitrary anchors.
///
/// Used directly for connection previews that end at the pointer.
pub fn path_between(from: Point, to: Point, kind: ConnectionType) -> ConnectionPath {
    let mut curve = BezPath::new();
    curve.move_to(from);
    match kind {
        ConnectionType::Straight => {
            curve.line_to(to);
        }
        ConnectionType::Step => {
            let mid_x = (from.x + to.x) / 2.0;
            curve.line_to((mid_x, from.y));
            curve.line_to((mid_x, to.y));
            curve.line_to(to);
        }
        ConnectionType::Bezier => {
            let offset = bezier_control_offset(from, to);
            curve.curve_to(
                Point::new(from.x + offset, from.y),
                Point::new(to.x - offset, to.y),
                to,
            );
        }
    }
    ConnectionPath {
        path: curve.to_svg(),
        from_x: from.x,
        from_y: from.y,
        to_x: to.x,
        to_y: to.y,
        curve,
    }
}

/// Route a connection from `from_node`'s output side to `to_node`'s input side.
pub fn calculate_connection_path(
    from_node: &Node,
    to_node: &Node,
    kind: ConnectionType,
) -> ConnectionPath {
    path_between(
        node_output_position(from_node),
        node_input_position(to_node),
        kind,
    )
}

/// Walk the curve to half its arc length.
fn measure_midpoint(curve: &BezPath) -> Option<Point> {
    let segments: Vec<_> = curve.segments().collect();
    let lengths: Vec<f64> = segments
        .iter()
        .map(|seg| seg.arclen(ARCLEN_ACCURACY))
        .collect();
    let total: f64 = lengths.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }

    let mut remaining = total / 2.0;
    for (seg, len) in segments.iter().zip(&lengths) {
        if remaining <= *len {
            let t = seg.inv_arclen(remaining, ARCLEN_ACCURACY);
            let p = seg.eval(t);
            return (p.x.is_finite() && p.y.is_finite()).then_some(p);
        }
        remaining -= len;
    }
    segments.last().map(|seg| seg.end())
}

// ─── Routing the whole canvas ────────────────────────────────────────────

/// A connection with its resolved path, ready for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedConnection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(flatten)]
    pub path: ConnectionPath,
    /// Where a label should be drawn.
    pub label_anchor: Point,
    pub dashed: bool,
}

/// Route every connection whose endpoints exist and are visible.
///
/// Dangling references are reported with a warning and skipped; the stored
/// connection is left alone.
pub fn route_connections(nodes: &[Node], connections: &[Connection]) -> Vec<RoutedConnection> {
    let by_id: HashMap<NodeId, &Node> = nodes.iter().map(|n| (n.id, n)).collect();

    connections
        .iter()
        .filter_map(|conn| {
            let (Some(from), Some(to)) = (by_id.get(&conn.from), by_id.get(&conn.to)) else {
                log::warn!(
                    "connection {} references a missing node ({} -> {}), skipping",
                    conn.id,
                    conn.from,
                    conn.to
                );
                return None;
            };
            if from.is_hidden || to.is_hidden {
                log::trace!("connection {} has a hidden endpoint", conn.id);
                return None;
            }
            let path = calculate_connection_path(from, to, conn.kind);
            Some(RoutedConnection {
                id: conn.id,
                from: conn.from,
                to: conn.to,
                label_anchor: path.midpoint(),
                dashed: conn.style.and_then(|s| s.dashed).unwrap_or(false),
                path,
            })
        })
        .collect()
}

/// Round a point to the nearest grid intersection.
pub fn snap_to_grid(p: Point, grid_size: f64) -> Point {
    if grid_size <= 0.0 {
        return p;
    }
    Point::new(
        (p.x / grid_size).round() * grid_size,
        (p.y / grid_size).round() * grid_size,
    )
}
