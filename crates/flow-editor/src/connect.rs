//! Connection drag preview.
//!
//! A connection is drawn by dragging from a node's plus indicator or from
//! one of its ports. While the pointer moves, the node under it (excluding
//! the source) becomes the candidate target and is validated against the
//! current connections. Releasing over a valid target commits; releasing
//! over empty space shortly after leaving a valid target still commits to
//! that target, so a release that overshoots a small port by a few pixels
//! is not lost.

use crate::timer::PendingTimer;
use flow_core::geometry::{node_input_position, node_output_position, port_anchor};
use flow_core::hit::find_port_at_point;
use flow_core::{
    CanvasConfig, Connection, ConnectionPath, ConnectionType, Node, NodeId, Point, PortKind,
    find_node_at_point, is_valid_connection, path_between,
};
use serde::Serialize;

/// Where a connection drag started.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DragSource {
    /// The floating "+" next to a node; always starts from the output side.
    PlusIndicator { node: NodeId },
    /// A specific port. Dragging from an input draws a connection into `node`.
    Port {
        node: NodeId,
        port: String,
        #[serde(rename = "portKind")]
        port_kind: PortKind,
    },
}

impl DragSource {
    pub fn node(&self) -> NodeId {
        match self {
            DragSource::PlusIndicator { node } | DragSource::Port { node, .. } => *node,
        }
    }

    /// Side of the source node the drag leaves from.
    pub fn side(&self) -> PortKind {
        match self {
            DragSource::PlusIndicator { .. } => PortKind::Output,
            DragSource::Port { port_kind, .. } => *port_kind,
        }
    }

    /// Order `(source, target)` as `(from, to)` in data-flow direction.
    pub fn orient(&self, target: NodeId) -> (NodeId, NodeId) {
        match self.side() {
            PortKind::Output => (self.node(), target),
            PortKind::Input => (target, self.node()),
        }
    }

    fn anchor(&self, node: &Node) -> Point {
        match self {
            DragSource::PlusIndicator { .. } => node_output_position(node),
            DragSource::Port { port, port_kind, .. } => port_anchor(node, *port_kind, port),
        }
    }
}

/// Candidate drop target under the pointer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropTarget {
    pub node: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// Everything a renderer needs to draw the rubber-band connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPreview {
    pub source: DragSource,
    /// Source anchor in canvas space.
    pub start: Point,
    /// Pointer in canvas space.
    pub pointer: Point,
    /// Where the preview ends: the target's anchor when valid, else the pointer.
    pub end: Point,
    pub target: Option<DropTarget>,
    pub is_valid: bool,
}

/// The connection drag state machine.
#[derive(Debug, Clone)]
pub struct ConnectionDrag {
    preview: Option<ConnectionPreview>,
    /// Last valid target, eligible while `grace` runs.
    remembered: Option<DropTarget>,
    grace: PendingTimer,
    hit_margin: f64,
    grace_ms: f64,
}

impl ConnectionDrag {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            preview: None,
            remembered: None,
            grace: PendingTimer::new(),
            hit_margin: config.hit_margin,
            grace_ms: config.drop_grace_ms,
        }
    }

    pub fn is_active(&self) -> bool {
        self.preview.is_some()
    }

    pub fn preview(&self) -> Option<&ConnectionPreview> {
        self.preview.as_ref()
    }

    /// Start dragging. Fails if the source node is missing or hidden.
    pub fn begin(&mut self, source: DragSource, nodes: &[Node]) -> bool {
        let Some(node) = nodes.iter().find(|n| n.id == source.node() && !n.is_hidden) else {
            log::debug!("connection drag from unknown node {}", source.node());
            return false;
        };
        let start = source.anchor(node);
        log::trace!("connection drag from {} ({:?})", node.id, source.side());
        self.grace.cancel();
        self.remembered = None;
        self.preview = Some(ConnectionPreview {
            source,
            start,
            pointer: start,
            end: start,
            target: None,
            is_valid: false,
        });
        true
    }

    /// Follow the pointer (canvas space). Returns true while a drag is active.
    pub fn update(&mut self, pointer: Point, nodes: &[Node], connections: &[Connection], now: f64) -> bool {
        let Some(preview) = self.preview.as_mut() else {
            return false;
        };
        let (target, end, valid) = evaluate(&preview.source, pointer, nodes, connections, self.hit_margin);
        if valid && let Some(t) = &target {
            self.remembered = Some(t.clone());
            self.grace.schedule(now, self.grace_ms);
        }
        preview.pointer = pointer;
        preview.end = if valid { end } else { pointer };
        preview.target = target;
        preview.is_valid = valid;
        true
    }

    /// Release at `pointer`. Returns the `(from, to)` pair to connect, or
    /// `None` if the drop should be discarded.
    pub fn finish(
        &mut self,
        pointer: Point,
        nodes: &[Node],
        connections: &[Connection],
        now: f64,
    ) -> Option<(NodeId, NodeId)> {
        self.update(pointer, nodes, connections, now);
        let preview = self.preview.take()?;
        let remembered = self.remembered.take();
        let in_grace = self.grace.is_running_at(now);
        self.grace.cancel();

        let target = match preview.target {
            Some(t) if preview.is_valid => t,
            _ if in_grace => {
                let t = remembered?;
                log::trace!("drop within grace window, using {}", t.node);
                t
            }
            _ => {
                log::trace!("connection drag discarded");
                return None;
            }
        };
        let (from, to) = preview.source.orient(target.node);
        is_valid_connection(from, to, connections).then_some((from, to))
    }

    /// Abort the drag. Returns true if one was active.
    pub fn cancel(&mut self) -> bool {
        self.grace.cancel();
        self.remembered = None;
        self.preview.take().is_some()
    }

    /// Forget the remembered target once its window has passed.
    pub fn tick(&mut self, now: f64) -> bool {
        if self.grace.fire(now) {
            self.remembered = None;
            return true;
        }
        false
    }

    /// Routed preview path, oriented output → input like a real connection.
    pub fn preview_path(&self, kind: ConnectionType) -> Option<ConnectionPath> {
        let p = self.preview.as_ref()?;
        Some(match p.source.side() {
            PortKind::Output => path_between(p.start, p.end, kind),
            PortKind::Input => path_between(p.end, p.start, kind),
        })
    }
}

/// Find the candidate under `pointer` and decide whether it is a legal end.
fn evaluate(
    source: &DragSource,
    pointer: Point,
    nodes: &[Node],
    connections: &[Connection],
    margin: f64,
) -> (Option<DropTarget>, Point, bool) {
    let Some(node) = find_node_at_point(pointer, nodes, Some(source.node()), margin) else {
        return (None, pointer, false);
    };
    let wanted = source.side().opposite();

    let (port, end) = match source {
        DragSource::PlusIndicator { .. } => (None, node_input_position(node)),
        DragSource::Port { .. } => {
            let port = find_port_at_point(pointer, node, margin)
                .filter(|(kind, _)| *kind == wanted)
                .map(|(_, p)| p)
                .or_else(|| node.ports(wanted).first().cloned());
            let Some(port) = port else {
                // No port on the side this drag needs.
                let target = DropTarget {
                    node: node.id,
                    port: None,
                };
                return (Some(target), pointer, false);
            };
            let end = port_anchor(node, wanted, &port);
            (Some(port), end)
        }
    };

    let (from, to) = source.orient(node.id);
    let valid = is_valid_connection(from, to, connections);
    (Some(DropTarget { node: node.id, port }), end, valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::ConnectionId;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn nodes() -> Vec<Node> {
        vec![
            Node::new(id("cdA"), "task", Point::new(0.0, 0.0)),
            Node::new(id("cdB"), "task", Point::new(200.0, 0.0)),
            Node::new(id("cdC"), "task", Point::new(400.0, 0.0)),
        ]
    }

    fn edge(from: &str, to: &str) -> Connection {
        Connection::new(
            ConnectionId::intern(&format!("{from}-{to}")),
            id(from),
            id(to),
            ConnectionType::Bezier,
        )
    }

    fn plus(node: &str) -> DragSource {
        DragSource::PlusIndicator { node: id(node) }
    }

    #[test]
    fn plus_drag_starts_at_output_anchor() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        assert!(drag.begin(plus("cdA"), &ns));
        assert_eq!(drag.preview().map(|p| p.start), Some(Point::new(70.0, 35.0)));
        assert!(!drag.begin(plus("ghost"), &ns));
    }

    #[test]
    fn valid_target_snaps_preview_end() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(plus("cdA"), &ns);
        drag.update(Point::new(230.0, 40.0), &ns, &[], 0.0);
        let p = drag.preview().unwrap();
        assert!(p.is_valid);
        assert_eq!(p.target.as_ref().map(|t| t.node), Some(id("cdB")));
        assert_eq!(p.end, Point::new(200.0, 35.0));
        assert_eq!(drag.finish(Point::new(230.0, 40.0), &ns, &[], 10.0), Some((id("cdA"), id("cdB"))));
        assert!(!drag.is_active());
    }

    #[test]
    fn cycle_target_is_invalid() {
        let ns = nodes();
        let conns = vec![edge("cdA", "cdB"), edge("cdB", "cdC")];
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(plus("cdC"), &ns);
        drag.update(Point::new(30.0, 30.0), &ns, &conns, 0.0);
        let p = drag.preview().unwrap();
        assert_eq!(p.target.as_ref().map(|t| t.node), Some(id("cdA")));
        assert!(!p.is_valid);
        assert_eq!(p.end, Point::new(30.0, 30.0));
        assert_eq!(drag.finish(Point::new(30.0, 30.0), &ns, &conns, 5.0), None);
    }

    #[test]
    fn source_node_is_never_a_target() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(plus("cdA"), &ns);
        drag.update(Point::new(35.0, 35.0), &ns, &[], 0.0);
        assert_eq!(drag.preview().unwrap().target, None);
    }

    #[test]
    fn release_within_grace_window_commits() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(plus("cdA"), &ns);
        drag.update(Point::new(230.0, 40.0), &ns, &[], 1000.0);
        drag.update(Point::new(320.0, 300.0), &ns, &[], 1100.0);
        assert!(!drag.preview().unwrap().is_valid);
        assert_eq!(
            drag.finish(Point::new(320.0, 300.0), &ns, &[], 1250.0),
            Some((id("cdA"), id("cdB")))
        );
    }

    #[test]
    fn release_after_grace_window_discards() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(plus("cdA"), &ns);
        drag.update(Point::new(230.0, 40.0), &ns, &[], 1000.0);
        drag.update(Point::new(320.0, 300.0), &ns, &[], 1100.0);
        assert_eq!(drag.finish(Point::new(320.0, 300.0), &ns, &[], 1301.0), None);
    }

    #[test]
    fn grace_window_is_configurable() {
        let ns = nodes();
        let config = CanvasConfig {
            drop_grace_ms: 50.0,
            ..Default::default()
        };
        let mut drag = ConnectionDrag::new(&config);
        drag.begin(plus("cdA"), &ns);
        drag.update(Point::new(230.0, 40.0), &ns, &[], 0.0);
        assert_eq!(drag.finish(Point::new(320.0, 300.0), &ns, &[], 100.0), None);
    }

    #[test]
    fn tick_forgets_expired_target() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(plus("cdA"), &ns);
        drag.update(Point::new(230.0, 40.0), &ns, &[], 0.0);
        drag.update(Point::new(320.0, 300.0), &ns, &[], 10.0);
        assert!(drag.tick(400.0));
        assert_eq!(drag.finish(Point::new(320.0, 300.0), &ns, &[], 100.0), None);
    }

    #[test]
    fn dragging_from_input_port_connects_into_source() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        let source = DragSource::Port {
            node: id("cdB"),
            port: "in".into(),
            port_kind: PortKind::Input,
        };
        assert!(drag.begin(source, &ns));
        assert_eq!(drag.preview().unwrap().start, Point::new(200.0, 35.0));
        // Over cdA's output port.
        drag.update(Point::new(68.0, 35.0), &ns, &[], 0.0);
        let p = drag.preview().unwrap();
        assert_eq!(p.target.as_ref().and_then(|t| t.port.as_deref()), Some("out"));
        assert_eq!(p.end, Point::new(70.0, 35.0));
        let path = drag.preview_path(ConnectionType::Straight).unwrap();
        assert_eq!(path.from(), Point::new(70.0, 35.0));
        assert_eq!(drag.finish(Point::new(68.0, 35.0), &ns, &[], 1.0), Some((id("cdA"), id("cdB"))));
    }

    #[test]
    fn target_without_matching_port_is_invalid() {
        let mut ns = nodes();
        ns[1].inputs.clear();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(
            DragSource::Port {
                node: id("cdA"),
                port: "out".into(),
                port_kind: PortKind::Output,
            },
            &ns,
        );
        drag.update(Point::new(230.0, 40.0), &ns, &[], 0.0);
        assert!(!drag.preview().unwrap().is_valid);
    }

    #[test]
    fn cancel_clears_everything() {
        let ns = nodes();
        let mut drag = ConnectionDrag::new(&CanvasConfig::default());
        drag.begin(plus("cdA"), &ns);
        drag.update(Point::new(230.0, 40.0), &ns, &[], 0.0);
        assert!(drag.cancel());
        assert!(!drag.cancel());
        assert_eq!(drag.finish(Point::new(230.0, 40.0), &ns, &[], 1.0), None);
    }
}
