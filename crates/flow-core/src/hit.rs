//! Hit testing: point → node / port / connection lookup.
//!
//! Nodes are walked in reverse array order (last drawn = topmost), so the
//! first match is the node the user sees under the pointer.

use crate::geometry::{RoutedConnection, port_position};
use crate::id::{ConnectionId, NodeId};
use crate::model::{Bounds, Node, PortKind};
use kurbo::{ParamCurveNearest, Point};

const NEAREST_ACCURACY: f64 = 1e-3;

/// Whether `point` lies inside the node's box grown by `margin` (edges inclusive).
pub fn is_point_in_node(point: Point, node: &Node, margin: f64) -> bool {
    node.bounds().inflate(margin).contains(point.x, point.y)
}

/// Find the topmost visible node at `point`, optionally ignoring one node.
/// Returns `None` if no node is hit (background).
pub fn find_node_at_point<'a>(
    point: Point,
    nodes: &'a [Node],
    exclude: Option<NodeId>,
    margin: f64,
) -> Option<&'a Node> {
    nodes
        .iter()
        .rev()
        .filter(|n| !n.is_hidden && Some(n.id) != exclude)
        .find(|n| is_point_in_node(point, n, margin))
}

/// Find all visible nodes whose bounds intersect the given rectangle.
/// Used for marquee (box) selection.
pub fn nodes_in_rect(rect: Bounds, nodes: &[Node]) -> Vec<NodeId> {
    nodes
        .iter()
        .filter(|n| !n.is_hidden && n.bounds().intersects(&rect))
        .map(|n| n.id)
        .collect()
}

/// Find the port of `node` whose anchor lies within `radius` of `point`.
/// Returns the port side and its identifier.
pub fn find_port_at_point(point: Point, node: &Node, radius: f64) -> Option<(PortKind, String)> {
    [PortKind::Output, PortKind::Input]
        .into_iter()
        .flat_map(|kind| {
            node.ports(kind)
                .iter()
                .enumerate()
                .map(move |(i, port)| (kind, i, port))
        })
        .find(|(kind, i, _)| port_position(node, *kind, *i).distance(point) <= radius)
        .map(|(kind, _, port)| (kind, port.clone()))
}

/// Find the topmost routed connection whose curve passes within `tolerance`.
pub fn find_connection_at_point(
    point: Point,
    routed: &[RoutedConnection],
    tolerance: f64,
) -> Option<ConnectionId> {
    let limit = tolerance * tolerance;
    routed
        .iter()
        .rev()
        .find(|r| {
            r.path
                .curve
                .segments()
                .any(|seg| seg.nearest(point, NEAREST_ACCURACY).distance_sq <= limit)
        })
        .map(|r| r.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::route_connections;
    use crate::model::{Connection, ConnectionType};

    fn node_at(id: &str, x: f64, y: f64) -> Node {
        Node::new(NodeId::intern(id), "task", Point::new(x, y))
    }

    #[test]
    fn point_in_node_is_edge_inclusive() {
        let n = node_at("h1", 100.0, 100.0).with_size(70.0, 70.0);
        assert!(is_point_in_node(Point::new(100.0, 100.0), &n, 0.0));
        assert!(is_point_in_node(Point::new(170.0, 170.0), &n, 0.0));
        assert!(!is_point_in_node(Point::new(171.0, 100.0), &n, 0.0));
        assert!(is_point_in_node(Point::new(171.0, 100.0), &n, 10.0));
    }

    #[test]
    fn topmost_node_wins() {
        let nodes = vec![node_at("under", 0.0, 0.0), node_at("over", 20.0, 20.0)];
        let hit = find_node_at_point(Point::new(30.0, 30.0), &nodes, None, 0.0);
        assert_eq!(hit.map(|n| n.id), Some(NodeId::intern("over")));

        let hit = find_node_at_point(Point::new(30.0, 30.0), &nodes, Some(NodeId::intern("over")), 0.0);
        assert_eq!(hit.map(|n| n.id), Some(NodeId::intern("under")));

        assert!(find_node_at_point(Point::new(500.0, 500.0), &nodes, None, 0.0).is_none());
    }

    #[test]
    fn hidden_nodes_are_not_hit() {
        let mut n = node_at("ghost", 0.0, 0.0);
        n.is_hidden = true;
        let nodes = vec![n];
        assert!(find_node_at_point(Point::new(10.0, 10.0), &nodes, None, 0.0).is_none());
    }

    #[test]
    fn marquee_collects_intersecting_nodes() {
        let nodes = vec![
            node_at("m1", 0.0, 0.0),
            node_at("m2", 100.0, 0.0),
            node_at("m3", 400.0, 400.0),
        ];
        let rect = Bounds::from_corners(Point::new(50.0, 50.0), Point::new(-10.0, -10.0));
        assert_eq!(nodes_in_rect(rect, &nodes), vec![NodeId::intern("m1")]);
        let rect = Bounds::from_corners(Point::new(-10.0, -10.0), Point::new(120.0, 20.0));
        assert_eq!(
            nodes_in_rect(rect, &nodes),
            vec![NodeId::intern("m1"), NodeId::intern("m2")]
        );
    }

    #[test]
    fn port_hit_uses_anchor_radius() {
        let n = node_at("p1", 0.0, 0.0);
        assert_eq!(
            find_port_at_point(Point::new(72.0, 33.0), &n, 6.0),
            Some((PortKind::Output, "out".to_string()))
        );
        assert_eq!(
            find_port_at_point(Point::new(0.0, 35.0), &n, 6.0),
            Some((PortKind::Input, "in".to_string()))
        );
        assert_eq!(find_port_at_point(Point::new(35.0, 35.0), &n, 6.0), None);
    }

    #[test]
    fn connection_hit_within_tolerance() {
        let nodes = vec![node_at("c1", 0.0, 0.0), node_at("c2", 200.0, 0.0)];
        let conns = vec![Connection::new(
            ConnectionId::intern("line"),
            NodeId::intern("c1"),
            NodeId::intern("c2"),
            ConnectionType::Straight,
        )];
        let routed = route_connections(&nodes, &conns);
        assert_eq!(
            find_connection_at_point(Point::new(130.0, 38.0), &routed, 5.0),
            Some(ConnectionId::intern("line"))
        );
        assert_eq!(find_connection_at_point(Point::new(130.0, 60.0), &routed, 5.0), None);
    }
}
