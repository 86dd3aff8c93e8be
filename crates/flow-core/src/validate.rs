//! Graph validation for new connections.
//!
//! Every edge added to a canvas passes through [`check_connection`]: no
//! self-loops, no duplicate `(from, to)` pairs, and the graph must stay a DAG.
//! The adjacency map is rebuilt per check; canvases hold tens to a few
//! hundred nodes, so O(V + E) per candidate is fine.

use crate::id::{ConnectionId, NodeId};
use crate::model::{Connection, Direction};
use petgraph::graphmap::DiGraphMap;
use std::collections::HashSet;
use std::fmt;

/// Why a connection was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRejection {
    /// Source and target are the same node.
    SelfLoop,
    /// A connection with the same `(from, to)` pair already exists.
    Duplicate,
    /// The edge would close a directed cycle.
    Cycle,
    /// One of the endpoints is not on the canvas.
    UnknownNode(NodeId),
    /// The requested connection ID is already taken.
    IdInUse,
}

impl fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRejection::SelfLoop => write!(f, "a node cannot connect to itself"),
            ConnectionRejection::Duplicate => write!(f, "these nodes are already connected"),
            ConnectionRejection::Cycle => write!(f, "connection would create a cycle"),
            ConnectionRejection::UnknownNode(id) => write!(f, "node `{id}` does not exist"),
            ConnectionRejection::IdInUse => write!(f, "connection id is already in use"),
        }
    }
}

impl std::error::Error for ConnectionRejection {}

/// Build the directed adjacency map of a connection set.
pub fn adjacency(connections: &[Connection]) -> DiGraphMap<NodeId, ()> {
    let mut graph = DiGraphMap::with_capacity(connections.len() * 2, connections.len());
    for conn in connections {
        graph.add_edge(conn.from, conn.to, ());
    }
    graph
}

/// Whether adding `from → to` to `connections` would create a directed cycle.
///
/// Runs a DFS over every node with an explicit recursion stack and reports
/// the first back-edge.
pub fn would_create_cycle(connections: &[Connection], from: NodeId, to: NodeId) -> bool {
    let mut graph = adjacency(connections);
    graph.add_edge(from, to, ());

    let mut visited = HashSet::with_capacity(graph.node_count());
    let mut on_stack = HashSet::new();
    graph
        .nodes()
        .any(|start| !visited.contains(&start) && has_back_edge(&graph, start, &mut visited, &mut on_stack))
}

fn has_back_edge(
    graph: &DiGraphMap<NodeId, ()>,
    node: NodeId,
    visited: &mut HashSet<NodeId>,
    on_stack: &mut HashSet<NodeId>,
) -> bool {
    visited.insert(node);
    on_stack.insert(node);

    for next in graph.neighbors(node) {
        if on_stack.contains(&next) {
            return true;
        }
        if !visited.contains(&next) && has_back_edge(graph, next, visited, on_stack) {
            return true;
        }
    }

    on_stack.remove(&node);
    false
}

/// Check a candidate edge against the structural rules.
///
/// # Errors
/// Returns the first rule the edge breaks, checked in the order self-loop,
/// duplicate, cycle.
pub fn check_connection(
    from: NodeId,
    to: NodeId,
    connections: &[Connection],
) -> Result<(), ConnectionRejection> {
    if from == to {
        return Err(ConnectionRejection::SelfLoop);
    }
    if connections.iter().any(|c| c.from == from && c.to == to) {
        return Err(ConnectionRejection::Duplicate);
    }
    if would_create_cycle(connections, from, to) {
        return Err(ConnectionRejection::Cycle);
    }
    Ok(())
}

/// Boolean form of [`check_connection`].
pub fn is_valid_connection(from: NodeId, to: NodeId, connections: &[Connection]) -> bool {
    check_connection(from, to, connections).is_ok()
}

/// Result of checking a whole connection set, as loaded from a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionAudit {
    /// Connections that keep the graph a DAG, in input order.
    pub accepted: Vec<Connection>,
    /// Connections refused, with the reason.
    pub rejected: Vec<(Connection, ConnectionRejection)>,
    /// Accepted connections with an endpoint that is not on the canvas.
    pub dangling: Vec<(ConnectionId, NodeId)>,
}

impl ConnectionAudit {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.dangling.is_empty()
    }
}

/// Replay `connections` one by one through [`check_connection`] against
/// the ones accepted so far; a structurally valid edge with a reused ID is
/// refused with [`ConnectionRejection::IdInUse`]. Dangling endpoints are kept and
/// reported; `known` says whether a node exists.
pub fn audit_connections(
    connections: Vec<Connection>,
    known: impl Fn(NodeId) -> bool,
) -> ConnectionAudit {
    let mut audit = ConnectionAudit::default();
    let mut ids = HashSet::with_capacity(connections.len());
    for conn in connections {
        let verdict = check_connection(conn.from, conn.to, &audit.accepted).and_then(|()| {
            if ids.contains(&conn.id) {
                Err(ConnectionRejection::IdInUse)
            } else {
                Ok(())
            }
        });
        match verdict {
            Ok(()) => {
                for end in [conn.from, conn.to] {
                    if !known(end) {
                        audit.dangling.push((conn.id, end));
                    }
                }
                ids.insert(conn.id);
                audit.accepted.push(conn);
            }
            Err(reason) => audit.rejected.push((conn, reason)),
        }
    }
    audit
}

/// Nodes directly linked to `node` in the given direction, in edge order.
pub fn neighbors(connections: &[Connection], node: NodeId, direction: Direction) -> Vec<NodeId> {
    let graph = adjacency(connections);
    if !graph.contains_node(node) {
        return Vec::new();
    }
    let mut out: Vec<NodeId> = match direction {
        Direction::Outgoing => graph
            .neighbors_directed(node, petgraph::Direction::Outgoing)
            .collect(),
        Direction::Incoming => graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .collect(),
        Direction::Both => graph
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .chain(graph.neighbors_directed(node, petgraph::Direction::Outgoing))
            .collect(),
    };
    let mut seen = HashSet::new();
    out.retain(|id| seen.insert(*id));
    out
}
