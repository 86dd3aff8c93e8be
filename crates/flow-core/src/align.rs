//! Alignment of several nodes against their shared bounding box.

use crate::id::NodeId;
use crate::model::{Bounds, Node};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Edge or centreline to align against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignDirection {
    /// Left edges line up (sets `x`).
    Left,
    /// Right edges line up (sets `x`).
    Right,
    /// Vertical centrelines line up (sets `x`).
    Center,
    /// Horizontal centrelines line up (sets `y`).
    Middle,
    /// Top edges line up (sets `y`).
    Top,
    /// Bottom edges line up (sets `y`).
    Bottom,
}

/// Compute aligned positions for `nodes`.
///
/// Returns the new top-left corner for every node, in input order. Fewer
/// than two nodes is a no-op and yields an empty list.
pub fn align_positions(nodes: &[&Node], direction: AlignDirection) -> Vec<(NodeId, Point)> {
    if nodes.len() < 2 {
        return Vec::new();
    }
    let Some(bbox) = Bounds::enclosing(nodes.iter().map(|n| n.bounds())) else {
        return Vec::new();
    };
    let center = bbox.center();

    nodes
        .iter()
        .map(|n| {
            let Point { x, y } = n.position;
            let target = match direction {
                AlignDirection::Left => Point::new(bbox.x, y),
                AlignDirection::Right => Point::new(bbox.right() - n.width(), y),
                AlignDirection::Center => Point::new(center.x - n.width() / 2.0, y),
                AlignDirection::Middle => Point::new(x, center.y - n.height() / 2.0),
                AlignDirection::Top => Point::new(x, bbox.y),
                AlignDirection::Bottom => Point::new(x, bbox.bottom() - n.height()),
            };
            (n.id, target)
        })
        .collect()
}
