//! Node drag vs. click disambiguation.
//!
//! ```text
//! Idle ──down──▶ Pressed ──move > threshold──▶ Dragging ──up──▶ Idle (+ click suppression)
//!                   │
//!                   └──up──▶ Idle (click)
//! ```
//!
//! The machine works on screen coordinates for the threshold and converts
//! deltas to canvas space with the current zoom, so a drag feels the same at
//! every zoom level. It never touches the store: it reports the positions it
//! wants and the canvas applies them.

use crate::timer::PendingTimer;
use flow_core::{CanvasConfig, NodeId, Point, Vec2};

/// Current phase of a node gesture.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NodeDragState {
    #[default]
    Idle,
    /// Pointer is down on a node but hasn't moved past the threshold.
    Pressed {
        node: NodeId,
        start: Point,
        start_time: f64,
        multi: bool,
        /// Nodes that will move together, with their positions at press time.
        origins: Vec<(NodeId, Point)>,
    },
    /// Threshold exceeded; nodes follow the pointer.
    Dragging {
        node: NodeId,
        start: Point,
        origins: Vec<(NodeId, Point)>,
        moved: bool,
    },
}

/// What a pointer release meant.
#[derive(Debug, Clone, PartialEq)]
pub enum DragRelease {
    /// No gesture was in progress.
    None,
    /// Pressed and released without crossing the threshold.
    Click { node: NodeId, multi: bool },
    /// A drag finished; `moved` lists the nodes that followed it.
    Dropped { node: NodeId, moved: Vec<NodeId> },
}

/// The node drag state machine plus its click-suppression timer.
#[derive(Debug, Clone)]
pub struct NodeDrag {
    state: NodeDragState,
    suppress_click: PendingTimer,
    threshold: f64,
    suppress_ms: f64,
}

impl NodeDrag {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            state: NodeDragState::Idle,
            suppress_click: PendingTimer::new(),
            threshold: config.drag_threshold,
            suppress_ms: config.click_suppress_ms,
        }
    }

    pub fn state(&self) -> &NodeDragState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != NodeDragState::Idle
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, NodeDragState::Dragging { .. })
    }

    /// Pointer pressed on `node`. `origins` are the nodes that should move
    /// with it (may be empty, e.g. when the node is locked).
    pub fn pointer_down(
        &mut self,
        node: NodeId,
        screen: Point,
        now: f64,
        multi: bool,
        origins: Vec<(NodeId, Point)>,
    ) {
        log::trace!("node {node} pressed at ({}, {})", screen.x, screen.y);
        self.state = NodeDragState::Pressed {
            node,
            start: screen,
            start_time: now,
            multi,
            origins,
        };
    }

    /// Pointer moved. Returns true on the move that crosses the threshold.
    pub fn pointer_move(&mut self, screen: Point) -> bool {
        let NodeDragState::Pressed { start, .. } = &self.state else {
            return false;
        };
        if (screen - *start).hypot() <= self.threshold {
            return false;
        }
        let NodeDragState::Pressed {
            node,
            start,
            origins,
            ..
        } = std::mem::take(&mut self.state)
        else {
            return false;
        };
        log::trace!("node {node} drag started");
        self.state = NodeDragState::Dragging {
            node,
            start,
            origins,
            moved: false,
        };
        true
    }

    /// Target positions for every dragged node at the current pointer
    /// position, or empty if not dragging.
    pub fn positions(&mut self, screen: Point, zoom: f64) -> Vec<(NodeId, Point)> {
        let NodeDragState::Dragging {
            start,
            origins,
            moved,
            ..
        } = &mut self.state
        else {
            return Vec::new();
        };
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        let delta: Vec2 = (screen - *start) / zoom;
        *moved = true;
        origins.iter().map(|&(id, p)| (id, p + delta)).collect()
    }

    /// Pointer released. After a real drag the next synthetic click is
    /// swallowed for the suppression window.
    pub fn pointer_up(&mut self, now: f64) -> DragRelease {
        match std::mem::take(&mut self.state) {
            NodeDragState::Idle => DragRelease::None,
            NodeDragState::Pressed { node, multi, .. } => DragRelease::Click { node, multi },
            NodeDragState::Dragging {
                node,
                origins,
                moved,
                ..
            } => {
                self.suppress_click.schedule(now, self.suppress_ms);
                let moved = if moved {
                    origins.into_iter().map(|(id, _)| id).collect()
                } else {
                    Vec::new()
                };
                DragRelease::Dropped { node, moved }
            }
        }
    }

    /// Whether a synthetic click arriving at `now` should be delivered.
    pub fn accept_click(&mut self, now: f64) -> bool {
        if self.suppress_click.is_running_at(now) {
            log::trace!("click suppressed after drag");
            self.suppress_click.cancel();
            return false;
        }
        self.suppress_click.fire(now);
        true
    }

    /// Expire the suppression window.
    pub fn tick(&mut self, now: f64) -> bool {
        self.suppress_click.fire(now)
    }

    /// Abort any gesture and disarm the timer. Returns the origins of an
    /// interrupted drag so the caller can put the nodes back.
    pub fn cancel(&mut self) -> Vec<(NodeId, Point)> {
        self.suppress_click.cancel();
        match std::mem::take(&mut self.state) {
            NodeDragState::Dragging { origins, moved, .. } if moved => origins,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn drag() -> NodeDrag {
        NodeDrag::new(&CanvasConfig::default())
    }

    #[test]
    fn press_and_release_is_a_click() {
        let mut d = drag();
        d.pointer_down(id("dn"), Point::new(10.0, 10.0), 0.0, false, vec![(id("dn"), Point::ZERO)]);
        assert!(!d.pointer_move(Point::new(13.0, 13.0)));
        assert_eq!(
            d.pointer_up(80.0),
            DragRelease::Click {
                node: id("dn"),
                multi: false
            }
        );
        assert!(d.accept_click(81.0));
    }

    #[test]
    fn moving_past_threshold_drags_and_suppresses_click() {
        let mut d = drag();
        d.pointer_down(id("dn"), Point::new(10.0, 10.0), 0.0, false, vec![(id("dn"), Point::ZERO)]);
        assert!(d.pointer_move(Point::new(20.0, 10.0)));
        assert!(d.is_dragging());
        assert_eq!(
            d.positions(Point::new(20.0, 10.0), 1.0),
            vec![(id("dn"), Point::new(10.0, 0.0))]
        );
        assert_eq!(
            d.pointer_up(100.0),
            DragRelease::Dropped {
                node: id("dn"),
                moved: vec![id("dn")]
            }
        );
        assert!(!d.accept_click(110.0));
        // Only the first click is swallowed.
        assert!(d.accept_click(120.0));
    }

    #[test]
    fn suppression_expires() {
        let mut d = drag();
        d.pointer_down(id("dn"), Point::ZERO, 0.0, false, Vec::new());
        d.pointer_move(Point::new(0.0, 30.0));
        d.pointer_up(100.0);
        assert!(!d.tick(149.0));
        assert!(d.tick(150.0));
        assert!(d.accept_click(151.0));
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut d = drag();
        d.pointer_down(id("dn"), Point::ZERO, 0.0, false, Vec::new());
        assert!(!d.pointer_move(Point::new(3.0, 4.0)));
        assert!(!d.is_dragging());
    }

    #[test]
    fn deltas_scale_with_zoom() {
        let mut d = drag();
        let origins = vec![(id("da"), Point::new(100.0, 100.0)), (id("db"), Point::new(0.0, 0.0))];
        d.pointer_down(id("da"), Point::ZERO, 0.0, false, origins);
        d.pointer_move(Point::new(40.0, 20.0));
        assert_eq!(
            d.positions(Point::new(40.0, 20.0), 2.0),
            vec![(id("da"), Point::new(120.0, 110.0)), (id("db"), Point::new(20.0, 10.0))]
        );
    }

    #[test]
    fn cancel_returns_origins_of_moved_drag() {
        let mut d = drag();
        d.pointer_down(id("dc"), Point::ZERO, 0.0, false, vec![(id("dc"), Point::new(7.0, 7.0))]);
        assert!(d.cancel().is_empty());

        d.pointer_down(id("dc"), Point::ZERO, 0.0, false, vec![(id("dc"), Point::new(7.0, 7.0))]);
        d.pointer_move(Point::new(50.0, 0.0));
        d.positions(Point::new(50.0, 0.0), 1.0);
        assert_eq!(d.cancel(), vec![(id("dc"), Point::new(7.0, 7.0))]);
        assert!(!d.is_active());
        assert_eq!(d.pointer_up(1.0), DragRelease::None);
    }
}
