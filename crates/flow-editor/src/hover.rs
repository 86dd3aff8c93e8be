//! Hover intent for contextual node actions.
//!
//! Node actions (plus indicator, quick toolbar) appear while the pointer is
//! over a node and linger briefly after it leaves, so the pointer can travel
//! from the node onto the floating actions without them vanishing.

use crate::timer::PendingTimer;
use flow_core::{CanvasConfig, NodeId};

#[derive(Debug, Clone)]
pub struct HoverIntent {
    hovered: Option<NodeId>,
    hide: PendingTimer,
    delay_ms: f64,
}

impl HoverIntent {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            hovered: None,
            hide: PendingTimer::new(),
            delay_ms: config.hover_hide_delay_ms,
        }
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Pointer is over `node`. Switching nodes takes effect immediately.
    pub fn enter(&mut self, node: NodeId) -> bool {
        self.hide.cancel();
        if self.hovered == Some(node) {
            return false;
        }
        self.hovered = Some(node);
        true
    }

    /// Pointer left the node (or its actions); hide after the delay.
    /// The delay runs from the first call; further calls while it is
    /// pending (the pointer still moving over the background) keep it.
    pub fn leave(&mut self, now: f64) {
        if self.hovered.is_some() && !self.hide.is_pending() {
            self.hide.schedule(now, self.delay_ms);
        }
    }

    /// Pointer entered the floating actions of the hovered node.
    pub fn hold(&mut self) {
        self.hide.cancel();
    }

    /// Hide now if the delay elapsed. Returns true if the hover cleared.
    pub fn tick(&mut self, now: f64) -> bool {
        if self.hide.fire(now) {
            return self.hovered.take().is_some();
        }
        false
    }

    /// Drop the hover immediately (node removed, canvas torn down).
    pub fn clear(&mut self) -> bool {
        self.hide.cancel();
        self.hovered.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    #[test]
    fn leave_hides_after_delay() {
        let mut h = HoverIntent::new(&CanvasConfig::default());
        assert!(h.enter(id("hv")));
        h.leave(1000.0);
        assert!(!h.tick(1099.0));
        assert_eq!(h.hovered(), Some(id("hv")));
        assert!(h.tick(1100.0));
        assert_eq!(h.hovered(), None);
    }

    #[test]
    fn repeated_leave_keeps_first_deadline() {
        let mut h = HoverIntent::new(&CanvasConfig::default());
        h.enter(id("hv"));
        h.leave(0.0);
        h.leave(60.0);
        h.leave(90.0);
        assert!(h.tick(100.0));
        assert_eq!(h.hovered(), None);
    }

    #[test]
    fn reentering_cancels_hide() {
        let mut h = HoverIntent::new(&CanvasConfig::default());
        h.enter(id("hv"));
        h.leave(0.0);
        h.hold();
        assert!(!h.tick(500.0));
        assert_eq!(h.hovered(), Some(id("hv")));
        h.leave(500.0);
        assert!(!h.enter(id("hv")));
        assert!(!h.tick(1000.0));
    }

    #[test]
    fn switching_nodes_is_immediate() {
        let mut h = HoverIntent::new(&CanvasConfig::default());
        h.enter(id("hv1"));
        h.leave(0.0);
        assert!(h.enter(id("hv2")));
        assert_eq!(h.hovered(), Some(id("hv2")));
        assert!(h.clear());
    }
}
