//! Input abstraction layer.
//!
//! Normalizes host pointer, wheel, and keyboard events into a unified
//! `InputEvent` enum consumed by the canvas. Pointer coordinates are in
//! screen space relative to the canvas element; timestamps are the host's
//! clock in milliseconds.

use flow_core::{NodeId, Point, PortKind};
use serde::{Deserialize, Serialize};

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    /// Platform command key: ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Modifiers that toggle a node in or out of the selection.
    pub fn multi_select(&self) -> bool {
        self.shift || self.command()
    }
}

/// Which pointer button triggered a press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map a DOM `MouseEvent.button` code.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

/// What the host says was pressed.
///
/// Nodes themselves are hit-tested by the canvas; only affordances the
/// canvas doesn't own geometry for (the floating plus indicator) or that
/// the host renders (ports) are reported explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PointerTarget {
    #[default]
    Canvas,
    /// The "+" button that starts a connection from a node's output.
    PlusIndicator { node: NodeId },
    /// A specific port handle.
    Port {
        node: NodeId,
        port: String,
        #[serde(rename = "portKind")]
        port_kind: PortKind,
    },
}

/// A normalized input event from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer pressed.
    PointerDown {
        x: f64,
        y: f64,
        button: PointerButton,
        modifiers: Modifiers,
        target: PointerTarget,
        time_ms: f64,
    },

    /// Pointer moved.
    PointerMove {
        x: f64,
        y: f64,
        modifiers: Modifiers,
        time_ms: f64,
    },

    /// Pointer released. Hosts forward window-level releases too, so a
    /// pan or drag never stays stuck when the pointer leaves the canvas.
    PointerUp {
        x: f64,
        y: f64,
        modifiers: Modifiers,
        time_ms: f64,
    },

    /// The gesture was aborted by the platform (pointercancel, blur).
    PointerCancel { time_ms: f64 },

    /// Synthetic click the host dispatches after a pointer release.
    Click {
        x: f64,
        y: f64,
        modifiers: Modifiers,
        time_ms: f64,
    },

    /// Wheel / trackpad scroll. Pinch gestures arrive with `ctrl` set.
    Wheel {
        x: f64,
        y: f64,
        dx: f64,
        dy: f64,
        modifiers: Modifiers,
    },

    /// Keyboard shortcut.
    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    /// Shorthand for a primary-button press on the canvas.
    pub fn pointer_down(x: f64, y: f64, modifiers: Modifiers, time_ms: f64) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers,
            target: PointerTarget::Canvas,
            time_ms,
        }
    }

    pub fn pointer_move(x: f64, y: f64, modifiers: Modifiers, time_ms: f64) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers,
            time_ms,
        }
    }

    pub fn pointer_up(x: f64, y: f64, modifiers: Modifiers, time_ms: f64) -> Self {
        Self::PointerUp {
            x,
            y,
            modifiers,
            time_ms,
        }
    }

    /// Extract position if this is a positioned event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::Click { x, y, .. }
            | Self::Wheel { x, y, .. } => Some(Point::new(*x, *y)),
            Self::PointerCancel { .. } | Self::Key { .. } => None,
        }
    }

    /// Host timestamp, if the event carries one.
    pub fn time_ms(&self) -> Option<f64> {
        match self {
            Self::PointerDown { time_ms, .. }
            | Self::PointerMove { time_ms, .. }
            | Self::PointerUp { time_ms, .. }
            | Self::PointerCancel { time_ms }
            | Self::Click { time_ms, .. } => Some(*time_ms),
            Self::Wheel { .. } | Self::Key { .. } => None,
        }
    }
}
