//! Transform controller: pan and zoom of the canvas viewport.
//!
//! The viewport maps canvas space to screen space as
//! `screen = canvas * zoom + (x, y)`. Zoom is always kept inside the
//! configured `[min_zoom, max_zoom]` range.

use crate::input::{Modifiers, PointerButton};
use flow_core::{Bounds, CanvasConfig, CanvasSize, Node, Point, Vec2, Viewport, ViewportPatch};

/// Owns the viewport plus the transient drag-to-pan state.
#[derive(Debug, Clone)]
pub struct TransformController {
    viewport: Viewport,
    initial: Viewport,
    size: CanvasSize,
    min_zoom: f64,
    max_zoom: f64,
    zoom_step: f64,
    wheel_zoom_step: f64,
    fit_padding: f64,
    /// Last pointer position while a drag-to-pan is active.
    pan_anchor: Option<Point>,
}

impl TransformController {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            viewport: config.initial_viewport,
            initial: config.initial_viewport,
            size: CanvasSize::default(),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            zoom_step: config.zoom_step,
            wheel_zoom_step: config.wheel_zoom_step,
            fit_padding: config.fit_padding,
            pan_anchor: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    /// Track the host element size (needed for `zoom_to_fit`).
    pub fn resize(&mut self, size: CanvasSize) {
        self.size = size;
    }

    fn clamp(&self, zoom: f64) -> f64 {
        if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            self.viewport.zoom
        }
    }

    /// Replace the whole viewport (import). Zoom is clamped.
    pub fn replace(&mut self, viewport: Viewport) {
        self.viewport = Viewport {
            zoom: self.clamp(viewport.zoom),
            ..viewport
        };
    }

    /// Apply a partial update. Returns true if anything changed.
    pub fn set_viewport(&mut self, patch: ViewportPatch) -> bool {
        let before = self.viewport;
        if let Some(x) = patch.x.filter(|v| v.is_finite()) {
            self.viewport.x = x;
        }
        if let Some(y) = patch.y.filter(|v| v.is_finite()) {
            self.viewport.y = y;
        }
        if let Some(zoom) = patch.zoom {
            self.viewport.zoom = self.clamp(zoom);
        }
        self.viewport != before
    }

    // ─── Zoom ────────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) -> bool {
        self.set_zoom(self.viewport.zoom * self.zoom_step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.set_zoom(self.viewport.zoom / self.zoom_step)
    }

    fn set_zoom(&mut self, zoom: f64) -> bool {
        let zoom = self.clamp(zoom);
        let changed = zoom != self.viewport.zoom;
        self.viewport.zoom = zoom;
        changed
    }

    /// Restore the configured initial viewport.
    pub fn reset_view(&mut self) -> bool {
        let changed = self.viewport != self.initial;
        self.viewport = self.initial;
        changed
    }

    /// Zoom by `factor` keeping the canvas point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) -> bool {
        let anchor = self.viewport.screen_to_canvas(screen);
        let zoom = self.clamp(self.viewport.zoom * factor);
        if zoom == self.viewport.zoom {
            return false;
        }
        self.viewport = Viewport {
            x: screen.x - anchor.x * zoom,
            y: screen.y - anchor.y * zoom,
            zoom,
        };
        true
    }

    /// Wheel / trackpad input. With ctrl or meta held it zooms around the
    /// cursor; otherwise it pans along the dominant scroll axis, or
    /// horizontally when shift is held.
    pub fn handle_wheel(&mut self, cursor: Point, delta: Vec2, modifiers: Modifiers) -> bool {
        if modifiers.command() {
            if delta.y == 0.0 {
                return false;
            }
            let factor = if delta.y < 0.0 {
                self.wheel_zoom_step
            } else {
                1.0 / self.wheel_zoom_step
            };
            return self.zoom_at(cursor, factor);
        }

        let horizontal = modifiers.shift || delta.x.abs() > delta.y.abs();
        if horizontal {
            let dx = if delta.x != 0.0 { delta.x } else { delta.y };
            if dx == 0.0 {
                return false;
            }
            self.viewport.x -= dx;
        } else {
            if delta.y == 0.0 {
                return false;
            }
            self.viewport.y -= delta.y;
        }
        true
    }

    // ─── Drag to pan ─────────────────────────────────────────────────────

    /// Whether a press should start panning instead of selecting: middle
    /// button, or primary with alt (or the host's space-held flag).
    pub fn is_pan_trigger(button: PointerButton, modifiers: Modifiers, space_held: bool) -> bool {
        match button {
            PointerButton::Middle => true,
            PointerButton::Primary => modifiers.alt || space_held,
            PointerButton::Secondary => false,
        }
    }

    pub fn begin_pan(&mut self, screen: Point) {
        log::trace!("pan start at ({}, {})", screen.x, screen.y);
        self.pan_anchor = Some(screen);
    }

    /// Follow the pointer while panning. Returns true if the viewport moved.
    pub fn update_pan(&mut self, screen: Point) -> bool {
        let Some(last) = self.pan_anchor else {
            return false;
        };
        let delta = screen - last;
        self.pan_anchor = Some(screen);
        if delta == Vec2::ZERO {
            return false;
        }
        self.viewport.x += delta.x;
        self.viewport.y += delta.y;
        true
    }

    /// Stop panning. Returns true if a pan was active.
    pub fn end_pan(&mut self) -> bool {
        self.pan_anchor.take().is_some()
    }

    pub fn is_panning(&self) -> bool {
        self.pan_anchor.is_some()
    }

    // ─── Fit ─────────────────────────────────────────────────────────────

    /// Fit every visible node into the canvas. Never zooms in past 1.0;
    /// an empty canvas resets the view.
    pub fn zoom_to_fit(&mut self, nodes: &[Node]) -> bool {
        let visible = nodes.iter().filter(|n| !n.is_hidden).map(Node::bounds);
        let Some(bbox) = Bounds::enclosing(visible) else {
            return self.reset_view();
        };
        let padded = bbox.inflate(self.fit_padding);
        let fit = (self.size.width / padded.width)
            .min(self.size.height / padded.height)
            .min(1.0);
        let zoom = self.clamp(fit);
        let center = padded.center();
        let next = Viewport {
            x: self.size.width / 2.0 - center.x * zoom,
            y: self.size.height / 2.0 - center.y * zoom,
            zoom,
        };
        let changed = next != self.viewport;
        self.viewport = next;
        changed
    }

    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        self.viewport.screen_to_canvas(screen)
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        self.viewport.canvas_to_screen(canvas)
    }
}
