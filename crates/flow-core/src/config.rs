//! Canvas configuration.
//!
//! Every tunable of the canvas engine lives here so hosts can override them
//! in one place (the wasm bridge accepts this struct as JSON). Missing
//! fields fall back to [`CanvasConfig::default`].

use crate::model::{Viewport, from_json_object};
use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

/// Configuration for the canvas store, transform controller, and
/// interaction state machines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Lower zoom bound. Default: **0.1**.
    pub min_zoom: f64,
    /// Upper zoom bound. Default: **2.0**.
    pub max_zoom: f64,
    /// Factor applied by `zoom_in` / divided by `zoom_out`. Default: **1.2**.
    pub zoom_step: f64,
    /// Factor applied per wheel notch when zooming with a modifier held. Default: **1.1**.
    pub wheel_zoom_step: f64,
    /// Viewport restored by `reset_view`.
    pub initial_viewport: Viewport,

    /// Pointer displacement (screen px) that turns a press into a drag. Default: **5**.
    pub drag_threshold: f64,
    /// Snap dragged node positions to the grid. Default: **false**.
    pub snap_to_grid: bool,
    /// Grid cell size in canvas units. Default: **20**.
    pub grid_size: f64,

    /// Margin around nodes when searching for a connection drop target. Default: **10**.
    pub hit_margin: f64,
    /// Distance within which a click selects a connection curve. Default: **6**.
    pub connection_hit_tolerance: f64,

    /// How long the synthetic click after a drag is swallowed (ms). Default: **50**.
    pub click_suppress_ms: f64,
    /// Delay before contextual node actions hide after the pointer leaves (ms). Default: **100**.
    pub hover_hide_delay_ms: f64,
    /// How long a previously valid drop target stays eligible (ms). Default: **300**.
    pub drop_grace_ms: f64,

    /// Padding around the node bounding box for `zoom_to_fit`. Default: **50**.
    pub fit_padding: f64,
    /// Offset applied to duplicated nodes. Default: **20**.
    pub duplicate_offset: f64,
    /// Maximum undo depth. Default: **100**.
    pub undo_depth: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 2.0,
            zoom_step: 1.2,
            wheel_zoom_step: 1.1,
            initial_viewport: Viewport::default(),
            drag_threshold: 5.0,
            snap_to_grid: false,
            grid_size: 20.0,
            hit_margin: 10.0,
            connection_hit_tolerance: 6.0,
            click_suppress_ms: 50.0,
            hover_hide_delay_ms: 100.0,
            drop_grace_ms: 300.0,
            fit_padding: 50.0,
            duplicate_offset: 20.0,
            undo_depth: 100,
        }
    }
}

impl CanvasConfig {
    /// Parse a (possibly partial) JSON config. Unknown fields are ignored.
    ///
    /// # Errors
    /// Returns the `serde_json` error if the text is not a JSON object of the
    /// expected shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = from_json_object(json)?;
        config.normalize();
        Ok(config)
    }

    /// Clamp a zoom value to the configured bounds.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Repair inconsistent values instead of failing later inside `clamp`.
    fn normalize(&mut self) {
        if !(self.min_zoom > 0.0) {
            log::warn!("minZoom {} is not positive, using 0.1", self.min_zoom);
            self.min_zoom = 0.1;
        }
        if !(self.max_zoom >= self.min_zoom) {
            log::warn!(
                "maxZoom {} is below minZoom {}, swapping",
                self.max_zoom,
                self.min_zoom
            );
            let max = self.min_zoom.max(self.max_zoom);
            self.min_zoom = self.min_zoom.min(self.max_zoom).max(f64::MIN_POSITIVE);
            self.max_zoom = if max.is_finite() { max } else { 2.0 };
        }
        if !(self.zoom_step > 1.0) {
            self.zoom_step = 1.2;
        }
        if !(self.wheel_zoom_step > 1.0) {
            self.wheel_zoom_step = 1.1;
        }
        if !(self.grid_size > 0.0) {
            self.grid_size = 20.0;
        }
        self.initial_viewport.zoom = self.clamp_zoom(self.initial_viewport.zoom);
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CanvasConfig::from_json(r#"{"dropGraceMs": 450, "snapToGrid": true}"#).unwrap();
        assert_eq!(config.drop_grace_ms, 450.0);
        assert!(config.snap_to_grid);
        assert_eq!(config.min_zoom, 0.1);
        assert_eq!(config.max_zoom, 2.0);
        assert_eq!(config.drag_threshold, 5.0);
    }

    #[test]
    fn inverted_zoom_bounds_are_repaired() {
        let config = CanvasConfig::from_json(r#"{"minZoom": 3.0, "maxZoom": 0.5}"#).unwrap();
        assert_eq!(config.min_zoom, 0.5);
        assert_eq!(config.max_zoom, 3.0);
    }

    #[test]
    fn initial_viewport_zoom_is_clamped() {
        let config =
            CanvasConfig::from_json(r#"{"initialViewport": {"x": 10, "y": 0, "zoom": 9}}"#).unwrap();
        assert_eq!(config.initial_viewport.zoom, 2.0);
        assert_eq!(config.initial_viewport.x, 10.0);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(CanvasConfig::from_json("[1, 2]").is_err());
        assert!(CanvasConfig::from_json("2").is_err());
        assert!(CanvasConfig::from_json("{\"minZoom\": ").is_err());
    }
}
