//! Integration tests: structural and interaction guarantees of the canvas.
//!
//! Drives `FlowCanvas` the way a host would (pointer events with
//! timestamps) and checks the graph invariants through the public store.

use flow_core::geometry::{calculate_connection_path, node_input_position, node_output_position};
use flow_core::{
    CanvasConfig, ConnectionRejection, ConnectionType, Node, NodeId, Point, Viewport,
    is_point_in_node, would_create_cycle,
};
use flow_editor::{CanvasStore, FlowCanvas, InputEvent, Modifiers, PointerButton, PointerTarget};
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn id(s: &str) -> NodeId {
    NodeId::intern(s)
}

fn store_with(nodes: &[(&str, f64, f64)]) -> CanvasStore {
    let mut store = CanvasStore::default();
    for (name, x, y) in nodes {
        store.add_node(Node::new(id(name), "task", Point::new(*x, *y)));
    }
    store
}

// ─── Graph validation ───────────────────────────────────────────────────

#[test]
fn cycle_rejection() {
    init_logging();
    let mut store = store_with(&[("A", 0.0, 0.0), ("B", 200.0, 0.0), ("C", 400.0, 0.0), ("D", 600.0, 0.0)]);
    store.add_connection(id("A"), id("B"), ConnectionType::Bezier, None, None).unwrap();
    store.add_connection(id("B"), id("C"), ConnectionType::Bezier, None, None).unwrap();

    assert_eq!(
        store.add_connection(id("A"), id("A"), ConnectionType::Bezier, None, None),
        Err(ConnectionRejection::SelfLoop)
    );
    assert_eq!(
        store.add_connection(id("C"), id("A"), ConnectionType::Bezier, None, None),
        Err(ConnectionRejection::Cycle)
    );
    assert!(store.add_connection(id("A"), id("D"), ConnectionType::Bezier, None, None).is_ok());
    assert_eq!(store.connections().len(), 3);
}

#[test]
fn duplicate_rejection() {
    let mut store = store_with(&[("A", 0.0, 0.0), ("B", 200.0, 0.0)]);
    assert!(store.add_connection(id("A"), id("B"), ConnectionType::Bezier, None, None).is_ok());
    assert_eq!(
        store.add_connection(id("A"), id("B"), ConnectionType::Straight, None, None),
        Err(ConnectionRejection::Duplicate)
    );
    let pairs: Vec<(NodeId, NodeId)> = store.connections().iter().map(|c| (c.from, c.to)).collect();
    assert_eq!(pairs, vec![(id("A"), id("B"))]);
}

#[test]
fn two_node_scenario() {
    let mut store = store_with(&[("A", 0.0, 0.0), ("B", 200.0, 0.0)]);
    assert!(store.add_connection(id("A"), id("B"), ConnectionType::Bezier, None, None).is_ok());
    assert!(would_create_cycle(store.connections(), id("B"), id("A")));
    assert!(store.add_connection(id("B"), id("A"), ConnectionType::Bezier, None, None).is_err());
    assert!(!store.is_valid_connection(id("B"), id("A")));
}

// ─── Geometry ───────────────────────────────────────────────────────────

#[test]
fn hit_testing_boundaries() {
    let node = Node::new(id("hit"), "task", Point::new(100.0, 100.0)).with_size(70.0, 70.0);
    assert!(is_point_in_node(Point::new(100.0, 100.0), &node, 0.0));
    assert!(is_point_in_node(Point::new(170.0, 170.0), &node, 0.0));
    assert!(!is_point_in_node(Point::new(171.0, 100.0), &node, 0.0));
    assert!(is_point_in_node(Point::new(171.0, 100.0), &node, 10.0));
}

#[test]
fn straight_path_endpoints_match_ports() {
    let a = Node::new(id("pA"), "task", Point::new(0.0, 0.0));
    let b = Node::new(id("pB"), "task", Point::new(300.0, 120.0)).with_size(100.0, 40.0);
    let path = calculate_connection_path(&a, &b, ConnectionType::Straight);
    assert_eq!(path.from(), node_output_position(&a));
    assert_eq!(path.to(), node_input_position(&b));
    assert_eq!((path.to_x, path.to_y), (300.0, 140.0));
}

// ─── Viewport ───────────────────────────────────────────────────────────

#[test]
fn zoom_stays_clamped() {
    let mut store = CanvasStore::default();
    let pattern = [true, true, false, true, true, true, true, true, true, false, false];
    for _ in 0..20 {
        for zoom_in in pattern {
            if zoom_in {
                store.zoom_in();
            } else {
                store.zoom_out();
            }
            let zoom = store.viewport().zoom;
            assert!((0.1..=2.0).contains(&zoom), "zoom {zoom} escaped bounds");
        }
    }
    for _ in 0..40 {
        store.zoom_out();
    }
    assert_eq!(store.viewport().zoom, 0.1);
}

#[test]
fn wheel_zoom_keeps_cursor_anchored() {
    let mut canvas = FlowCanvas::default();
    canvas.store_mut().set_viewport(flow_core::ViewportPatch {
        x: Some(-123.5),
        y: Some(48.25),
        zoom: Some(0.65),
    });
    let cursor = Point::new(317.0, 211.0);
    let before = canvas.store().transform().screen_to_canvas(cursor);

    for dy in [-120.0, -40.0, 80.0, -3.0] {
        canvas.handle(InputEvent::Wheel {
            x: cursor.x,
            y: cursor.y,
            dx: 0.0,
            dy,
            modifiers: Modifiers::CTRL,
        });
        let after = canvas.store().transform().screen_to_canvas(cursor);
        assert!((after.x - before.x).abs() < 1e-9);
        assert!((after.y - before.y).abs() < 1e-9);
    }
    assert_ne!(canvas.store().viewport(), Viewport::default());
}

// ─── Interaction ────────────────────────────────────────────────────────

fn drag_canvas() -> FlowCanvas {
    let mut canvas = FlowCanvas::default();
    canvas
        .store_mut()
        .add_node(Node::new(id("dragged"), "task", Point::new(100.0, 100.0)));
    canvas
}

#[test]
fn ten_pixel_drag_is_not_a_click() {
    let mut canvas = drag_canvas();
    canvas.handle(InputEvent::pointer_down(120.0, 120.0, Modifiers::NONE, 0.0));
    canvas.handle(InputEvent::pointer_move(130.0, 120.0, Modifiers::NONE, 16.0));
    let up = canvas.handle(InputEvent::pointer_up(130.0, 120.0, Modifiers::NONE, 32.0));
    assert_eq!(up.clicked_node, None);
    assert_eq!(
        canvas.store().node(id("dragged")).unwrap().position,
        Point::new(110.0, 100.0)
    );
    assert!(canvas.store().selection().is_empty());
}

#[test]
fn press_release_is_a_click() {
    let mut canvas = drag_canvas();
    canvas.handle(InputEvent::pointer_down(120.0, 120.0, Modifiers::NONE, 0.0));
    let up = canvas.handle(InputEvent::pointer_up(120.0, 120.0, Modifiers::NONE, 90.0));
    assert_eq!(up.clicked_node, Some(id("dragged")));
    let click = canvas.handle(InputEvent::Click {
        x: 120.0,
        y: 120.0,
        modifiers: Modifiers::NONE,
        time_ms: 91.0,
    });
    assert!(!click.click_suppressed);
}

#[test]
fn drag_distance_scales_with_zoom() {
    let mut canvas = drag_canvas();
    canvas.store_mut().set_viewport(flow_core::ViewportPatch {
        zoom: Some(2.0),
        ..Default::default()
    });
    // Node occupies screen [200, 340] at zoom 2.
    canvas.handle(InputEvent::pointer_down(250.0, 250.0, Modifiers::NONE, 0.0));
    canvas.handle(InputEvent::pointer_move(290.0, 250.0, Modifiers::NONE, 10.0));
    canvas.handle(InputEvent::pointer_up(290.0, 250.0, Modifiers::NONE, 20.0));
    assert_eq!(
        canvas.store().node(id("dragged")).unwrap().position,
        Point::new(120.0, 100.0)
    );
}

#[test]
fn locked_node_clicks_but_does_not_move() {
    let mut canvas = drag_canvas();
    canvas.store_mut().toggle_node_locked(id("dragged"), Some(true));
    canvas.handle(InputEvent::pointer_down(120.0, 120.0, Modifiers::NONE, 0.0));
    canvas.handle(InputEvent::pointer_move(180.0, 160.0, Modifiers::NONE, 10.0));
    canvas.handle(InputEvent::pointer_up(180.0, 160.0, Modifiers::NONE, 20.0));
    assert_eq!(
        canvas.store().node(id("dragged")).unwrap().position,
        Point::new(100.0, 100.0)
    );
    assert!(!canvas.can_undo());
}

#[test]
fn snapping_applies_while_dragging() {
    let config = CanvasConfig {
        snap_to_grid: true,
        grid_size: 25.0,
        ..Default::default()
    };
    let mut canvas = FlowCanvas::new(config);
    canvas
        .store_mut()
        .add_node(Node::new(id("snapped"), "task", Point::new(0.0, 0.0)));
    canvas.handle(InputEvent::pointer_down(10.0, 10.0, Modifiers::NONE, 0.0));
    canvas.handle(InputEvent::pointer_move(47.0, 22.0, Modifiers::NONE, 5.0));
    canvas.handle(InputEvent::pointer_up(47.0, 22.0, Modifiers::NONE, 10.0));
    assert_eq!(
        canvas.store().node(id("snapped")).unwrap().position,
        Point::new(25.0, 0.0)
    );
}

fn plus_press(node: &str, x: f64, y: f64, time_ms: f64) -> InputEvent {
    InputEvent::PointerDown {
        x,
        y,
        button: PointerButton::Primary,
        modifiers: Modifiers::NONE,
        target: PointerTarget::PlusIndicator { node: id(node) },
        time_ms,
    }
}

fn pair_canvas(config: CanvasConfig) -> FlowCanvas {
    let mut canvas = FlowCanvas::new(config);
    canvas.store_mut().add_node(Node::new(id("src"), "task", Point::new(0.0, 0.0)));
    canvas.store_mut().add_node(Node::new(id("dst"), "task", Point::new(200.0, 0.0)));
    canvas
}

#[test]
fn overshooting_release_commits_within_grace_window() {
    init_logging();
    let mut canvas = pair_canvas(CanvasConfig::default());
    canvas.handle(plus_press("src", 70.0, 35.0, 0.0));
    canvas.handle(InputEvent::pointer_move(205.0, 35.0, Modifiers::NONE, 100.0));
    canvas.handle(InputEvent::pointer_move(150.0, 200.0, Modifiers::NONE, 180.0));
    let up = canvas.handle(InputEvent::pointer_up(150.0, 200.0, Modifiers::NONE, 350.0));
    assert!(up.connected.is_some());
    assert!(canvas.store().has_incoming_connections(id("dst")));
}

#[test]
fn late_release_outside_grace_window_is_discarded() {
    let mut canvas = pair_canvas(CanvasConfig::default());
    canvas.handle(plus_press("src", 70.0, 35.0, 0.0));
    canvas.handle(InputEvent::pointer_move(205.0, 35.0, Modifiers::NONE, 100.0));
    canvas.handle(InputEvent::pointer_move(150.0, 200.0, Modifiers::NONE, 180.0));
    let up = canvas.handle(InputEvent::pointer_up(150.0, 200.0, Modifiers::NONE, 450.0));
    assert_eq!(up.connected, None);
    assert!(canvas.store().connections().is_empty());
    assert!(!canvas.can_undo());
}

#[test]
fn custom_grace_window() {
    let config = CanvasConfig::from_json(r#"{"dropGraceMs": 1000}"#).unwrap();
    let mut canvas = pair_canvas(config);
    canvas.handle(plus_press("src", 70.0, 35.0, 0.0));
    canvas.handle(InputEvent::pointer_move(205.0, 35.0, Modifiers::NONE, 100.0));
    canvas.handle(InputEvent::pointer_move(150.0, 200.0, Modifiers::NONE, 180.0));
    let up = canvas.handle(InputEvent::pointer_up(150.0, 200.0, Modifiers::NONE, 900.0));
    assert!(up.connected.is_some());
}
