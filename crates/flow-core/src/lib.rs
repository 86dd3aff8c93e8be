pub mod align;
pub mod config;
pub mod geometry;
pub mod hit;
pub mod id;
pub mod model;
pub mod validate;

pub use align::{AlignDirection, align_positions};
pub use config::CanvasConfig;
pub use geometry::{
    ConnectionPath, RoutedConnection, calculate_connection_path, node_input_position,
    node_output_position, path_between, route_connections, snap_to_grid,
};
pub use hit::{find_node_at_point, is_point_in_node};
pub use id::{ConnectionId, NodeId};
pub use model::*;
pub use validate::{
    ConnectionAudit, ConnectionRejection, audit_connections, check_connection, is_valid_connection,
    would_create_cycle,
};

// Re-export kurbo points so downstream crates don't need a direct dependency
pub use kurbo::{Point, Vec2};
