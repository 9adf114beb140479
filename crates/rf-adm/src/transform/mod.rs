//! Position transforms applied before panning
//!
//! Each stage maps a position (polar: Cartesian vector on the sphere with
//! length = distance; Cartesian blocks: position in the room cube) to a new
//! position, in this order:
//! - `screen_scale`: follow the reproduction screen for screen-referenced objects
//! - `screen_edge_lock`: pin to screen edges
//! - `channel_lock`: snap to the nearest loudspeaker
//! - `divergence`: split into left/centre/right virtual sources

pub mod channel_lock;
pub mod divergence;
pub mod screen_edge_lock;
pub mod screen_scale;

pub use channel_lock::ChannelLockHandler;
pub use divergence::{diverge, divergence_gains};
pub use screen_edge_lock::ScreenEdgeLockHandler;
pub use screen_scale::ScreenScaleHandler;

use crate::conversion::point_polar_to_cart;

/// Cube X coordinate of an azimuth on the horizontal plane
pub(crate) fn cube_x(az: f64) -> f64 {
    point_polar_to_cart(az, 0.0, 1.0).x
}

/// Cube Z coordinate of an elevation straight ahead
pub(crate) fn cube_z(el: f64) -> f64 {
    point_polar_to_cart(0.0, el, 1.0).z
}
