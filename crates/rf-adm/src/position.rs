//! Polar and Cartesian position types
//!
//! Conventions follow BS.2051/BS.2127:
//! - azimuth in degrees, positive = anticlockwise (to the left), 0 = front
//! - elevation in degrees, positive = up
//! - Cartesian X to the right, Y to the front, Z up

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geom::{azimuth, cart, elevation};

/// Polar position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarPosition {
    /// Azimuth in degrees (-180 to 180)
    pub azimuth: f64,
    /// Elevation in degrees (-90 to 90)
    pub elevation: f64,
    /// Distance from origin
    pub distance: f64,
}

impl PolarPosition {
    /// Create new polar position
    pub fn new(azimuth: f64, elevation: f64, distance: f64) -> Self {
        Self {
            azimuth,
            elevation,
            distance,
        }
    }

    /// Position on the unit sphere
    pub fn unit(azimuth: f64, elevation: f64) -> Self {
        Self::new(azimuth, elevation, 1.0)
    }

    /// Cartesian vector with this position's distance
    pub fn as_cartesian_array(&self) -> Vector3<f64> {
        cart(self.azimuth, self.elevation, self.distance)
    }

    /// Cartesian unit vector (distance ignored)
    pub fn norm_position(&self) -> Vector3<f64> {
        cart(self.azimuth, self.elevation, 1.0)
    }

    /// Polar position of a Cartesian vector
    pub fn from_cartesian(v: &Vector3<f64>) -> Self {
        let distance = v.norm();
        if distance < 1e-10 {
            return Self::new(0.0, 0.0, 0.0);
        }
        Self::new(azimuth(v), elevation(v), distance)
    }
}

impl Default for PolarPosition {
    fn default() -> Self {
        Self::unit(0.0, 0.0)
    }
}

/// Cartesian position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianPosition {
    /// X coordinate (left/right, positive = right)
    pub x: f64,
    /// Y coordinate (front/back, positive = front)
    pub y: f64,
    /// Z coordinate (down/up, positive = up)
    pub z: f64,
}

impl CartesianPosition {
    /// Create new Cartesian position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_array(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl Default for CartesianPosition {
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }
}

impl From<Vector3<f64>> for CartesianPosition {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<CartesianPosition> for Vector3<f64> {
    fn from(pos: CartesianPosition) -> Self {
        pos.as_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_polar_conversion() {
        // Front
        let v = PolarPosition::unit(0.0, 0.0).as_cartesian_array();
        assert_abs_diff_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);

        // Left is negative X
        let v = PolarPosition::unit(90.0, 0.0).as_cartesian_array();
        assert_abs_diff_eq!(v, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);

        // Right
        let v = PolarPosition::unit(-90.0, 0.0).as_cartesian_array();
        assert_abs_diff_eq!(v, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);

        // Up
        let v = PolarPosition::unit(0.0, 90.0).as_cartesian_array();
        assert_abs_diff_eq!(v, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_round_trip() {
        let original = PolarPosition::new(-110.0, 30.0, 2.0);
        let back = PolarPosition::from_cartesian(&original.as_cartesian_array());

        assert_abs_diff_eq!(back.azimuth, original.azimuth, epsilon = 1e-9);
        assert_abs_diff_eq!(back.elevation, original.elevation, epsilon = 1e-9);
        assert_abs_diff_eq!(back.distance, original.distance, epsilon = 1e-9);
    }

    #[test]
    fn test_origin() {
        let polar = PolarPosition::from_cartesian(&Vector3::zeros());
        assert_eq!(polar.distance, 0.0);
    }
}
