//! Screen descriptors and screen edge computation

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geom::{azimuth, elevation, local_coordinate_system};
use crate::position::{CartesianPosition, PolarPosition};

/// Screen described by its centre direction and angular width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarScreen {
    /// Width / height
    pub aspect_ratio: f64,
    /// Centre of the screen
    pub centre_position: PolarPosition,
    /// Horizontal angle subtended by the screen, in degrees
    pub width_azimuth: f64,
}

/// Screen described in room coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianScreen {
    /// Width / height
    pub aspect_ratio: f64,
    /// Centre of the screen
    pub centre_position: CartesianPosition,
    /// Screen width in room units
    pub width_x: f64,
}

/// Reference or reproduction screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Screen {
    Polar(PolarScreen),
    Cartesian(CartesianScreen),
}

impl Default for Screen {
    /// The default reference screen: 1.78:1, straight ahead, 58° wide
    fn default() -> Self {
        Screen::Polar(PolarScreen {
            aspect_ratio: 1.78,
            centre_position: PolarPosition::new(0.0, 0.0, 1.0),
            width_azimuth: 58.0,
        })
    }
}

/// Angles of the four screen edges, as seen from the listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarEdges {
    /// Azimuth of the left edge
    pub left_azimuth: f64,
    /// Azimuth of the right edge
    pub right_azimuth: f64,
    /// Elevation of the bottom edge
    pub bottom_elevation: f64,
    /// Elevation of the top edge
    pub top_elevation: f64,
}

impl PolarEdges {
    /// Compute the edges of a screen
    pub fn from_screen(screen: &Screen) -> Self {
        match screen {
            Screen::Polar(s) => {
                let centre = s.centre_position;
                let centre_cart = centre.as_cartesian_array();
                let width = 2.0 * centre.distance * (s.width_azimuth / 2.0).to_radians().tan();
                let height = width / s.aspect_ratio;

                let m = local_coordinate_system(centre.azimuth, centre.elevation);
                let x_vec = m.row(0).transpose() * (width / 2.0);
                let z_vec = m.row(2).transpose() * (height / 2.0);
                Self::from_vectors(&centre_cart, &x_vec, &z_vec)
            }
            Screen::Cartesian(s) => {
                let centre = s.centre_position.as_array();
                let width = s.width_x;
                let height = width / s.aspect_ratio;

                let x_vec = Vector3::new(width / 2.0, 0.0, 0.0);
                let z_vec = Vector3::new(0.0, 0.0, height / 2.0);
                Self::from_vectors(&centre, &x_vec, &z_vec)
            }
        }
    }

    fn from_vectors(centre: &Vector3<f64>, x_vec: &Vector3<f64>, z_vec: &Vector3<f64>) -> Self {
        Self {
            left_azimuth: azimuth(&(centre - x_vec)),
            right_azimuth: azimuth(&(centre + x_vec)),
            bottom_elevation: elevation(&(centre - z_vec)),
            top_elevation: elevation(&(centre + z_vec)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_screen_edges() {
        let edges = PolarEdges::from_screen(&Screen::default());

        assert_abs_diff_eq!(edges.left_azimuth, 29.0, epsilon = 1e-9);
        assert_abs_diff_eq!(edges.right_azimuth, -29.0, epsilon = 1e-9);

        let half_height = (29.0f64.to_radians().tan() / 1.78).atan().to_degrees();
        assert_abs_diff_eq!(edges.top_elevation, half_height, epsilon = 1e-9);
        assert_abs_diff_eq!(edges.bottom_elevation, -half_height, epsilon = 1e-9);
    }

    #[test]
    fn test_cartesian_screen_edges() {
        let screen = Screen::Cartesian(CartesianScreen {
            aspect_ratio: 2.0,
            centre_position: CartesianPosition::new(0.0, 1.0, 0.0),
            width_x: 2.0,
        });
        let edges = PolarEdges::from_screen(&screen);

        assert_abs_diff_eq!(edges.left_azimuth, 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(edges.right_azimuth, -45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(edges.top_elevation, 0.5f64.atan().to_degrees(), epsilon = 1e-9);
    }
}
