//! Locking objects to the edges of the reproduction screen

use nalgebra::Vector3;

use super::{cube_x, cube_z};
use crate::conversion::{point_cart_to_polar, point_polar_to_cart};
use crate::geom::cart;
use crate::metadata::{HorizontalEdge, ScreenEdgeLock, VerticalEdge};
use crate::position::PolarPosition;
use crate::screen::{PolarEdges, Screen};

#[derive(Debug, Clone)]
pub struct ScreenEdgeLockHandler {
    edges: Option<PolarEdges>,
    /// Lock Cartesian objects in cube coordinates instead of angles
    compensation: bool,
}

impl ScreenEdgeLockHandler {
    pub fn new(reproduction_screen: Option<&Screen>, compensation: bool) -> Self {
        Self {
            edges: reproduction_screen.map(PolarEdges::from_screen),
            compensation,
        }
    }

    fn lock_angles(edges: &PolarEdges, lock: &ScreenEdgeLock, az: f64, el: f64) -> (f64, f64) {
        let az = match lock.horizontal {
            Some(HorizontalEdge::Left) => edges.left_azimuth,
            Some(HorizontalEdge::Right) => edges.right_azimuth,
            None => az,
        };
        let el = match lock.vertical {
            Some(VerticalEdge::Top) => edges.top_elevation,
            Some(VerticalEdge::Bottom) => edges.bottom_elevation,
            None => el,
        };
        (az, el)
    }

    pub fn handle(&self, position: &Vector3<f64>, lock: &ScreenEdgeLock, cartesian: bool) -> Vector3<f64> {
        let edges = match &self.edges {
            Some(edges) if lock.horizontal.is_some() || lock.vertical.is_some() => edges,
            _ => return *position,
        };

        if !cartesian {
            let PolarPosition { azimuth: az, elevation: el, distance } =
                PolarPosition::from_cartesian(position);
            let (az, el) = Self::lock_angles(edges, lock, az, el);
            return cart(az, el, distance);
        }

        if self.compensation {
            let x = match lock.horizontal {
                Some(HorizontalEdge::Left) => cube_x(edges.left_azimuth),
                Some(HorizontalEdge::Right) => cube_x(edges.right_azimuth),
                None => position.x,
            };
            let z = match lock.vertical {
                Some(VerticalEdge::Top) => cube_z(edges.top_elevation),
                Some(VerticalEdge::Bottom) => cube_z(edges.bottom_elevation),
                None => position.z,
            };
            Vector3::new(x, position.y, z)
        } else {
            let (az, el, distance) = point_cart_to_polar(position.x, position.y, position.z);
            let (az, el) = Self::lock_angles(edges, lock, az, el);
            point_polar_to_cart(az, el, distance)
        }
    }
}
