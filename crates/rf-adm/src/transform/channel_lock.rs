//! Snapping objects to the nearest loudspeaker

use std::cmp::Ordering;

use nalgebra::Vector3;

use crate::conversion::{point_cart_to_polar, point_polar_to_cart};
use crate::layout::Layout;
use crate::metadata::ChannelLock;
use crate::position::PolarPosition;

#[derive(Debug, Clone)]
pub struct ChannelLockHandler {
    /// Real loudspeaker positions
    positions: Vec<PolarPosition>,
    /// Unit vectors of the real positions
    norm_positions: Vec<Vector3<f64>>,
    /// Real positions warped into the cube, normalised
    cube_positions: Vec<Vector3<f64>>,
    tolerance: f64,
}

impl ChannelLockHandler {
    /// `layout` must not contain LFE channels
    pub fn new(layout: &Layout, tolerance: f64) -> Self {
        let positions: Vec<PolarPosition> =
            layout.channels.iter().map(|c| c.polar_position).collect();
        let norm_positions = positions.iter().map(PolarPosition::norm_position).collect();
        let cube_positions = positions
            .iter()
            .map(|p| point_polar_to_cart(p.azimuth, p.elevation, 1.0).normalize())
            .collect();

        Self {
            positions,
            norm_positions,
            cube_positions,
            tolerance,
        }
    }

    /// Order in which equidistant loudspeakers are preferred
    fn priority(&self, a: usize, b: usize) -> Ordering {
        let pa = &self.positions[a];
        let pb = &self.positions[b];
        pa.elevation
            .abs()
            .total_cmp(&pb.elevation.abs())
            .then(pa.elevation.total_cmp(&pb.elevation))
            .then(pa.azimuth.abs().total_cmp(&pb.azimuth.abs()))
            .then(pa.azimuth.total_cmp(&pb.azimuth))
    }

    /// Index of the loudspeaker to lock to, if any
    pub fn select(
        &self,
        position: &Vector3<f64>,
        lock: &ChannelLock,
        excluded: &[bool],
        cartesian: bool,
    ) -> Option<usize> {
        let norm = position.norm();
        if norm < 1e-10 {
            return None;
        }
        let direction = position / norm;
        let targets = if cartesian {
            &self.cube_positions
        } else {
            &self.norm_positions
        };

        // excluded loudspeakers are only candidates if everything is excluded
        let all_excluded = excluded.iter().all(|&e| e);
        let distances: Vec<(usize, f64)> = targets
            .iter()
            .enumerate()
            .filter(|&(i, _)| all_excluded || !excluded.get(i).copied().unwrap_or(false))
            .map(|(i, target)| (i, (target - direction).norm()))
            .filter(|&(_, d)| lock.max_distance.is_none_or(|max| d < max + self.tolerance))
            .collect();

        let min_distance = distances
            .iter()
            .map(|&(_, d)| d)
            .fold(f64::INFINITY, f64::min);

        distances
            .iter()
            .filter(|&&(_, d)| d < min_distance + self.tolerance)
            .map(|&(i, _)| i)
            .min_by(|&a, &b| self.priority(a, b))
    }

    pub fn handle(
        &self,
        position: &Vector3<f64>,
        lock: Option<&ChannelLock>,
        excluded: &[bool],
        cartesian: bool,
    ) -> Vector3<f64> {
        let Some(lock) = lock else {
            return *position;
        };
        let Some(idx) = self.select(position, lock, excluded, cartesian) else {
            return *position;
        };

        log::trace!("channel lock to loudspeaker {idx}");
        let target = &self.positions[idx];
        if cartesian {
            let (_, _, distance) = point_cart_to_polar(position.x, position.y, position.z);
            point_polar_to_cart(target.azimuth, target.elevation, distance)
        } else {
            self.norm_positions[idx] * position.norm()
        }
    }
}
