//! Extent panning
//!
//! Sources with a width and height are panned by integrating the point-source
//! gains over a rounded-rectangle ("stadium") on the sphere. The sphere is
//! sampled once per layout; each render weights the precomputed samples.
//!
//! - `SpreadingPanner`: sampled sphere and per-sample point-source gains
//! - `PolarExtentPanner`: stadium weight function and point/spread blending
//! - `PolarExtentHandler`: distance and depth handling on top of the panner

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Matrix3, Vector3};
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::config::PannerOptions;
use crate::geom::{
    azimuth, cart, elevation, interp, local_coordinate_system, normalize_gains,
    normalize_or_forward,
};
use crate::point_source::PointSourceHandler;

/// Point-source gains precomputed over a sampled sphere
#[derive(Debug, Clone)]
pub struct SpreadingPanner {
    /// Sample directions, unit vectors
    points: Vec<Vector3<f64>>,
    /// Squared gains, shape (points, channels)
    gains_sq: Array2<f64>,
}

impl SpreadingPanner {
    /// Sample the sphere on `rows` rings of latitude and pan every sample
    pub fn new(panner: &dyn PointSourceHandler, rows: usize, parallel: bool) -> Self {
        let points = sphere_points(rows);
        let num_channels = panner.num_channels();

        let pan = |p: &Vector3<f64>| {
            panner
                .handle(p)
                .unwrap_or_else(|| vec![0.0; num_channels])
        };
        let gains: Vec<Vec<f64>> = if parallel {
            points.par_iter().map(pan).collect()
        } else {
            points.iter().map(pan).collect()
        };

        let mut gains_sq = Array2::<f64>::zeros((points.len(), num_channels));
        for (mut row, pv) in gains_sq.rows_mut().into_iter().zip(gains.iter()) {
            for (dst, &g) in row.iter_mut().zip(pv.iter()) {
                *dst = g * g;
            }
        }

        log::debug!(
            "spreading panner: {} samples on {} rings, {} channels",
            points.len(),
            rows,
            num_channels
        );

        Self { points, gains_sq }
    }

    pub fn points(&self) -> &[Vector3<f64>] {
        &self.points
    }

    pub fn num_channels(&self) -> usize {
        self.gains_sq.ncols()
    }

    /// Normalised gains for a weight function over the sphere
    pub fn handle<F>(&self, weight: F) -> Vec<f64>
    where
        F: Fn(&Vector3<f64>) -> f64,
    {
        let weights: Array1<f64> = self.points.iter().map(weight).collect();
        let mut gains: Vec<f64> = self.gains_sq.t().dot(&weights).iter().map(|g| g.sqrt()).collect();
        normalize_gains(&mut gains);
        gains
    }
}

/// Rings of latitude from pole to pole, with sample counts proportional to the ring length
fn sphere_points(rows: usize) -> Vec<Vector3<f64>> {
    let rows = rows.max(2);
    let mut points = Vec::new();

    for row in 0..rows {
        let el = -90.0 + 180.0 * row as f64 / (rows - 1) as f64;
        let ring_len = 2.0 * (rows - 1) as f64 * el.to_radians().cos();
        let count = (ring_len.round() as usize).max(1);
        for i in 0..count {
            let az = 360.0 * i as f64 / count as f64;
            points.push(cart(az, el, 1.0));
        }
    }

    points
}

/// Stadium-shaped weight function around a source direction
#[derive(Debug, Clone)]
pub struct StadiumWeight {
    /// Rows: local axes; the stadium is horizontal in this frame
    frame: Matrix3<f64>,
    /// Azimuth of the circle centres, radians
    circle_az: f64,
    /// Radius of the rounded ends, radians
    radius: f64,
    /// Fade width outside the shape, radians
    fade: f64,
}

impl StadiumWeight {
    /// Weight function for a source of `width` × `height` degrees at (`az`, `el`)
    pub fn new(az: f64, el: f64, width: f64, height: f64, fade_width: f64) -> Self {
        let mut frame = local_coordinate_system(az, el);
        let mut w = width.clamp(0.0, 360.0).to_radians() / 2.0;
        let mut h = height.clamp(0.0, 360.0).to_radians() / 2.0;

        // make the shape horizontal by swapping the local x and z axes
        if h > w {
            std::mem::swap(&mut w, &mut h);
            frame.swap_rows(0, 2);
        }

        // a full-width source meets its own back edge
        let w = interp(w, &[0.0, FRAC_PI_2, PI], &[0.0, FRAC_PI_2, PI + h]);

        Self {
            frame,
            circle_az: w - h,
            radius: h,
            fade: fade_width.to_radians(),
        }
    }

    /// Angular distance of `point` outside the shape (negative inside)
    fn distance(&self, point: &Vector3<f64>) -> f64 {
        let local = self.frame * point;
        let az = -local.x.atan2(local.y);

        // a full-circle shape has no rounded ends
        if az.abs() <= self.circle_az || self.circle_az >= PI {
            local.z.atan2(local.x.hypot(local.y)).abs() - self.radius
        } else {
            let (sin_c, cos_c) = self.circle_az.sin_cos();
            let centre = Vector3::new(-az.signum() * sin_c, cos_c, 0.0);
            let cos_angle = centre.dot(&local.normalize()).clamp(-1.0, 1.0);
            cos_angle.acos() - self.radius
        }
    }

    pub fn weight(&self, point: &Vector3<f64>) -> f64 {
        let distance = self.distance(point);
        if distance <= 0.0 {
            1.0
        } else if self.fade > 0.0 {
            (1.0 - distance / self.fade).max(0.0)
        } else {
            0.0
        }
    }
}

/// Extent panner for polar sources
pub struct PolarExtentPanner {
    point_source: Box<dyn PointSourceHandler>,
    spreading: SpreadingPanner,
    fade_width: f64,
}

impl PolarExtentPanner {
    pub fn new(point_source: Box<dyn PointSourceHandler>, options: &PannerOptions) -> Self {
        let spreading = SpreadingPanner::new(
            point_source.as_ref(),
            options.spread_rows,
            options.parallel_spreading,
        );
        Self {
            point_source,
            spreading,
            fade_width: options.fade_width,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.point_source.num_channels()
    }

    pub fn point_source(&self) -> &dyn PointSourceHandler {
        self.point_source.as_ref()
    }

    /// Weight function for a source direction and size in degrees
    pub fn get_weight_func(&self, direction: &Vector3<f64>, width: f64, height: f64) -> StadiumWeight {
        StadiumWeight::new(
            azimuth(direction),
            elevation(direction),
            width,
            height,
            self.fade_width,
        )
    }

    /// Point-source gains, silent if the direction is not covered
    pub fn point_gains(&self, direction: &Vector3<f64>) -> Vec<f64> {
        self.point_source.handle(direction).unwrap_or_else(|| {
            log::warn!("no panning region covers direction {direction:?}");
            vec![0.0; self.num_channels()]
        })
    }

    /// Gains for a source of `width` × `height` degrees, blended in power
    /// from point to spread over the first `fade_width` degrees of size
    pub fn calc_pv_spread(&self, direction: &Vector3<f64>, width: f64, height: f64) -> Vec<f64> {
        let size = width.max(height);
        let point = self.point_gains(direction);
        if size <= 0.0 {
            return point;
        }

        let weight = self.get_weight_func(direction, width, height);
        let spread = self.spreading.handle(|p| weight.weight(p));

        let p = size / self.fade_width;
        if p >= 1.0 {
            return spread;
        }
        point
            .iter()
            .zip(spread.iter())
            .map(|(&g_p, &g_s)| (p * g_s * g_s + (1.0 - p) * g_p * g_p).sqrt())
            .collect()
    }
}

/// Apparent size of an `extent` (degrees) seen from `distance`
pub fn extent_mod(extent: f64, distance: f64, min_size: f64) -> f64 {
    let size = min_size + (1.0 - min_size) * extent / 360.0;
    let e1 = 4.0 * size.atan2(1.0).to_degrees();
    let e_d = 4.0 * size.atan2(distance).to_degrees();
    interp(e_d, &[0.0, e1, 360.0], &[0.0, extent, 360.0])
}

/// Polar extent panning including distance and depth
pub struct PolarExtentHandler {
    panner: PolarExtentPanner,
    min_size: f64,
}

impl PolarExtentHandler {
    pub fn new(point_source: Box<dyn PointSourceHandler>, options: &PannerOptions) -> Self {
        Self {
            panner: PolarExtentPanner::new(point_source, options),
            min_size: options.extent_min_size,
        }
    }

    pub fn panner(&self) -> &PolarExtentPanner {
        &self.panner
    }

    pub fn num_channels(&self) -> usize {
        self.panner.num_channels()
    }

    /// Gains for a source at `position` (distance is its length)
    pub fn handle(&self, position: &Vector3<f64>, width: f64, height: f64, depth: f64) -> Vec<f64> {
        let distance = position.norm();
        let direction = normalize_or_forward(position);

        let distances: Vec<f64> = if depth != 0.0 {
            vec![
                (distance - depth / 2.0).max(0.0),
                distance + depth / 2.0,
            ]
        } else {
            vec![distance]
        };

        let mut power = vec![0.0; self.num_channels()];
        for &d in &distances {
            let pv = self.panner.calc_pv_spread(
                &direction,
                extent_mod(width, d, self.min_size),
                extent_mod(height, d, self.min_size),
            );
            for (acc, g) in power.iter_mut().zip(pv) {
                *acc += g * g;
            }
        }

        let n = distances.len() as f64;
        power.into_iter().map(|p| (p / n).sqrt()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::bs2051::get_layout;
    use crate::point_source::configure;
    use approx::assert_abs_diff_eq;

    fn handler(layout: &str) -> PolarExtentHandler {
        let layout = get_layout(layout).unwrap().without_lfe();
        let panner = configure(&layout).unwrap();
        PolarExtentHandler::new(Box::new(panner), &PannerOptions::default())
    }

    #[test]
    fn test_sphere_points() {
        let points = sphere_points(37);
        // single points at the poles, 72 on the equator
        assert_abs_diff_eq!(points[0], Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
        assert_abs_diff_eq!(*points.last().unwrap(), Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
        let equator = points.iter().filter(|p| p.z.abs() < 1e-12).count();
        assert_eq!(equator, 72);
    }

    #[test]
    fn test_extent_mod() {
        assert_abs_diff_eq!(extent_mod(30.0, 1.0, 0.2), 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(extent_mod(30.0, 0.0, 0.2), 360.0, epsilon = 1e-9);
        assert!(extent_mod(30.0, 2.0, 0.2) < 30.0);
        assert!(extent_mod(30.0, 0.5, 0.2) > 30.0);

        // full size at distance 3 subtends 4 * atan(1 / 3), mapped from [0, 180] onto [0, 360]
        let expected = 8.0 * (1.0f64 / 3.0).atan().to_degrees();
        assert_abs_diff_eq!(extent_mod(360.0, 3.0, 0.2), expected, epsilon = 1e-9);
        assert!(extent_mod(360.0, 3.0, 0.2) < 360.0);
        assert_abs_diff_eq!(extent_mod(360.0, 1.0, 0.2), 360.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weight_function() {
        let weight = StadiumWeight::new(0.0, 0.0, 60.0, 20.0, 10.0);

        assert_eq!(weight.weight(&cart(0.0, 0.0, 1.0)), 1.0);
        assert_eq!(weight.weight(&cart(25.0, 5.0, 1.0)), 1.0);
        // halfway through the fade above the top edge
        assert_abs_diff_eq!(weight.weight(&cart(0.0, 15.0, 1.0)), 0.5, epsilon = 1e-9);
        assert_eq!(weight.weight(&cart(0.0, 25.0, 1.0)), 0.0);
        assert_eq!(weight.weight(&cart(90.0, 0.0, 1.0)), 0.0);

        // tall sources are rotated
        let tall = StadiumWeight::new(0.0, 0.0, 20.0, 60.0, 10.0);
        assert_eq!(tall.weight(&cart(5.0, 25.0, 1.0)), 1.0);
        assert_eq!(tall.weight(&cart(40.0, 0.0, 1.0)), 0.0);
    }

    #[test]
    fn test_full_width_covers_ring() {
        let weight = StadiumWeight::new(0.0, 0.0, 360.0, 0.0, 10.0);
        for az in (-180..=180).step_by(5) {
            assert_abs_diff_eq!(weight.weight(&cart(az as f64, 0.0, 1.0)), 1.0, epsilon = 1e-12);
        }
        // just behind, where rounding pushes the azimuth past the straight edges
        assert_abs_diff_eq!(weight.weight(&cart(-180.0, 0.0, 1.0)), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(weight.weight(&cart(179.999999, 0.0, 1.0)), 1.0, epsilon = 1e-12);
        assert_eq!(weight.weight(&cart(0.0, 30.0, 1.0)), 0.0);
    }

    #[test]
    fn test_zero_extent_is_point_source() {
        let h = handler("4+5+0");
        let position = cart(20.0, 10.0, 1.0);

        let point = h.panner().point_gains(&position);
        let gains = h.handle(&position, 0.0, 0.0, 0.0);
        for (a, b) in gains.iter().zip(point.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_spread_is_normalised() {
        let h = handler("4+5+0");
        for &(w, h_) in &[(5.0, 0.0), (30.0, 10.0), (120.0, 60.0), (360.0, 360.0)] {
            let gains = h.handle(&cart(0.0, 0.0, 1.0), w, h_, 0.0);
            let norm = gains.iter().map(|g| g * g).sum::<f64>().sqrt();
            assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-9);
            assert!(gains.iter().all(|&g| g >= 0.0));
        }
    }

    #[test]
    fn test_wide_source_uses_more_speakers() {
        let h = handler("0+5+0");
        let narrow = h.handle(&cart(0.0, 0.0, 1.0), 0.0, 0.0, 0.0);
        let wide = h.handle(&cart(0.0, 0.0, 1.0), 90.0, 0.0, 0.0);

        // M+030, M-030 pick up energy, centre drops
        assert!(wide[0] > narrow[0] + 0.1);
        assert!(wide[1] > narrow[1] + 0.1);
        assert!(wide[2] < narrow[2]);
    }
}
