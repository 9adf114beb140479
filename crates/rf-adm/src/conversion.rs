//! Conversion between polar and Cartesian (cube) object positions
//!
//! Cartesian ADM positions live in a cube where the BS.2051 loudspeakers sit
//! on the faces; the mapping warps azimuth piecewise between the corner
//! loudspeaker directions and stretches elevation so that ±30° maps to the
//! top/bottom cube edges.

use nalgebra::Vector3;

use crate::geom::{azimuth, inside_angle_range, local_coordinate_system, relative_angle};

const EL_TOP: f64 = 30.0;
const EL_TOP_DASH: f64 = 45.0;

/// Azimuth sectors: (left azimuth, right azimuth, left corner, right corner)
const SECTORS: [(f64, f64, [f64; 2], [f64; 2]); 5] = [
    (30.0, 0.0, [-1.0, 1.0], [0.0, 1.0]),
    (0.0, -30.0, [0.0, 1.0], [1.0, 1.0]),
    (-30.0, -110.0, [1.0, 1.0], [1.0, -1.0]),
    (-110.0, 110.0, [1.0, -1.0], [-1.0, -1.0]),
    (110.0, 30.0, [-1.0, -1.0], [-1.0, 1.0]),
];

fn corner_azimuth(corner: [f64; 2]) -> f64 {
    azimuth(&Vector3::new(corner[0], corner[1], 0.0))
}

/// Fraction of the way from the left to the right edge of a sector
fn map_az_to_linear(left_az: f64, right_az: f64, az: f64) -> f64 {
    let mid_az = (left_az + right_az) / 2.0;
    let az_range = right_az - mid_az;
    let rel_az = az - mid_az;
    0.5 * (1.0 + rel_az.to_radians().tan() / az_range.to_radians().tan())
}

fn map_linear_to_az(left_az: f64, right_az: f64, x: f64) -> f64 {
    let mid_az = (left_az + right_az) / 2.0;
    let az_range = right_az - mid_az;
    let rel_az = ((2.0 * x - 1.0) * az_range.to_radians().tan()).atan().to_degrees();
    mid_az + rel_az
}

/// Position in the horizontal square for an azimuth and horizontal radius
fn find_cart_position(az: f64, r_xy: f64) -> (f64, f64) {
    for &(left_az, right_az, left_pos, right_pos) in &SECTORS {
        if inside_angle_range(az, right_az, left_az, 0.0) {
            let left_az = relative_angle(right_az, left_az);
            let rel_az = relative_angle(right_az, az);
            let g_r = map_az_to_linear(left_az, right_az, rel_az);
            let g_l = 1.0 - g_r;
            return (
                r_xy * (g_l * left_pos[0] + g_r * right_pos[0]),
                r_xy * (g_l * left_pos[1] + g_r * right_pos[1]),
            );
        }
    }
    unreachable!("sectors cover the full circle")
}

/// Azimuth and horizontal radius for a position in the horizontal square
fn find_polar_position(x: f64, y: f64) -> (f64, f64) {
    let az_dash = azimuth(&Vector3::new(x, y, 0.0));

    for &(left_az, right_az, left_pos, right_pos) in &SECTORS {
        let left_az_dash = corner_azimuth(left_pos);
        let right_az_dash = corner_azimuth(right_pos);

        if inside_angle_range(az_dash, right_az_dash, left_az_dash, 1e-10) {
            // solve (x, y) = r * left + r * g * (right - left) for r and r * g
            let (lx, ly) = (left_pos[0], left_pos[1]);
            let (dx, dy) = (right_pos[0] - lx, right_pos[1] - ly);
            let det = lx * dy - ly * dx;
            let r = (x * dy - y * dx) / det;
            let rg = (lx * y - ly * x) / det;
            let g_r = if r.abs() > 1e-12 { rg / r } else { 0.0 };

            let left_az = relative_angle(right_az, left_az);
            let az = map_linear_to_az(left_az, right_az, g_r);
            return (wrap_azimuth(az), r);
        }
    }
    unreachable!("sectors cover the full circle")
}

fn wrap_azimuth(az: f64) -> f64 {
    let az = relative_angle(-180.0, az);
    if az > 180.0 { az - 360.0 } else { az }
}

/// Convert a polar position to the equivalent Cartesian (cube) position
pub fn point_polar_to_cart(az: f64, el: f64, dist: f64) -> Vector3<f64> {
    let (z, r_xy) = if el.abs() > EL_TOP {
        let el_dash =
            EL_TOP_DASH + (90.0 - EL_TOP_DASH) * (el.abs() - EL_TOP) / (90.0 - EL_TOP);
        (
            dist * el.signum(),
            dist * (90.0 - el_dash).to_radians().tan(),
        )
    } else {
        let el_dash = EL_TOP_DASH * el / EL_TOP;
        (el_dash.to_radians().tan() * dist, dist)
    };

    let (x, y) = find_cart_position(az, r_xy);
    Vector3::new(x, y, z)
}

/// Convert a Cartesian (cube) position to the equivalent polar position.
///
/// Returns (azimuth, elevation, distance); the origin maps to (0, 0, 0).
pub fn point_cart_to_polar(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    const EPS: f64 = 1e-10;

    if x.abs() < EPS && y.abs() < EPS {
        if z.abs() < EPS {
            return (0.0, 0.0, 0.0);
        }
        return (0.0, 90.0 * z.signum(), z.abs());
    }

    let (az, r_xy) = find_polar_position(x, y);

    let el_dash = (z / r_xy).atan().to_degrees();
    if el_dash.abs() > EL_TOP_DASH {
        let abs_el =
            EL_TOP + (90.0 - EL_TOP) * (el_dash.abs() - EL_TOP_DASH) / (90.0 - EL_TOP_DASH);
        (az, abs_el * el_dash.signum(), z.abs())
    } else {
        (az, EL_TOP * el_dash / EL_TOP_DASH, r_xy)
    }
}

/// Polar width and height of a box extent seen from straight ahead at unit distance
fn whd_to_width_height(w: f64, h: f64) -> (f64, f64) {
    (
        2.0 * w.atan2(1.0).to_degrees(),
        2.0 * h.atan2(1.0).to_degrees(),
    )
}

/// Convert a Cartesian object position and box extent to polar form.
///
/// The box is projected onto the local coordinate system of the source
/// direction, so a deep box seen from the side becomes wide. Returns
/// (azimuth, elevation, distance, width, height, depth).
pub fn extent_cart_to_polar(
    x: f64,
    y: f64,
    z: f64,
    width: f64,
    height: f64,
    depth: f64,
) -> (f64, f64, f64, f64, f64, f64) {
    let (az, el, dist) = point_cart_to_polar(x, y, z);
    let m = local_coordinate_system(az, el);

    let whd = Vector3::new(width, depth, height);
    let projected = |row: usize| m.row(row).transpose().component_mul(&whd).norm();
    let w_dash = projected(0);
    let d_dash = projected(1);
    let h_dash = projected(2);

    let (polar_width, polar_height) = whd_to_width_height(w_dash, h_dash);
    (az, el, dist, polar_width, polar_height, d_dash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_loudspeaker_corners() {
        let cases = [
            (0.0, 0.0, [0.0, 1.0, 0.0]),
            (30.0, 0.0, [-1.0, 1.0, 0.0]),
            (-30.0, 0.0, [1.0, 1.0, 0.0]),
            (110.0, 0.0, [-1.0, -1.0, 0.0]),
            (-110.0, 0.0, [1.0, -1.0, 0.0]),
            (180.0, 0.0, [0.0, -1.0, 0.0]),
            (30.0, 30.0, [-1.0, 1.0, 1.0]),
            (0.0, 90.0, [0.0, 0.0, 1.0]),
        ];

        for (az, el, expected) in cases {
            let v = point_polar_to_cart(az, el, 1.0);
            assert_abs_diff_eq!(v, Vector3::from(expected), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_round_trip() {
        for az in (-180..=180).step_by(15) {
            for el in (-90..=90).step_by(15) {
                for &dist in &[0.3, 1.0, 1.7] {
                    let (az, el) = (az as f64, el as f64);
                    let v = point_polar_to_cart(az, el, dist);
                    let (az2, el2, dist2) = point_cart_to_polar(v.x, v.y, v.z);

                    assert_abs_diff_eq!(el2, el, epsilon = 1e-6);
                    assert_abs_diff_eq!(dist2, dist, epsilon = 1e-6);
                    if el.abs() < 90.0 {
                        let diff = relative_angle(-180.0, az2 - az);
                        let diff = if diff > 180.0 { diff - 360.0 } else { diff };
                        assert_abs_diff_eq!(diff, 0.0, epsilon = 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn test_origin() {
        assert_eq!(point_cart_to_polar(0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
        assert_abs_diff_eq!(point_polar_to_cart(40.0, 10.0, 0.0).norm(), 0.0);
    }

    #[test]
    fn test_extent_front() {
        let (az, el, dist, width, height, depth) =
            extent_cart_to_polar(0.0, 1.0, 0.0, 1.0, 0.0, 0.5);
        assert_abs_diff_eq!(az, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(el, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dist, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(width, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(height, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(depth, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_extent_side_swaps_width_and_depth() {
        // at the side, the box depth is seen across the listener's view
        let (_, _, _, width, _, depth) = extent_cart_to_polar(-1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert!(width > 80.0);
        assert!(depth < 0.5);
    }
}
