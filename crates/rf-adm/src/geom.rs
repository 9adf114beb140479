//! Geometry helpers on 3-vectors

use nalgebra::{Matrix3, Vector3};

/// Forward direction, used for degenerate input
pub const FORWARD: Vector3<f64> = Vector3::new(0.0, 1.0, 0.0);

/// Cartesian vector for a polar direction
pub fn cart(azimuth: f64, elevation: f64, distance: f64) -> Vector3<f64> {
    let az = azimuth.to_radians();
    let el = elevation.to_radians();
    Vector3::new(
        -az.sin() * el.cos() * distance,
        az.cos() * el.cos() * distance,
        el.sin() * distance,
    )
}

/// Azimuth of a vector in degrees
pub fn azimuth(v: &Vector3<f64>) -> f64 {
    -v.x.atan2(v.y).to_degrees()
}

/// Elevation of a vector in degrees
pub fn elevation(v: &Vector3<f64>) -> f64 {
    v.z.atan2(v.x.hypot(v.y)).to_degrees()
}

/// `y + n * 360` for the integer `n` that makes it the smallest value >= `x`
pub fn relative_angle(x: f64, y: f64) -> f64 {
    let turns = ((x - y) / 360.0).ceil();
    let mut y = y + turns * 360.0;
    // rounding in the division can leave y a hair outside [x, x + 360)
    if y < x {
        y += 360.0;
    } else if y - 360.0 >= x {
        y -= 360.0;
    }
    y
}

/// Is `x` within the anticlockwise range from `start` to `end`, all in degrees
pub fn inside_angle_range(x: f64, start: f64, end: f64, tol: f64) -> bool {
    if end - start >= 360.0 {
        return true;
    }
    let end = relative_angle(start, end);
    let x = relative_angle(start - tol, x);
    x <= end + tol
}

/// Rows are the local x (right), y (towards the direction) and z (up) axes
/// for a source at the given azimuth and elevation.
pub fn local_coordinate_system(azimuth: f64, elevation: f64) -> Matrix3<f64> {
    let x = cart(azimuth - 90.0, 0.0, 1.0);
    let y = cart(azimuth, elevation, 1.0);
    let z = cart(azimuth, elevation + 90.0, 1.0);
    Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}

/// Order of the vertices of a convex polygon around its centre.
///
/// The polygon is viewed from outside (along the direction of its centroid
/// from the origin), so the order is consistent for hull facets.
pub fn ngon_vertex_order(vertices: &[Vector3<f64>]) -> Vec<usize> {
    let n = vertices.len();
    if n < 3 {
        return (0..n).collect();
    }

    let centre = vertices.iter().sum::<Vector3<f64>>() / n as f64;

    // viewing axis: centroid direction, or the polygon normal if the
    // centroid is at the origin
    let mut axis = centre;
    if axis.norm() < 1e-10 {
        axis = (vertices[1] - vertices[0]).cross(&(vertices[2] - vertices[0]));
    }
    let axis = axis.normalize();

    let reference = vertices[0] - centre;
    let u = (reference - axis * reference.dot(&axis)).normalize();
    let v = axis.cross(&u);

    let angles: Vec<f64> = vertices
        .iter()
        .map(|p| {
            let rel = p - centre;
            rel.dot(&v).atan2(rel.dot(&u))
        })
        .collect();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| angles[a].total_cmp(&angles[b]));
    order
}

/// Piecewise-linear interpolation, clamped at the ends; `xp` must be increasing
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len();
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    for i in 1..n {
        if x <= xp[i] {
            let span = xp[i] - xp[i - 1];
            if span <= 0.0 {
                return fp[i];
            }
            let t = (x - xp[i - 1]) / span;
            return fp[i - 1] + t * (fp[i] - fp[i - 1]);
        }
    }
    fp[n - 1]
}

/// Unit vector in the direction of `v`, or forward if `v` has no length
pub fn normalize_or_forward(v: &Vector3<f64>) -> Vector3<f64> {
    let norm = v.norm();
    if norm < 1e-10 || !norm.is_finite() {
        FORWARD
    } else {
        v / norm
    }
}

/// Scale gains to unit Euclidean norm; zero vectors are left alone
pub fn normalize_gains(gains: &mut [f64]) {
    let norm = gains.iter().map(|g| g * g).sum::<f64>().sqrt();
    if norm > 0.0 {
        for g in gains.iter_mut() {
            *g /= norm;
        }
    }
}
