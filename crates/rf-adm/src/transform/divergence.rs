//! Object divergence

use nalgebra::Vector3;

use crate::geom::{cart, local_coordinate_system};
use crate::metadata::ObjectDivergence;
use crate::position::PolarPosition;

/// Gains of the left, centre and right virtual sources; they sum to one
pub fn divergence_gains(value: f64) -> [f64; 3] {
    assert!(
        (0.0..=1.0).contains(&value),
        "divergence value {value} outside [0, 1]"
    );
    let outer = value / (value + 1.0);
    let centre = (1.0 - value) / (value + 1.0);
    [outer, centre, outer]
}

/// Split a position into weighted virtual sources.
///
/// Returns one source with weight 1 when there is no divergence, otherwise
/// left, centre and right sources.
pub fn diverge(
    position: &Vector3<f64>,
    divergence: Option<&ObjectDivergence>,
    cartesian: bool,
) -> (Vec<f64>, Vec<Vector3<f64>>) {
    let divergence = match divergence {
        Some(d) if d.value > 0.0 => d,
        _ => return (vec![1.0], vec![*position]),
    };
    let gains = divergence_gains(divergence.value);

    let positions = if cartesian {
        let offset = Vector3::new(divergence.position_range, 0.0, 0.0);
        vec![position - offset, *position, position + offset]
    } else {
        let PolarPosition { azimuth: az, elevation: el, distance } =
            PolarPosition::from_cartesian(position);
        let frame = local_coordinate_system(az, el).transpose();
        let range = divergence.azimuth_range;
        vec![
            frame * cart(range, 0.0, distance),
            *position,
            frame * cart(-range, 0.0, distance),
        ]
    };

    (gains.to_vec(), positions)
}
