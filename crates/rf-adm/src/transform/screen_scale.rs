//! Screen scaling for screen-referenced objects

use nalgebra::Vector3;

use super::{cube_x, cube_z};
use crate::geom::{cart, interp};
use crate::position::PolarPosition;
use crate::screen::{PolarEdges, Screen};

/// Moves screen-referenced objects so that positions authored against the
/// reference screen land at the same place on the reproduction screen
#[derive(Debug, Clone)]
pub struct ScreenScaleHandler {
    reproduction_edges: Option<PolarEdges>,
}

impl ScreenScaleHandler {
    pub fn new(reproduction_screen: Option<&Screen>) -> Self {
        Self {
            reproduction_edges: reproduction_screen.map(PolarEdges::from_screen),
        }
    }

    pub fn handle(
        &self,
        position: &Vector3<f64>,
        screen_ref: bool,
        reference_screen: &Screen,
        cartesian: bool,
    ) -> Vector3<f64> {
        let rep = match (&self.reproduction_edges, screen_ref) {
            (Some(rep), true) => rep,
            _ => return *position,
        };
        let reference = PolarEdges::from_screen(reference_screen);

        if cartesian {
            let x = interp(
                position.x,
                &[-1.0, cube_x(reference.left_azimuth), cube_x(reference.right_azimuth), 1.0],
                &[-1.0, cube_x(rep.left_azimuth), cube_x(rep.right_azimuth), 1.0],
            );
            let z = interp(
                position.z,
                &[-1.0, cube_z(reference.bottom_elevation), cube_z(reference.top_elevation), 1.0],
                &[-1.0, cube_z(rep.bottom_elevation), cube_z(rep.top_elevation), 1.0],
            );
            Vector3::new(x, position.y, z)
        } else {
            let PolarPosition { azimuth: az, elevation: el, distance } =
                PolarPosition::from_cartesian(position);
            let az = interp(
                az,
                &[-180.0, reference.right_azimuth, reference.left_azimuth, 180.0],
                &[-180.0, rep.right_azimuth, rep.left_azimuth, 180.0],
            );
            let el = interp(
                el,
                &[-90.0, reference.bottom_elevation, reference.top_elevation, 90.0],
                &[-90.0, rep.bottom_elevation, rep.top_elevation, 90.0],
            );
            cart(az, el, distance)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{azimuth, elevation};
    use crate::position::PolarPosition;
    use crate::screen::PolarScreen;
    use approx::assert_abs_diff_eq;

    fn wide_screen() -> Screen {
        Screen::Polar(PolarScreen {
            aspect_ratio: 1.78,
            centre_position: PolarPosition::new(0.0, 0.0, 1.0),
            width_azimuth: 90.0,
        })
    }

    #[test]
    fn test_edges_map_to_edges() {
        let handler = ScreenScaleHandler::new(Some(&wide_screen()));
        let reference = Screen::default();

        let left = handler.handle(&cart(29.0, 0.0, 1.0), true, &reference, false);
        assert_abs_diff_eq!(azimuth(&left), 45.0, epsilon = 1e-9);
        let half = handler.handle(&cart(14.5, 0.0, 1.0), true, &reference, false);
        assert_abs_diff_eq!(azimuth(&half), 22.5, epsilon = 1e-9);
        assert_abs_diff_eq!(elevation(&half), 0.0, epsilon = 1e-9);

        // behind stays behind
        let back = handler.handle(&cart(180.0, 0.0, 1.0), true, &reference, false);
        assert_abs_diff_eq!(azimuth(&back).abs(), 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_disabled() {
        let position = cart(20.0, 5.0, 1.0);
        let no_screen = ScreenScaleHandler::new(None);
        assert_eq!(no_screen.handle(&position, true, &Screen::default(), false), position);

        let handler = ScreenScaleHandler::new(Some(&wide_screen()));
        assert_eq!(handler.handle(&position, false, &Screen::default(), false), position);
    }

    #[test]
    fn test_cartesian() {
        let handler = ScreenScaleHandler::new(Some(&wide_screen()));
        let reference = Screen::default();
        let edge = Vector3::new(cube_x(29.0), 1.0, 0.0);

        let scaled = handler.handle(&edge, true, &reference, true);
        assert_abs_diff_eq!(scaled.x, cube_x(45.0), epsilon = 1e-9);
        assert_abs_diff_eq!(scaled.y, 1.0);
    }
}
