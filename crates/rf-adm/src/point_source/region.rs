//! Panning regions
//!
//! Each region covers part of the sphere and either produces gains for a
//! direction or reports that the direction is not inside it:
//! - `Triplet`: VBAP over three loudspeakers
//! - `VirtualNgon`: fan of triplets around a virtual loudspeaker, folded back onto n real ones
//! - `QuadRegion`: bilinear panning over four loudspeakers
//! - `StereoPanDownmix`: 0+5+0 panning downmixed to two loudspeakers

use nalgebra::{Matrix3, Vector3};

use super::{PointSourceHandler, PointSourcePannerDownmix};
use crate::error::{AdmError, AdmResult};
use crate::geom::{ngon_vertex_order, normalize_gains};

const TRIPLET_TOL: f64 = 1e-11;
const QUAD_TOL: f64 = 1e-6;

/// VBAP triangle
#[derive(Debug, Clone)]
pub struct Triplet {
    output_channels: [usize; 3],
    /// Transposed inverse of the matrix whose rows are the loudspeaker positions
    basis: Matrix3<f64>,
}

impl Triplet {
    pub fn new(output_channels: [usize; 3], positions: [Vector3<f64>; 3]) -> AdmResult<Self> {
        let matrix = Matrix3::from_rows(&[
            positions[0].transpose(),
            positions[1].transpose(),
            positions[2].transpose(),
        ]);
        let inverse = matrix.try_inverse().ok_or_else(|| {
            AdmError::InvalidLayout(format!(
                "degenerate loudspeaker triplet {output_channels:?}"
            ))
        })?;

        Ok(Self {
            output_channels,
            basis: inverse.transpose(),
        })
    }

    fn gains(&self, direction: &Vector3<f64>) -> Option<[f64; 3]> {
        let pv = self.basis * direction;
        if pv.iter().any(|&g| g < -TRIPLET_TOL) {
            return None;
        }

        let mut gains = [pv.x.max(0.0), pv.y.max(0.0), pv.z.max(0.0)];
        normalize_gains(&mut gains);
        Some(gains)
    }
}

/// Triangle fan around a virtual loudspeaker
#[derive(Debug, Clone)]
pub struct VirtualNgon {
    output_channels: Vec<usize>,
    /// Triplets over local indices; index `output_channels.len()` is the virtual loudspeaker
    triplets: Vec<Triplet>,
    /// Gain from the virtual loudspeaker to each real one
    virtual_downmix: f64,
}

impl VirtualNgon {
    pub fn new(
        output_channels: Vec<usize>,
        positions: &[Vector3<f64>],
        virtual_position: Vector3<f64>,
    ) -> AdmResult<Self> {
        let n = output_channels.len();
        let order = ngon_vertex_order(positions);
        let virtual_idx = n;

        let triplets = (0..n)
            .map(|i| {
                let a = order[i];
                let b = order[(i + 1) % n];
                Triplet::new(
                    [virtual_idx, a, b],
                    [virtual_position, positions[a], positions[b]],
                )
            })
            .collect::<AdmResult<Vec<_>>>()?;

        Ok(Self {
            output_channels,
            triplets,
            virtual_downmix: 1.0 / (n as f64).sqrt(),
        })
    }

    fn gains(&self, direction: &Vector3<f64>) -> Option<Vec<f64>> {
        let n = self.output_channels.len();
        for triplet in &self.triplets {
            if let Some(pv) = triplet.gains(direction) {
                let mut gains = vec![0.0; n + 1];
                for (&idx, &g) in triplet.output_channels.iter().zip(pv.iter()) {
                    gains[idx] = g;
                }

                let virtual_gain = gains.pop().unwrap_or(0.0);
                for g in gains.iter_mut() {
                    *g += virtual_gain * self.virtual_downmix;
                }
                normalize_gains(&mut gains);
                return Some(gains);
            }
        }
        None
    }
}

/// Bilinear panning over a quadrilateral
#[derive(Debug, Clone)]
pub struct QuadRegion {
    output_channels: [usize; 4],
    positions: [Vector3<f64>; 4],
    /// Polynomial coefficient vectors for the x parameter
    poly_x: [Vector3<f64>; 3],
    /// Polynomial coefficient vectors for the y parameter
    poly_y: [Vector3<f64>; 3],
}

impl QuadRegion {
    pub fn new(output_channels: [usize; 4], positions: [Vector3<f64>; 4]) -> Self {
        let order = ngon_vertex_order(&positions);
        let output_channels = [
            output_channels[order[0]],
            output_channels[order[1]],
            output_channels[order[2]],
            output_channels[order[3]],
        ];
        let positions = [
            positions[order[0]],
            positions[order[1]],
            positions[order[2]],
            positions[order[3]],
        ];

        let rolled = [positions[1], positions[2], positions[3], positions[0]];
        Self {
            output_channels,
            positions,
            poly_x: Self::poly_coefficients(&positions),
            poly_y: Self::poly_coefficients(&rolled),
        }
    }

    /// Coefficients whose dot products with a direction give a quadratic in
    /// the edge parameter; its root places the direction on the line joining
    /// the points at that parameter along edges P1-P2 and P4-P3.
    fn poly_coefficients(p: &[Vector3<f64>; 4]) -> [Vector3<f64>; 3] {
        let p1p4 = p[0].cross(&p[3]);
        let mixed = p[0].cross(&p[2]) + p[1].cross(&p[3]);
        let p2p3 = p[1].cross(&p[2]);
        [p1p4 - mixed + p2p3, mixed - p1p4 * 2.0, p1p4]
    }

    fn solve(poly: &[Vector3<f64>; 3], direction: &Vector3<f64>) -> Option<f64> {
        let a = poly[0].dot(direction);
        let b = poly[1].dot(direction);
        let c = poly[2].dot(direction);

        let in_range = |x: f64| (-QUAD_TOL..=1.0 + QUAD_TOL).contains(&x);

        let roots: Vec<f64> = if a.abs() < 1e-10 {
            if b.abs() < 1e-10 {
                return None;
            }
            vec![-c / b]
        } else {
            let mut disc = b * b - 4.0 * a * c;
            if disc < 0.0 {
                if disc < -1e-10 {
                    return None;
                }
                disc = 0.0;
            }
            let q = -0.5 * (b + b.signum() * disc.sqrt());
            let mut roots = vec![q / a];
            if q.abs() > 1e-15 {
                roots.push(c / q);
            }
            roots.sort_by(f64::total_cmp);
            roots
        };

        roots.into_iter().find(|&x| in_range(x)).map(|x| x.clamp(0.0, 1.0))
    }

    fn gains(&self, direction: &Vector3<f64>) -> Option<[f64; 4]> {
        let x = Self::solve(&self.poly_x, direction)?;
        let y = Self::solve(&self.poly_y, direction)?;

        let mut gains = [(1.0 - x) * (1.0 - y), x * (1.0 - y), x * y, (1.0 - x) * y];

        let panned: Vector3<f64> = gains
            .iter()
            .zip(self.positions.iter())
            .map(|(&g, p)| p * g)
            .sum();
        if panned.dot(direction) <= 0.0 {
            return None;
        }

        normalize_gains(&mut gains);
        Some(gains)
    }
}

/// Two-loudspeaker panning via a 0+5+0 downmix
#[derive(Debug, Clone)]
pub struct StereoPanDownmix {
    /// Left then right
    output_channels: [usize; 2],
    /// Panner over M+030, M-030, M+000, M+110, M-110
    panner: Box<PointSourcePannerDownmix>,
}

impl StereoPanDownmix {
    const FRONT: [usize; 3] = [0, 1, 2];
    const REAR: [usize; 2] = [3, 4];

    pub fn new(left: usize, right: usize, panner: PointSourcePannerDownmix) -> Self {
        Self {
            output_channels: [left, right],
            panner: Box::new(panner),
        }
    }

    fn gains(&self, direction: &Vector3<f64>) -> Option<[f64; 2]> {
        let pv = self.panner.handle(direction)?;

        let centre = (1.0f64 / 3.0).sqrt();
        let surround = 0.5f64.sqrt();
        let mut gains = [
            pv[0] + centre * pv[2] + surround * pv[3],
            pv[1] + centre * pv[2] + surround * pv[4],
        ];
        normalize_gains(&mut gains);

        // fade from 0 dB at the front to -3 dB at the back
        let front = Self::FRONT.iter().map(|&i| pv[i]).fold(0.0, f64::max);
        let rear = Self::REAR.iter().map(|&i| pv[i]).fold(0.0, f64::max);
        let r = if front + rear > 0.0 { rear / (front + rear) } else { 0.0 };
        let taper = 0.5f64.powf(r / 2.0);

        Some([gains[0] * taper, gains[1] * taper])
    }
}

/// Region of the sphere handled by one panning law
#[derive(Debug, Clone)]
pub enum Region {
    Triplet(Triplet),
    VirtualNgon(VirtualNgon),
    QuadRegion(QuadRegion),
    StereoPanDownmix(StereoPanDownmix),
}

impl Region {
    /// Output channels this region writes, in the order of `handle` results
    pub fn output_channels(&self) -> &[usize] {
        match self {
            Region::Triplet(r) => &r.output_channels,
            Region::VirtualNgon(r) => &r.output_channels,
            Region::QuadRegion(r) => &r.output_channels,
            Region::StereoPanDownmix(r) => &r.output_channels,
        }
    }

    /// Gains for `direction`, or None if it is outside this region
    pub fn handle(&self, direction: &Vector3<f64>) -> Option<Vec<f64>> {
        match self {
            Region::Triplet(r) => r.gains(direction).map(|g| g.to_vec()),
            Region::VirtualNgon(r) => r.gains(direction),
            Region::QuadRegion(r) => r.gains(direction).map(|g| g.to_vec()),
            Region::StereoPanDownmix(r) => r.gains(direction).map(|g| g.to_vec()),
        }
    }
}
