//! Point-source panning
//!
//! - Convex hull triangulation of the loudspeaker layout
//! - Virtual loudspeakers at the poles and duplicated loudspeakers between layers
//! - Per-region VBAP / bilinear panning
//! - Stereo via a downmixed 0+5+0 panner

mod hull;
pub mod region;

use nalgebra::Vector3;
use ndarray::{Array1, Array2};

pub use hull::convex_hull_facets;
pub use region::{QuadRegion, Region, StereoPanDownmix, Triplet, VirtualNgon};

use crate::error::{AdmError, AdmResult};
use crate::geom::normalize_gains;
use crate::layout::{bs2051, Layout};
use crate::position::PolarPosition;

/// Anything that can pan a point source
pub trait PointSourceHandler: Send + Sync {
    /// Length of the gain vectors returned by `handle`
    fn num_channels(&self) -> usize;

    /// Gains for a direction, or None if the direction is not covered
    fn handle(&self, direction: &Vector3<f64>) -> Option<Vec<f64>>;
}

/// Ordered list of regions tiling (part of) the sphere
#[derive(Debug, Clone)]
pub struct PointSourcePanner {
    regions: Vec<Region>,
    num_channels: usize,
}

impl PointSourcePanner {
    /// Create a panner; `num_channels` defaults to one past the highest channel any region uses
    pub fn new(regions: Vec<Region>, num_channels: Option<usize>) -> Self {
        let max_channel = regions
            .iter()
            .flat_map(|r| r.output_channels().iter().copied())
            .max()
            .map_or(0, |c| c + 1);
        let num_channels = num_channels.unwrap_or(max_channel).max(max_channel);

        Self {
            regions,
            num_channels,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

impl PointSourceHandler for PointSourcePanner {
    fn num_channels(&self) -> usize {
        self.num_channels
    }

    fn handle(&self, direction: &Vector3<f64>) -> Option<Vec<f64>> {
        self.regions.iter().find_map(|region| {
            region.handle(direction).map(|pv| {
                let mut gains = vec![0.0; self.num_channels];
                for (&channel, g) in region.output_channels().iter().zip(pv) {
                    gains[channel] = g;
                }
                gains
            })
        })
    }
}

/// Panner followed by a downmix matrix, renormalised
#[derive(Debug, Clone)]
pub struct PointSourcePannerDownmix {
    panner: PointSourcePanner,
    /// Shape (output channels, panner channels)
    downmix: Array2<f64>,
    /// Rescale the downmixed gains to unit norm
    normalize: bool,
}

impl PointSourcePannerDownmix {
    pub fn new(panner: PointSourcePanner, downmix: Array2<f64>) -> Self {
        debug_assert_eq!(downmix.ncols(), panner.num_channels());
        Self {
            panner,
            downmix,
            normalize: true,
        }
    }

    /// Pass the panner's gains through unchanged; regions that shape their
    /// own level (stereo rear taper) keep it
    pub fn passthrough(panner: PointSourcePanner) -> Self {
        let n = panner.num_channels();
        Self {
            panner,
            downmix: Array2::eye(n),
            normalize: false,
        }
    }

    pub fn panner(&self) -> &PointSourcePanner {
        &self.panner
    }
}

impl PointSourceHandler for PointSourcePannerDownmix {
    fn num_channels(&self) -> usize {
        self.downmix.nrows()
    }

    fn handle(&self, direction: &Vector3<f64>) -> Option<Vec<f64>> {
        let pv = Array1::from(self.panner.handle(direction)?);
        let mut gains = self.downmix.dot(&pv).to_vec();
        if self.normalize {
            normalize_gains(&mut gains);
        }
        Some(gains)
    }
}

/// Build the point-source panner for a layout without LFE channels
pub fn configure(layout: &Layout) -> AdmResult<PointSourcePannerDownmix> {
    let _span = tracing::debug_span!("configure", layout = %layout.name).entered();

    layout.ensure_no_lfe()?;
    if layout.num_channels() == 2 {
        configure_stereo(layout)
    } else {
        configure_full(layout)
    }
}

fn configure_stereo(layout: &Layout) -> AdmResult<PointSourcePannerDownmix> {
    let (left, right) = if layout.channels[0].polar_position.azimuth
        >= layout.channels[1].polar_position.azimuth
    {
        (0, 1)
    } else {
        (1, 0)
    };

    let five = bs2051::get_layout("0+5+0")?.without_lfe();
    let region = Region::StereoPanDownmix(StereoPanDownmix::new(left, right, configure_full(&five)?));
    let panner = PointSourcePanner::new(vec![region], Some(2));

    log::debug!(
        "{}: stereo panning, left={} right={}",
        layout.name,
        layout.channels[left].name,
        layout.channels[right].name
    );
    Ok(PointSourcePannerDownmix::passthrough(panner))
}

/// Nominal position used for triangulation; screen loudspeakers snap to 15° or 45°
fn triangulation_position(layout: &Layout, idx: usize) -> AdmResult<PolarPosition> {
    let channel = &layout.channels[idx];
    if channel.name != "M+SC" && channel.name != "M-SC" {
        return Ok(channel.polar_nominal_position);
    }

    let azimuth = channel.polar_position.azimuth;
    let nominal_abs = match azimuth.abs() {
        a if (5.0..=25.0).contains(&a) => 15.0,
        a if (35.0..=60.0).contains(&a) => 45.0,
        _ => {
            return Err(AdmError::ScreenSpeakerAzimuth {
                name: channel.name.clone(),
                azimuth,
            });
        }
    };
    Ok(PolarPosition::unit(nominal_abs * azimuth.signum(), 0.0))
}

/// Duplicate of a mid-layer loudspeaker placed in an upper or lower layer
struct ExtraSpeaker {
    source: usize,
    real: PolarPosition,
    nominal: PolarPosition,
}

/// Copies of mid-layer loudspeakers to fill gaps in the upper and lower layers
fn extra_vertical_speakers(real: &[PolarPosition], nominal: &[PolarPosition]) -> Vec<ExtraSpeaker> {
    let mid: Vec<usize> = (0..nominal.len())
        .filter(|&i| (-10.0..=10.0).contains(&nominal[i].elevation))
        .collect();

    let layers: [(f64, f64, f64); 2] = [(-70.0, -10.0, -30.0), (10.0, 70.0, 30.0)];
    let mut extra = Vec::new();

    for (lower, upper, default_el) in layers {
        let layer: Vec<usize> = (0..nominal.len())
            .filter(|&i| nominal[i].elevation > lower && nominal[i].elevation < upper)
            .collect();

        let mean = |positions: &[PolarPosition]| {
            layer.iter().map(|&i| positions[i].elevation).sum::<f64>() / layer.len() as f64
        };
        let (real_el, nominal_el) = if layer.is_empty() {
            (default_el, default_el)
        } else {
            (mean(real), mean(nominal))
        };

        // everything is copied into an empty layer
        let min_az = layer
            .iter()
            .map(|&i| real[i].azimuth.abs())
            .fold(f64::NEG_INFINITY, f64::max)
            + 40.0;

        for &i in &mid {
            if real[i].azimuth.abs() > min_az {
                extra.push(ExtraSpeaker {
                    source: i,
                    real: PolarPosition::unit(real[i].azimuth, real_el),
                    nominal: PolarPosition::unit(nominal[i].azimuth, nominal_el),
                });
            }
        }
    }

    extra
}

fn configure_full(layout: &Layout) -> AdmResult<PointSourcePannerDownmix> {
    let num_real = layout.num_channels();

    let mut real: Vec<PolarPosition> = layout.channels.iter().map(|c| c.polar_position).collect();
    let mut nominal = (0..num_real)
        .map(|i| triangulation_position(layout, i))
        .collect::<AdmResult<Vec<_>>>()?;

    let extra = extra_vertical_speakers(&real, &nominal);
    for speaker in &extra {
        real.push(speaker.real);
        nominal.push(speaker.nominal);
    }
    let num_panned = real.len();

    // virtual loudspeakers at the poles
    let has_top = layout.channels.iter().any(|c| {
        c.name == "T+000" || c.name == "UH+180" || c.polar_nominal_position.elevation >= 70.0
    });
    let mut poles = vec![PolarPosition::unit(0.0, -90.0)];
    if !has_top {
        poles.push(PolarPosition::unit(0.0, 90.0));
    }
    real.extend(poles.iter().copied());
    nominal.extend(poles.iter().copied());

    let real_cart: Vec<Vector3<f64>> = real.iter().map(PolarPosition::norm_position).collect();
    let nominal_cart: Vec<Vector3<f64>> = nominal.iter().map(PolarPosition::norm_position).collect();
    let is_virtual = |i: usize| i >= num_panned;

    let facets = convex_hull_facets(&nominal_cart);
    let mut regions = Vec::new();

    for virtual_idx in num_panned..real.len() {
        let mut vertices: Vec<usize> = facets
            .iter()
            .filter(|f| f.contains(&virtual_idx))
            .flat_map(|f| f.iter().copied().filter(move |&i| i < num_panned))
            .collect();
        vertices.sort_unstable();
        vertices.dedup();

        let positions: Vec<Vector3<f64>> = vertices.iter().map(|&i| real_cart[i]).collect();
        regions.push(Region::VirtualNgon(VirtualNgon::new(
            vertices,
            &positions,
            real_cart[virtual_idx],
        )?));
    }

    for facet in facets.iter().filter(|f| !f.iter().any(|&i| is_virtual(i))) {
        let region = match facet.as_slice() {
            &[a, b, c] => Region::Triplet(Triplet::new(
                [a, b, c],
                [real_cart[a], real_cart[b], real_cart[c]],
            )?),
            &[a, b, c, d] => Region::QuadRegion(QuadRegion::new(
                [a, b, c, d],
                [real_cart[a], real_cart[b], real_cart[c], real_cart[d]],
            )),
            _ => {
                return Err(AdmError::UnsupportedFacet {
                    vertices: facet.len(),
                });
            }
        };
        regions.push(region);
    }

    let mut downmix = Array2::<f64>::zeros((num_real, num_panned));
    for i in 0..num_real {
        downmix[[i, i]] = 1.0;
    }
    for (k, speaker) in extra.iter().enumerate() {
        downmix[[speaker.source, num_real + k]] = 1.0;
    }

    log::debug!(
        "{}: {} regions from {} hull facets, {} extra loudspeakers, {} virtual",
        layout.name,
        regions.len(),
        facets.len(),
        extra.len(),
        poles.len()
    );

    let panner = PointSourcePanner::new(regions, Some(num_panned));
    Ok(PointSourcePannerDownmix::new(panner, downmix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::cart;
    use crate::layout::bs2051::LAYOUT_NAMES;
    use crate::layout::Channel;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_all_layouts_cover_sphere() {
        for name in LAYOUT_NAMES {
            let layout = bs2051::get_layout(name).unwrap().without_lfe();
            let panner = configure(&layout).unwrap();
            assert_eq!(panner.num_channels(), layout.num_channels());

            for az in (-180..180).step_by(10) {
                for el in (-90..=90).step_by(10) {
                    let direction = cart(az as f64, el as f64, 1.0);
                    let gains = panner
                        .handle(&direction)
                        .unwrap_or_else(|| panic!("{name}: no gains at ({az}, {el})"));
                    let norm = gains.iter().map(|g| g * g).sum::<f64>().sqrt();
                    if name == "0+2+0" {
                        // rear taper, down to -3 dB
                        assert!(
                            norm <= 1.0 + 1e-9 && norm >= 0.5f64.sqrt() - 1e-9,
                            "{name}: ({az}, {el})"
                        );
                    } else {
                        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-9);
                    }
                    assert!(gains.iter().all(|&g| g >= 0.0), "{name}: ({az}, {el})");
                }
            }
        }
    }

    #[test]
    fn test_loudspeaker_directions() {
        let layout = bs2051::get_layout("4+5+0").unwrap().without_lfe();
        let panner = configure(&layout).unwrap();

        for (i, channel) in layout.channels.iter().enumerate() {
            let gains = panner.handle(&channel.norm_position()).unwrap();
            assert_abs_diff_eq!(gains[i], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_lfe_rejected() {
        let layout = bs2051::get_layout("0+5+0").unwrap();
        assert!(matches!(configure(&layout), Err(AdmError::LfeChannel(_))));
    }

    #[test]
    fn test_stereo() {
        let layout = bs2051::get_layout("0+2+0").unwrap();
        let panner = configure(&layout).unwrap();

        let centre = panner.handle(&cart(0.0, 0.0, 1.0)).unwrap();
        assert_abs_diff_eq!(centre[0], 0.5f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(centre[1], 0.5f64.sqrt(), epsilon = 1e-9);

        let left = panner.handle(&cart(30.0, 0.0, 1.0)).unwrap();
        assert_abs_diff_eq!(left[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(left[1], 0.0, epsilon = 1e-9);

        // -3 dB at the back
        let back = panner.handle(&cart(180.0, 0.0, 1.0)).unwrap();
        assert_abs_diff_eq!(back[0], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(back[1], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_stereo_taper_survives_wrapper() {
        let layout = bs2051::get_layout("0+2+0").unwrap();
        let panner = configure(&layout).unwrap();

        // power falls monotonically from the front to the back
        let mut previous = f64::INFINITY;
        for az in (0..=180).step_by(30) {
            let gains = panner.handle(&cart(az as f64, 0.0, 1.0)).unwrap();
            let power: f64 = gains.iter().map(|g| g * g).sum();
            assert!(power <= previous + 1e-12, "power rose at {az}");
            previous = power;
        }
        assert_abs_diff_eq!(previous, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_screen_speaker_azimuth() {
        let channels = vec![
            Channel::new("M+030", 30.0, 0.0),
            Channel::new("M-030", -30.0, 0.0),
            Channel::new("M+000", 0.0, 0.0),
            Channel::new("M+SC", 30.0, 0.0),
        ];
        let layout = Layout::new("bad", channels).unwrap();
        assert!(matches!(
            configure(&layout),
            Err(AdmError::ScreenSpeakerAzimuth { .. })
        ));
    }

    #[test]
    fn test_extra_speakers() {
        let layout = bs2051::get_layout("2+5+0").unwrap().without_lfe();
        let real: Vec<PolarPosition> = layout.channels.iter().map(|c| c.polar_position).collect();
        let extra = extra_vertical_speakers(&real, &real);

        // lower layer empty: all five mid loudspeakers; upper layer: M+110 and M-110
        assert_eq!(extra.len(), 7);
        let upper: Vec<&ExtraSpeaker> = extra.iter().filter(|e| e.real.elevation > 0.0).collect();
        assert_eq!(upper.len(), 2);
        assert!(upper.iter().all(|e| e.real.azimuth.abs() == 110.0));
        assert!(upper.iter().all(|e| e.nominal.elevation == 30.0));
    }
}
