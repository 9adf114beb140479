//! Zone exclusion
//!
//! Loudspeakers inside an exclusion zone are switched off and their energy is
//! moved to the nearest group of remaining loudspeakers. "Nearest" prefers,
//! in order: the same layer, not crossing between front and back, Euclidean
//! distance, then front/back distance.

use std::cmp::Ordering;

use ndarray::Array2;

use crate::conversion::point_polar_to_cart;
use crate::error::{AdmError, AdmResult};
use crate::geom::inside_angle_range;
use crate::layout::Layout;
use crate::metadata::{CartesianZone, PolarZone, Zone};
use crate::position::PolarPosition;

const ZONE_TOL: f64 = 1e-6;
const KEY_TOL: f64 = 1e-6;

impl PolarZone {
    pub fn contains(&self, position: &PolarPosition) -> bool {
        let el = position.elevation;
        if el < self.min_elevation - ZONE_TOL || el > self.max_elevation + ZONE_TOL {
            return false;
        }
        // azimuth is meaningless at the poles
        el.abs() >= 90.0 - ZONE_TOL
            || inside_angle_range(position.azimuth, self.min_azimuth, self.max_azimuth, ZONE_TOL)
    }
}

impl CartesianZone {
    pub fn contains(&self, position: &PolarPosition) -> bool {
        let p = point_polar_to_cart(position.azimuth, position.elevation, 1.0);
        let within = |v: f64, min: f64, max: f64| v >= min - ZONE_TOL && v <= max + ZONE_TOL;
        within(p.x, self.min_x, self.max_x)
            && within(p.y, self.min_y, self.max_y)
            && within(p.z, self.min_z, self.max_z)
    }
}

impl Zone {
    /// Is a loudspeaker at this nominal position inside the zone
    pub fn contains(&self, position: &PolarPosition) -> bool {
        match self {
            Zone::Polar(zone) => zone.contains(position),
            Zone::Cartesian(zone) => zone.contains(position),
        }
    }
}

/// Vertical layer of a nominal position: bottom, mid, upper, top
fn layer(elevation: f64) -> i32 {
    if elevation < -10.0 {
        0
    } else if elevation <= 10.0 {
        1
    } else if elevation < 70.0 {
        2
    } else {
        3
    }
}

/// Cost of moving between layers; up is preferred over down
fn layer_priority(from: i32, to: i32) -> f64 {
    let diff = to - from;
    match diff.cmp(&0) {
        Ordering::Equal => 0.0,
        Ordering::Greater => (2 * diff - 1) as f64,
        Ordering::Less => (-2 * diff) as f64,
    }
}

/// Front (1), side (0) or back (-1)
fn row(y: f64) -> i32 {
    if y > 1e-3 {
        1
    } else if y < -1e-3 {
        -1
    } else {
        0
    }
}

/// Lexicographic order on sort keys
fn compare_keys(a: &[f64; 4], b: &[f64; 4]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Group channels by sort key, best first.
///
/// Each key component is first snapped onto runs of values that lie within
/// `KEY_TOL` of their neighbour, so near-equal keys land in the same group
/// and the order between groups comes from the remaining components.
fn group_keyed(mut keyed: Vec<(usize, [f64; 4])>) -> Vec<Vec<usize>> {
    for c in 0..4 {
        let mut order: Vec<usize> = (0..keyed.len()).collect();
        order.sort_by(|&a, &b| keyed[a].1[c].total_cmp(&keyed[b].1[c]));

        let mut previous: Option<(f64, f64)> = None;
        for i in order {
            let value = keyed[i].1[c];
            let snapped = match previous {
                Some((last, run)) if value - last <= KEY_TOL => run,
                _ => value,
            };
            previous = Some((value, snapped));
            keyed[i].1[c] = snapped;
        }
    }

    keyed.sort_by(|a, b| compare_keys(&a.1, &b.1));

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_key: Option<[f64; 4]> = None;
    for (to, key) in keyed {
        match groups.last_mut() {
            Some(group) if group_key == Some(key) => group.push(to),
            _ => {
                groups.push(vec![to]);
                group_key = Some(key);
            }
        }
    }
    groups
}

/// Per-channel substitute groups for excluded loudspeakers
#[derive(Debug, Clone)]
pub struct ZoneExclusionDownmix {
    /// For each channel, groups of channel indices in order of preference;
    /// the first group is the channel itself
    channel_groups: Vec<Vec<Vec<usize>>>,
}

impl ZoneExclusionDownmix {
    /// `layout` must not contain LFE channels
    pub fn new(layout: &Layout) -> AdmResult<Self> {
        layout.ensure_no_lfe()?;

        let positions: Vec<_> = layout
            .channels
            .iter()
            .map(|c| {
                let p = c.polar_nominal_position;
                point_polar_to_cart(p.azimuth, p.elevation, 1.0)
            })
            .collect();
        let layers: Vec<i32> = layout
            .channels
            .iter()
            .map(|c| layer(c.polar_nominal_position.elevation))
            .collect();

        let n = positions.len();
        let mut channel_groups = Vec::with_capacity(n);

        for from in 0..n {
            let keyed: Vec<(usize, [f64; 4])> = (0..n)
                .map(|to| {
                    let key = [
                        layer_priority(layers[from], layers[to]),
                        (row(positions[from].y) != row(positions[to].y)) as i32 as f64,
                        (positions[from] - positions[to]).norm(),
                        (positions[from].y - positions[to].y).abs(),
                    ];
                    (to, key)
                })
                .collect();
            let groups = group_keyed(keyed);

            if groups.first().map(Vec::as_slice) != Some(&[from][..]) {
                return Err(AdmError::InvalidLayout(format!(
                    "{}: loudspeaker {} coincides with another loudspeaker",
                    layout.name, layout.channels[from].name
                )));
            }
            channel_groups.push(groups);
        }

        log::debug!("{}: zone exclusion groups for {} channels", layout.name, n);
        Ok(Self { channel_groups })
    }

    pub fn num_channels(&self) -> usize {
        self.channel_groups.len()
    }

    pub fn channel_groups(&self, channel: usize) -> &[Vec<usize>] {
        &self.channel_groups[channel]
    }

    /// Downmix matrix, shape (input channels, output channels), for an exclusion mask.
    ///
    /// Every row sums to one; excluded columns are zero unless everything is
    /// excluded, in which case (as when nothing is) the identity is returned.
    pub fn downmix_for_excluded(&self, excluded: &[bool]) -> Array2<f64> {
        let n = self.num_channels();
        assert_eq!(excluded.len(), n, "exclusion mask length mismatch");

        let mut downmix = Array2::<f64>::zeros((n, n));
        if excluded.iter().all(|&e| e) || !excluded.iter().any(|&e| e) {
            downmix.diag_mut().fill(1.0);
            return downmix;
        }

        for (from, groups) in self.channel_groups.iter().enumerate() {
            for group in groups {
                let remaining: Vec<usize> = group.iter().copied().filter(|&c| !excluded[c]).collect();
                if !remaining.is_empty() {
                    let share = 1.0 / remaining.len() as f64;
                    for to in remaining {
                        downmix[[from, to]] = share;
                    }
                    break;
                }
            }
        }

        downmix
    }
}

/// Applies exclusion zones to panning gains
#[derive(Debug, Clone)]
pub struct ZoneExclusionHandler {
    nominal_positions: Vec<PolarPosition>,
    downmix: ZoneExclusionDownmix,
}

impl ZoneExclusionHandler {
    /// `layout` must not contain LFE channels
    pub fn new(layout: &Layout) -> AdmResult<Self> {
        Ok(Self {
            nominal_positions: layout
                .channels
                .iter()
                .map(|c| c.polar_nominal_position)
                .collect(),
            downmix: ZoneExclusionDownmix::new(layout)?,
        })
    }

    /// Which channels lie inside any of the zones
    pub fn excluded(&self, zones: &[Zone]) -> Vec<bool> {
        self.nominal_positions
            .iter()
            .map(|p| zones.iter().any(|z| z.contains(p)))
            .collect()
    }

    /// Reroute the power of excluded channels
    pub fn handle(&self, gains: &[f64], excluded: &[bool]) -> Vec<f64> {
        if !excluded.iter().any(|&e| e) {
            return gains.to_vec();
        }
        log::trace!("zone exclusion active for {excluded:?}");

        let downmix = self.downmix.downmix_for_excluded(excluded);
        let power: Vec<f64> = gains.iter().map(|g| g * g).collect();
        (0..gains.len())
            .map(|to| {
                power
                    .iter()
                    .enumerate()
                    .map(|(from, p)| downmix[[from, to]] * p)
                    .sum::<f64>()
                    .sqrt()
            })
            .collect()
    }
}
