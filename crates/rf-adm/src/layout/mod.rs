//! Loudspeaker layouts
//!
//! - `Channel`: one named loudspeaker with real and nominal positions
//! - `Layout`: ordered channel list; the order defines output gain indexing
//! - `bs2051`: standard BS.2051 layouts
//! - `real`: real-room loudspeaker overrides and upmix matrices

pub mod bs2051;
pub mod real;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{AdmError, AdmResult};
use crate::geom::inside_angle_range;
use crate::position::PolarPosition;

pub use real::{check_upmix_matrix, Speaker};

/// Single loudspeaker channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel name (e.g., "M+030", "U-110", "LFE1")
    pub name: String,
    /// Real position in the room
    pub polar_position: PolarPosition,
    /// Nominal position, used for triangulation and zone tests
    pub polar_nominal_position: PolarPosition,
    /// Allowed azimuth range (min, max) in degrees
    pub az_range: (f64, f64),
    /// Allowed elevation range (min, max) in degrees
    pub el_range: (f64, f64),
    /// Is this a low-frequency effects channel
    pub is_lfe: bool,
}

impl Channel {
    /// Create a channel at its nominal position, with no position tolerance
    pub fn new(name: &str, azimuth: f64, elevation: f64) -> Self {
        let position = PolarPosition::unit(azimuth, elevation);
        Self {
            name: name.to_string(),
            polar_position: position,
            polar_nominal_position: position,
            az_range: (azimuth, azimuth),
            el_range: (elevation, elevation),
            is_lfe: false,
        }
    }

    /// Create an LFE channel
    pub fn new_lfe(name: &str) -> Self {
        let position = PolarPosition::new(45.0, -30.0, 1.0);
        Self {
            name: name.to_string(),
            polar_position: position,
            polar_nominal_position: position,
            az_range: (-180.0, 180.0),
            el_range: (-90.0, 90.0),
            is_lfe: true,
        }
    }

    /// Set the allowed ranges
    pub fn with_ranges(mut self, az_range: (f64, f64), el_range: (f64, f64)) -> Self {
        self.az_range = az_range;
        self.el_range = el_range;
        self
    }

    /// Move the real position, keeping the nominal one
    pub fn with_real_position(mut self, position: PolarPosition) -> Self {
        self.polar_position = position;
        self
    }

    /// Real position as a Cartesian unit vector
    pub fn norm_position(&self) -> Vector3<f64> {
        self.polar_position.norm_position()
    }

    /// Nominal position as a Cartesian unit vector
    pub fn nominal_norm_position(&self) -> Vector3<f64> {
        self.polar_nominal_position.norm_position()
    }

    /// Check the real position against the allowed ranges
    pub fn check_position(&self) -> Vec<String> {
        const TOL: f64 = 1e-6;
        let mut errors = Vec::new();

        let pos = &self.polar_position;
        let (az_min, az_max) = self.az_range;
        let (el_min, el_max) = self.el_range;

        // azimuth is meaningless at the poles
        if pos.elevation.abs() < 90.0 - TOL && !inside_angle_range(pos.azimuth, az_min, az_max, TOL)
        {
            errors.push(format!(
                "{}: azimuth {} out of range [{}, {}]",
                self.name, pos.azimuth, az_min, az_max
            ));
        }
        if pos.elevation < el_min - TOL || pos.elevation > el_max + TOL {
            errors.push(format!(
                "{}: elevation {} out of range [{}, {}]",
                self.name, pos.elevation, el_min, el_max
            ));
        }

        errors
    }
}

/// Loudspeaker layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Layout name (e.g., "4+5+0")
    pub name: String,
    /// Channels in output order
    pub channels: Vec<Channel>,
}

impl Layout {
    /// Create a layout, checking that it is non-empty with unique names
    pub fn new(name: &str, channels: Vec<Channel>) -> AdmResult<Self> {
        if channels.is_empty() {
            return Err(AdmError::InvalidLayout(format!("{name}: no channels")));
        }
        for (i, channel) in channels.iter().enumerate() {
            if channels[..i].iter().any(|c| c.name == channel.name) {
                return Err(AdmError::InvalidLayout(format!(
                    "{name}: duplicate channel {}",
                    channel.name
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            channels,
        })
    }

    /// Total channel count (including LFE)
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Copy of this layout with LFE channels removed
    pub fn without_lfe(&self) -> Self {
        Self {
            name: self.name.clone(),
            channels: self.channels.iter().filter(|c| !c.is_lfe).cloned().collect(),
        }
    }

    /// LFE flag per channel
    pub fn is_lfe(&self) -> Vec<bool> {
        self.channels.iter().map(|c| c.is_lfe).collect()
    }

    /// Channel names in order
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name.as_str()).collect()
    }

    /// Index of a named channel
    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.name == name)
    }

    /// Real positions as Cartesian unit vectors
    pub fn norm_positions(&self) -> Vec<Vector3<f64>> {
        self.channels.iter().map(Channel::norm_position).collect()
    }

    /// Nominal positions as Cartesian unit vectors
    pub fn nominal_positions(&self) -> Vec<Vector3<f64>> {
        self.channels.iter().map(Channel::nominal_norm_position).collect()
    }

    /// Range-check all real positions; empty if everything is in range
    pub fn check_positions(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|c| !c.is_lfe)
            .flat_map(Channel::check_position)
            .collect()
    }

    /// Fail if any channel is LFE
    pub fn ensure_no_lfe(&self) -> AdmResult<()> {
        match self.channels.iter().find(|c| c.is_lfe) {
            Some(c) => Err(AdmError::LfeChannel(c.name.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_validation() {
        assert!(Layout::new("empty", Vec::new()).is_err());

        let dup = vec![Channel::new("M+030", 30.0, 0.0), Channel::new("M+030", 30.0, 0.0)];
        assert!(Layout::new("dup", dup).is_err());
    }

    #[test]
    fn test_without_lfe() {
        let layout = Layout::new(
            "test",
            vec![
                Channel::new("M+030", 30.0, 0.0),
                Channel::new_lfe("LFE1"),
                Channel::new("M-030", -30.0, 0.0),
            ],
        )
        .unwrap();

        assert_eq!(layout.is_lfe(), vec![false, true, false]);
        assert!(layout.ensure_no_lfe().is_err());

        let no_lfe = layout.without_lfe();
        assert_eq!(no_lfe.channel_names(), vec!["M+030", "M-030"]);
        assert!(no_lfe.ensure_no_lfe().is_ok());
        assert_eq!(no_lfe.channel_index("M-030"), Some(1));
    }

    #[test]
    fn test_check_position() {
        let channel = Channel::new("M+110", 110.0, 0.0)
            .with_ranges((100.0, 120.0), (0.0, 15.0))
            .with_real_position(PolarPosition::unit(125.0, 20.0));

        let errors = channel.check_position();
        assert_eq!(errors.len(), 2);

        let ok = channel.with_real_position(PolarPosition::unit(115.0, 5.0));
        assert!(ok.check_position().is_empty());
    }
}
