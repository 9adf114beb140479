//! Panner configuration
//!
//! A small flat set of options fixed at construction time:
//!
//! | key | default | effect |
//! |---|---|---|
//! | `spread_rows` | 37 | latitude rings used to sample the sphere for extent panning |
//! | `fade_width` | 10.0 | degrees of weight fade outside an extent shape, and the point/spread blend width |
//! | `extent_min_size` | 0.2 | minimum source size in the distance perspective model |
//! | `screen_edge_lock_compensation` | true | lock Cartesian blocks to the screen edge in cube space |
//! | `channel_lock_tolerance` | 1e-5 | equal-distance tolerance for channel lock |
//! | `parallel_spreading` | true | evaluate spreading samples on the rayon pool |

use serde::{Deserialize, Serialize};

use crate::error::{AdmError, AdmResult};

/// Options controlling panner construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PannerOptions {
    /// Number of latitude rings for the spreading panner
    pub spread_rows: usize,
    /// Fade width in degrees
    pub fade_width: f64,
    /// Minimum size for `extent_mod`
    pub extent_min_size: f64,
    /// Apply screen edge lock in cube space for Cartesian blocks
    pub screen_edge_lock_compensation: bool,
    /// Channel lock distance tolerance
    pub channel_lock_tolerance: f64,
    /// Use rayon when sampling the sphere
    pub parallel_spreading: bool,
}

impl Default for PannerOptions {
    fn default() -> Self {
        Self {
            spread_rows: 37,
            fade_width: 10.0,
            extent_min_size: 0.2,
            screen_edge_lock_compensation: true,
            channel_lock_tolerance: 1e-5,
            parallel_spreading: true,
        }
    }
}

impl PannerOptions {
    /// Set one option from a flat key/value pair
    pub fn set(&mut self, key: &str, value: &str) -> AdmResult<()> {
        let invalid = || AdmError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        };

        let mut updated = self.clone();
        match key {
            "spread_rows" => updated.spread_rows = value.trim().parse().map_err(|_| invalid())?,
            "fade_width" => updated.fade_width = value.trim().parse().map_err(|_| invalid())?,
            "extent_min_size" => {
                updated.extent_min_size = value.trim().parse().map_err(|_| invalid())?
            }
            "screen_edge_lock_compensation" => {
                updated.screen_edge_lock_compensation =
                    value.trim().parse().map_err(|_| invalid())?
            }
            "channel_lock_tolerance" => {
                updated.channel_lock_tolerance = value.trim().parse().map_err(|_| invalid())?
            }
            "parallel_spreading" => {
                updated.parallel_spreading = value.trim().parse().map_err(|_| invalid())?
            }
            _ => return Err(invalid()),
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check every option is within its allowed range
    pub fn validate(&self) -> AdmResult<()> {
        let invalid = |key: &str, value: String| {
            Err(AdmError::InvalidOption {
                key: key.to_string(),
                value,
            })
        };

        if self.spread_rows < 2 {
            return invalid("spread_rows", self.spread_rows.to_string());
        }
        if !(self.fade_width > 0.0 && self.fade_width.is_finite()) {
            return invalid("fade_width", self.fade_width.to_string());
        }
        if !(self.extent_min_size > 0.0 && self.extent_min_size <= 1.0) {
            return invalid("extent_min_size", self.extent_min_size.to_string());
        }
        if !(self.channel_lock_tolerance >= 0.0 && self.channel_lock_tolerance.is_finite()) {
            return invalid("channel_lock_tolerance", self.channel_lock_tolerance.to_string());
        }
        Ok(())
    }

    /// Build options from flat key/value pairs, starting from the defaults
    pub fn from_pairs<'a, I>(pairs: I) -> AdmResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            options.set(key, value)?;
        }
        Ok(options)
    }

    /// Import from JSON; missing keys keep their defaults
    pub fn from_json(json: &str) -> AdmResult<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Export to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
