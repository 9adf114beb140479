//! Real-room loudspeaker overrides
//!
//! A room description lists physical loudspeakers, each feeding one output
//! channel and answering to one or more layout channel names. Applying it to a
//! standard layout moves channels to their measured positions and yields an
//! upmix matrix from layout channels to physical outputs.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::Layout;
use crate::error::{AdmError, AdmResult};
use crate::position::PolarPosition;

/// Physical loudspeaker in a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speaker {
    /// Output channel index (0-based)
    pub channel: usize,
    /// Layout channel names this loudspeaker reproduces
    pub names: Vec<String>,
    /// Measured position, if known
    pub polar_position: Option<PolarPosition>,
    /// Linear gain applied to this output
    pub gain_linear: f64,
}

impl Speaker {
    /// Create a speaker with unity gain and no measured position
    pub fn new(channel: usize, names: &[&str]) -> Self {
        Self {
            channel,
            names: names.iter().map(|n| n.to_string()).collect(),
            polar_position: None,
            gain_linear: 1.0,
        }
    }

    /// Set the measured position
    pub fn with_position(mut self, position: PolarPosition) -> Self {
        self.polar_position = Some(position);
        self
    }
}

impl Layout {
    /// Apply a real-room loudspeaker list.
    ///
    /// Returns the layout with real positions moved to the measured ones, and
    /// an upmix matrix of shape (outputs, layout channels).
    pub fn with_speakers(&self, speakers: &[Speaker]) -> AdmResult<(Layout, Array2<f64>)> {
        let num_outputs = speakers.iter().map(|s| s.channel + 1).max().unwrap_or(0);
        let mut upmix = Array2::<f64>::zeros((num_outputs, self.channels.len()));
        let mut channels = self.channels.clone();

        for (ch_idx, channel) in channels.iter_mut().enumerate() {
            for speaker in speakers.iter().filter(|s| s.names.iter().any(|n| *n == channel.name)) {
                upmix[[speaker.channel, ch_idx]] = speaker.gain_linear;
                if let Some(position) = speaker.polar_position {
                    channel.polar_position = position;
                }
            }
        }

        check_upmix_matrix(&upmix, self)?;

        let layout = Layout {
            name: self.name.clone(),
            channels,
        };
        log::debug!(
            "applied {} real loudspeakers to layout {}",
            speakers.len(),
            layout.name
        );

        Ok((layout, upmix))
    }
}

/// Check that every layout channel feeds exactly one output
pub fn check_upmix_matrix(upmix: &Array2<f64>, layout: &Layout) -> AdmResult<()> {
    for (ch_idx, channel) in layout.channels.iter().enumerate() {
        let outputs = upmix.column(ch_idx).iter().filter(|&&g| g != 0.0).count();
        if outputs != 1 {
            return Err(AdmError::UpmixMatrix {
                channel: channel.name.clone(),
                outputs,
            });
        }
    }
    Ok(())
}
