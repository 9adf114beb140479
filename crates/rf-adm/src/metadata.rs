//! Per-block object metadata consumed by the gain calculator

use serde::{Deserialize, Serialize};

use crate::position::{CartesianPosition, PolarPosition};
use crate::screen::Screen;

/// Object position, in either coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObjectPosition {
    Polar(PolarPosition),
    Cartesian(CartesianPosition),
}

impl Default for ObjectPosition {
    fn default() -> Self {
        ObjectPosition::Polar(PolarPosition::default())
    }
}

/// Horizontal screen edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalEdge {
    Left,
    Right,
}

/// Vertical screen edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalEdge {
    Top,
    Bottom,
}

/// Screen edges to lock the object to, per axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenEdgeLock {
    pub horizontal: Option<HorizontalEdge>,
    pub vertical: Option<VerticalEdge>,
}

/// Snap the object to the nearest loudspeaker
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChannelLock {
    /// Only snap when a loudspeaker is at most this far away (unit-vector distance)
    pub max_distance: Option<f64>,
}

/// Split the object into left/centre/right virtual sources
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectDivergence {
    /// Divergence amount, 0 to 1
    pub value: f64,
    /// Azimuth offset of the outer sources (polar blocks), degrees
    pub azimuth_range: f64,
    /// X offset of the outer sources (Cartesian blocks)
    pub position_range: f64,
}

impl Default for ObjectDivergence {
    fn default() -> Self {
        Self {
            value: 0.0,
            azimuth_range: 45.0,
            position_range: 0.0,
        }
    }
}

/// Polar exclusion zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarZone {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub min_azimuth: f64,
    pub max_azimuth: f64,
}

/// Cartesian (cube) exclusion zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartesianZone {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

/// Region of the room whose loudspeakers must not be used
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Zone {
    Polar(PolarZone),
    Cartesian(CartesianZone),
}

/// One block of object rendering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectBlock {
    /// Block start time (seconds)
    pub rtime: Option<f64>,
    /// Block duration (seconds)
    pub duration: Option<f64>,
    /// Object position
    pub position: ObjectPosition,
    /// Interpret position, extent and divergence in the Cartesian (cube) model
    pub cartesian: bool,
    /// Width: degrees for polar blocks, box size for Cartesian blocks
    pub width: f64,
    /// Height: degrees for polar blocks, box size for Cartesian blocks
    pub height: f64,
    /// Depth, in distance units
    pub depth: f64,
    /// Linear gain
    pub gain: f64,
    /// Diffuse fraction, 0 to 1
    pub diffuse: f64,
    pub channel_lock: Option<ChannelLock>,
    pub object_divergence: Option<ObjectDivergence>,
    /// Position is relative to the reference screen
    pub screen_ref: bool,
    pub screen_edge_lock: ScreenEdgeLock,
    pub zone_exclusion: Vec<Zone>,
}

impl Default for ObjectBlock {
    fn default() -> Self {
        Self {
            rtime: None,
            duration: None,
            position: ObjectPosition::default(),
            cartesian: false,
            width: 0.0,
            height: 0.0,
            depth: 0.0,
            gain: 1.0,
            diffuse: 0.0,
            channel_lock: None,
            object_divergence: None,
            screen_ref: false,
            screen_edge_lock: ScreenEdgeLock::default(),
            zone_exclusion: Vec::new(),
        }
    }
}

/// Everything needed to render one object block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectTypeMetadata {
    pub block_format: ObjectBlock,
    /// Screen the position was authored against
    #[serde(default)]
    pub reference_screen: Screen,
}

impl ObjectTypeMetadata {
    /// Metadata for a block, authored against the default reference screen
    pub fn new(block_format: ObjectBlock) -> Self {
        Self {
            block_format,
            reference_screen: Screen::default(),
        }
    }
}
