//! ReelForge ADM Object Renderer Core
//!
//! BS.2127 gain calculation for object-based audio on BS.2051 loudspeaker layouts:
//!
//! ## Point-Source Panning
//! - Convex hull triangulation of the layout
//! - Triplet, virtual n-gon and quadrilateral regions
//! - Virtual loudspeakers for poles and sparse height layers
//! - Stereo via 0+5+0 downmix
//!
//! ## Extent
//! - Stadium-shaped weighting over a sphere of virtual sources
//! - Distance-dependent size
//! - Depth via averaged distances
//!
//! ## Position Transforms
//! - Screen scaling and screen edge lock
//! - Channel lock with exclusion awareness
//! - Polar and Cartesian divergence
//! - Polar ↔ Cartesian (cube) conversion
//!
//! ## Zone Exclusion
//! - Per-block loudspeaker exclusion with same-layer redistribution
//!
//! ## Orchestration
//! - `GainCalc`: metadata block → direct/diffuse gains per channel
//! - Parallel block rendering

pub mod config;
pub mod conversion;
pub mod extent;
pub mod gain_calc;
pub mod geom;
pub mod layout;
pub mod metadata;
pub mod point_source;
pub mod screen;
pub mod transform;
pub mod zone;

mod error;
mod position;

pub use config::PannerOptions;
pub use error::{AdmError, AdmResult};
pub use gain_calc::{BlockGains, DirectDiffuseGains, GainCalc};
pub use layout::{Channel, Layout};
pub use metadata::{
    ChannelLock, HorizontalEdge, ObjectBlock, ObjectDivergence, ObjectPosition,
    ObjectTypeMetadata, ScreenEdgeLock, VerticalEdge, Zone,
};
pub use position::{CartesianPosition, PolarPosition};
pub use screen::Screen;
