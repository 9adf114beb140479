//! Error types for ADM gain calculation

use thiserror::Error;

/// ADM renderer error types
///
/// All of these are configuration errors raised while building panners,
/// layouts or options. Nothing in the per-block render path returns an error.
#[derive(Error, Debug)]
pub enum AdmError {
    /// Convex hull facet that is neither a triplet nor a quad
    #[error("Unsupported hull facet with {vertices} vertices")]
    UnsupportedFacet { vertices: usize },

    /// Dedicated screen loudspeaker outside the allowed azimuth bands
    #[error("Screen loudspeaker {name} has azimuth {azimuth} outside the allowed ranges")]
    ScreenSpeakerAzimuth { name: String, azimuth: f64 },

    /// LFE channel where only full-range channels are accepted
    #[error("LFE channel {0} cannot be used for panning")]
    LfeChannel(String),

    /// Invalid loudspeaker layout
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Real-layout upmix maps a channel to zero or several outputs
    #[error("Upmix matrix maps channel {channel} to {outputs} outputs")]
    UpmixMatrix { channel: String, outputs: usize },

    /// Unknown or unparseable option
    #[error("Invalid option {key}={value}")]
    InvalidOption { key: String, value: String },

    /// Malformed JSON options
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for ADM operations
pub type AdmResult<T> = Result<T, AdmError>;
