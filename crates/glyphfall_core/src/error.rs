//! # Error Types
//!
//! Errors surface only at startup (configuration, mask construction).
//! The per-frame path never returns an error: bad input degrades the
//! picture, never the simulation.

use thiserror::Error;

/// Errors that can occur while setting up the engine.
#[derive(Error, Debug)]
pub enum GlyphfallError {
    /// A configuration value is out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// A mask buffer does not match its declared dimensions.
    #[error("mask buffer of {len} values does not match {width}x{height}")]
    MaskDimensions {
        /// Declared width in pixels.
        width: u32,
        /// Declared height in pixels.
        height: u32,
        /// Actual buffer length.
        len: usize,
    },
}

/// Result type for engine setup operations.
pub type GlyphfallResult<T> = Result<T, GlyphfallError>;
