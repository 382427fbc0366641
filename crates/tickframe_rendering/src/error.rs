//! # Render Error Types
//!
//! Recoverable failures: configuration, override documents, light tables.
//! Contract violations by the host (drawing with no program bound, a tile
//! index past the second tile, light buffers overflowing) are panics, not
//! errors.

use thiserror::Error;

/// Errors that can occur while configuring or feeding the engine.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A TOML document could not be parsed.
    #[error("failed to parse document: {0}")]
    Parse(#[from] toml::de::Error),

    /// A document could not be written as TOML.
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Reading a configuration file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A level id is outside the level table.
    #[error("level {level} out of range (max {max})")]
    LevelOutOfRange {
        /// Level requested.
        level: usize,
        /// Number of levels.
        max: usize,
    },

    /// An area id is outside the area table.
    #[error("area {area} out of range (max {max})")]
    AreaOutOfRange {
        /// Area requested.
        area: usize,
        /// Number of areas per level.
        max: usize,
    },

    /// A static light list does not fit its slot.
    #[error("level {level} area {area} has {count} lights, capacity is {capacity}")]
    TooManyLevelLights {
        /// Level id.
        level: usize,
        /// Area id.
        area: usize,
        /// Lights supplied.
        count: usize,
        /// Lights allowed.
        capacity: usize,
    },
}

/// Result type for engine operations.
pub type RenderResult<T> = Result<T, RenderError>;
