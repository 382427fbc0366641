//! # TICKFRAME Shared
//!
//! Plain data used across the workspace.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on a rendering backend. Anything that
//! owns a device resource belongs in `tickframe_rendering`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{
    LOGIC_TICK_RATE, MAX_AREAS, MAX_DYNAMIC_LIGHTS, MAX_LEVELS, MAX_LEVEL_LIGHTS, MAX_LIGHTS,
    TEXTURE_TILES,
};
pub use math::{Matrix4, Rect, Vec3, Vec4};
