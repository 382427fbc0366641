//! # Engine Constants
//!
//! Capacities and vertex layout facts shared by every subsystem.
//!
//! **CRITICAL:** Backends size their light buffers from these values.
//! Changing them requires a backend rebuild.

// =============================================================================
// TIMING
// =============================================================================

/// Logic tick rate (authoritative updates per second).
pub const LOGIC_TICK_RATE: u32 = 30;

/// Default display rate when no configuration is supplied.
pub const DEFAULT_TARGET_FPS: u32 = 30;

// =============================================================================
// LIGHTING
// =============================================================================

/// Total lights the backend accepts in one scene.
pub const MAX_LIGHTS: usize = 512;

/// Static lights per level/area pair.
pub const MAX_LEVEL_LIGHTS: usize = 128;

/// Per-tick dynamic lights (whatever the static lights leave over).
pub const MAX_DYNAMIC_LIGHTS: usize = MAX_LIGHTS - MAX_LEVEL_LIGHTS;

/// Number of levels with their own light tables.
pub const MAX_LEVELS: usize = 40;

/// Number of areas per level.
pub const MAX_AREAS: usize = 3;

// =============================================================================
// TEXTURES
// =============================================================================

/// Texture tiles addressable by a draw.
pub const TEXTURE_TILES: usize = 2;

/// Edge length of the blank diffuse texture bound to untextured draws.
pub const BLANK_TEXTURE_SIZE: u32 = 256;

// =============================================================================
// VERTEX LAYOUT
// =============================================================================

/// Bytes every vertex carries: position (xyzw) followed by a normal (xyz).
pub const VERTEX_FIXED_BYTES: u32 = 16 + 12;

/// Bytes added when the program samples a texture.
pub const VERTEX_TEXCOORD_BYTES: u32 = 8;

/// Bytes per combiner input without alpha.
pub const VERTEX_INPUT_RGB_BYTES: u32 = 12;

/// Bytes per combiner input with alpha.
pub const VERTEX_INPUT_RGBA_BYTES: u32 = 16;
