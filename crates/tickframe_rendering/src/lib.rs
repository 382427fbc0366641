//! # TICKFRAME Rendering
//!
//! Retained-mode draw-call cache and temporal interpolation engine.
//!
//! A legacy immediate-mode renderer submits geometry once per logic tick.
//! This crate caches every draw per caller identity across two ticks and
//! synthesizes the frames in between.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ONE LOGIC TICK                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  draw ─► identity + mods ─► mesh reuse ─► display list       │
//! │                                              ↓               │
//! │  settle ─► sub-frame × N (lerp) ─► advance / evict           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - UID 0 is never cached
//! - Unchanged vertex content never touches the backend
//! - Matrices interpolate componentwise; flips snap instead of spinning
//! - Host contract violations panic; bad documents return [`RenderError`]
//!
//! ## Example
//!
//! ```rust
//! use tickframe_rendering::{EngineConfig, FrameEngine, HeadlessBackend};
//! use tickframe_shared::Matrix4;
//!
//! let mut engine = FrameEngine::new(HeadlessBackend::new(), EngineConfig::default()).unwrap();
//! let triangle: Vec<f32> = (0..3)
//!     .flat_map(|v| [v as f32, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0])
//!     .collect();
//!
//! for _ in 0..2 {
//!     engine.begin_frame();
//!     engine.bind_shader(0);
//!     engine.draw_triangles_persp(&triangle, 1, &Matrix4::IDENTITY, false, 7);
//!     engine.end_frame();
//! }
//! assert_eq!(engine.backend().counters().meshes_created, 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod commit;
pub mod config;
pub mod display_list;
pub mod engine;
pub mod error;
pub mod interpolator;
pub mod light;
pub mod material;
pub mod mesh;
pub mod mods;
pub mod overrides;
pub mod picking;
pub mod shader;
pub mod stats;
pub mod texture;

pub use backend::{
    FrameCapture, HeadlessBackend, HeadlessCounters, InstanceDesc, InstanceFlags, InstanceHandle,
    MeshHandle, RenderBackend, ShaderHandle, TextureHandle,
};
pub use commit::{AdvanceReport, SettleReport};
pub use config::EngineConfig;
pub use display_list::{DisplayListCache, DisplayListSlot, InstanceSlot};
pub use engine::FrameEngine;
pub use error::{RenderError, RenderResult};
pub use interpolator::{Camera, CameraTrack, FrameSchedule};
pub use light::{DynamicLights, LevelLights, Light, SceneLights};
pub use material::{AttributeMask, Material};
pub use mesh::{MeshDecision, MeshSlot, VertexFormat, VertexLayout};
pub use mods::{Mod, ModRegistry};
pub use picking::TexturePicker;
pub use shader::{ProgramInfo, ShaderCache, ShaderPreload, VariantParams};
pub use stats::TickStats;
pub use texture::{AddressMode, Filter, SamplerState, TextureRegistry};
