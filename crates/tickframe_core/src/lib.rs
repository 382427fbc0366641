//! # TICKFRAME Core
//!
//! Identity and temporal primitives for a retained-mode draw-call cache.
//!
//! ## Architecture Rules
//!
//! 1. **Identities are hashes** - names and vertex buffers collapse to `u64`
//! 2. **Aliases are one hop** - an alias names a canonical hash, never another alias
//! 3. **Every interpolated value is a pair** - previous tick and current tick,
//!    each with its own validity flag
//!
//! ## Example
//!
//! ```rust
//! use tickframe_core::{Interpolated, NameRegistry};
//!
//! let mut names = NameRegistry::new();
//! let hash = names.register("mario_cap");
//! assert_eq!(names.name_of(hash), Some("mario_cap"));
//!
//! let mut fov = Interpolated::new(1.0_f32);
//! fov.set_new(2.0);
//! fov.commit();
//! fov.set_new(3.0);
//! assert_eq!(fov.sample(0.5), 2.5);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod handle;
pub mod identity;
pub mod interp;

pub use handle::{GeoLayout, GraphNode, Handle, HandleAllocator};
pub use identity::{
    hash_bytes, hash_floats, hash_name, AliasTable, ContentHasher, NameRegistry, XxContentHasher,
};
pub use interp::{lerp_f32, lerp_i32, Interpolated, Lerp};
