//! # Scene Lights
//!
//! Two sources feed the backend's light list every tick:
//!
//! ```text
//!   level table [level][area] ──► static lights (≤128)  ─┐
//!                                                        ├──► scene list (≤512)
//!   mods emitting lights ──► dynamic prev/new pairs ─────┘
//!                            (≤384, cleared every tick)
//! ```
//!
//! Dynamic lights are the only ones interpolated: position, attenuation
//! radius, point radius and shadow offset blend; every other field takes
//! the current tick's value.

use bytemuck::{Pod, Zeroable};
use tickframe_core::Lerp;
use tickframe_shared::constants::{MAX_AREAS, MAX_DYNAMIC_LIGHTS, MAX_LEVELS, MAX_LEVEL_LIGHTS, MAX_LIGHTS};
use tickframe_shared::{Matrix4, Vec3};

use crate::error::{RenderError, RenderResult};
use crate::material::LIGHT_GROUP_DEFAULT;

/// One point light as the backend consumes it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Light {
    /// Position in world space.
    pub position: Vec3,
    /// Distance at which the light fades out.
    pub attenuation_radius: f32,
    /// Radius of the emitting sphere (soft shadows).
    pub point_radius: f32,
    /// Diffuse color.
    pub diffuse_color: Vec3,
    /// Specular color.
    pub specular_color: Vec3,
    /// Offset applied to shadow ray origins.
    pub shadow_offset: f32,
    /// Falloff exponent.
    pub attenuation_exponent: f32,
    /// Flicker strength.
    pub flicker_intensity: f32,
    /// Light groups this light belongs to.
    pub group_bits: u32,
}

impl Light {
    /// Copy of `self` moved into the space of `transform`.
    ///
    /// Radii and shadow offset follow the transform's scale, estimated from
    /// the length of `(1,1,1)` so non-uniform scales still give a value.
    #[must_use]
    pub fn transformed(&self, transform: &Matrix4) -> Self {
        let scale = transform.transform_direction(Vec3::ONE).length() / 3.0_f32.sqrt();
        Self {
            position: transform.transform_point(self.position),
            attenuation_radius: self.attenuation_radius * scale,
            point_radius: self.point_radius * scale,
            shadow_offset: self.shadow_offset * scale,
            ..*self
        }
    }

    /// Blends the interpolated fields of `prev` towards `new`.
    #[must_use]
    pub fn blend(prev: &Self, new: &Self, t: f32) -> Self {
        Self {
            position: Vec3::lerp(prev.position, new.position, t),
            attenuation_radius: f32::lerp(prev.attenuation_radius, new.attenuation_radius, t),
            point_radius: f32::lerp(prev.point_radius, new.point_radius, t),
            shadow_offset: f32::lerp(prev.shadow_offset, new.shadow_offset, t),
            ..*new
        }
    }
}

/// A dynamic light as of the previous and the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightPair {
    /// Light under the previous transform.
    pub prev: Light,
    /// Light under the current transform.
    pub new: Light,
}

impl LightPair {
    /// Light at weight `t`.
    #[inline]
    #[must_use]
    pub fn sample(&self, t: f32) -> Light {
        Light::blend(&self.prev, &self.new, t)
    }
}

/// Bounded per-tick list of dynamic lights.
#[derive(Debug, Clone)]
pub struct DynamicLights {
    pairs: Vec<LightPair>,
    capacity: usize,
}

impl DynamicLights {
    /// Creates an empty list.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`MAX_DYNAMIC_LIGHTS`].
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity <= MAX_DYNAMIC_LIGHTS,
            "dynamic light capacity {capacity} exceeds {MAX_DYNAMIC_LIGHTS}"
        );
        Self {
            pairs: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Emits `template` under the previous and current transforms.
    ///
    /// # Panics
    ///
    /// Panics if the list is already full.
    pub fn add(&mut self, template: &Light, prev: &Matrix4, new: &Matrix4) {
        assert!(
            self.pairs.len() < self.capacity,
            "dynamic light capacity {} exceeded",
            self.capacity
        );
        self.pairs.push(LightPair {
            prev: template.transformed(prev),
            new: template.transformed(new),
        });
    }

    /// Forgets all lights (start of a logic tick).
    pub fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Lights added this tick.
    #[must_use]
    pub fn pairs(&self) -> &[LightPair] {
        &self.pairs
    }

    /// Number of lights added this tick.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no light was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Maximum lights per tick.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DynamicLights {
    fn default() -> Self {
        Self::with_capacity(MAX_DYNAMIC_LIGHTS)
    }
}

/// Static lights for every level/area pair.
#[derive(Debug, Clone)]
pub struct LevelLights {
    tables: Vec<Vec<Light>>,
}

impl LevelLights {
    /// Every area starts with an ambient fill light and a distant sun.
    #[must_use]
    pub fn new() -> Self {
        let ambient = Light {
            diffuse_color: Vec3::new(0.3, 0.35, 0.45),
            ..Light::default()
        };
        let sun = Light {
            position: Vec3::new(100_000.0, 200_000.0, 100_000.0),
            attenuation_radius: 1e11,
            point_radius: 5000.0,
            diffuse_color: Vec3::new(0.8, 0.75, 0.65),
            specular_color: Vec3::new(0.8, 0.75, 0.65),
            shadow_offset: 0.0,
            attenuation_exponent: 0.0,
            flicker_intensity: 0.0,
            group_bits: LIGHT_GROUP_DEFAULT,
        };
        Self {
            tables: vec![vec![ambient, sun]; MAX_LEVELS * MAX_AREAS],
        }
    }

    fn slot(level: usize, area: usize) -> RenderResult<usize> {
        if level >= MAX_LEVELS {
            return Err(RenderError::LevelOutOfRange { level, max: MAX_LEVELS });
        }
        if area >= MAX_AREAS {
            return Err(RenderError::AreaOutOfRange { area, max: MAX_AREAS });
        }
        Ok(level * MAX_AREAS + area)
    }

    /// Lights for a level/area pair.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range.
    pub fn get(&self, level: usize, area: usize) -> RenderResult<&[Light]> {
        Ok(&self.tables[Self::slot(level, area)?])
    }

    /// Replaces the lights for a level/area pair.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range or the list holds
    /// more than [`MAX_LEVEL_LIGHTS`] lights.
    pub fn set(&mut self, level: usize, area: usize, lights: Vec<Light>) -> RenderResult<()> {
        let slot = Self::slot(level, area)?;
        if lights.len() > MAX_LEVEL_LIGHTS {
            return Err(RenderError::TooManyLevelLights {
                level,
                area,
                count: lights.len(),
                capacity: MAX_LEVEL_LIGHTS,
            });
        }
        self.tables[slot] = lights;
        Ok(())
    }
}

impl Default for LevelLights {
    fn default() -> Self {
        Self::new()
    }
}

/// The full light list pushed to the backend.
#[derive(Debug, Clone, Default)]
pub struct SceneLights {
    lights: Vec<Light>,
    static_count: usize,
}

impl SceneLights {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lights: Vec::with_capacity(MAX_LIGHTS),
            static_count: 0,
        }
    }

    /// Rebuilds the list from the area's static lights followed by the
    /// current value of every dynamic light.
    ///
    /// # Panics
    ///
    /// Panics if the total exceeds [`MAX_LIGHTS`].
    pub fn build(&mut self, statics: &[Light], dynamic: &DynamicLights) {
        let total = statics.len() + dynamic.len();
        assert!(total <= MAX_LIGHTS, "scene light count {total} exceeds {MAX_LIGHTS}");

        self.lights.clear();
        self.lights.extend_from_slice(statics);
        self.lights.extend(dynamic.pairs().iter().map(|pair| pair.new));
        self.static_count = statics.len();
    }

    /// Rewrites the dynamic tail of the list at weight `t`.
    pub fn interpolate(&mut self, dynamic: &DynamicLights, t: f32) {
        let tail = &mut self.lights[self.static_count..];
        for (light, pair) in tail.iter_mut().zip(dynamic.pairs()) {
            *light = pair.sample(t);
        }
    }

    /// Lights in backend order.
    #[must_use]
    pub fn as_slice(&self) -> &[Light] {
        &self.lights
    }

    /// Total number of lights.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Returns true if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}
