//! # Frame Interpolator
//!
//! One logic tick produces several output frames:
//!
//! ```text
//!   target 60 fps, tick 30 Hz ──► count = 2 ──► t = 0.5, 1.0
//!   target 90 fps, tick 30 Hz ──► count = 3 ──► t = 0.33, 0.67, 1.0
//! ```
//!
//! Each sub-frame blends the committed previous tick towards the staged
//! current tick: camera, instance placement, staged vertex buffers and
//! dynamic lights. The authoritative buffers are never written; vertices
//! are blended into a scratch buffer and uploaded from there.

use tickframe_core::Interpolated;
use tickframe_shared::Matrix4;

use crate::backend::RenderBackend;
use crate::display_list::DisplayListCache;
use crate::light::{DynamicLights, SceneLights};

/// Camera as pushed to the backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// View matrix.
    pub view: Matrix4,
    /// Field of view in radians.
    pub fov_radians: f32,
    /// Near plane.
    pub near: f32,
    /// Far plane.
    pub far: f32,
}

/// Camera state across two ticks.
#[derive(Debug, Clone)]
pub struct CameraTrack {
    view: Interpolated<Matrix4>,
    fov: Interpolated<f32>,
    inv_view: Matrix4,
    near: f32,
    far: f32,
}

impl CameraTrack {
    /// Identity view, 0.75 rad field of view, planes at 1 and 1000.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view: Interpolated::new(Matrix4::IDENTITY),
            fov: Interpolated::new(0.75),
            inv_view: Matrix4::IDENTITY,
            near: 1.0,
            far: 1000.0,
        }
    }

    /// Sets the projection for this tick. `can_interpolate = false` makes
    /// this tick's frames use the new camera as-is.
    pub fn set_perspective(&mut self, fov_degrees: f32, near: f32, far: f32, can_interpolate: bool) {
        self.fov.set_new(fov_degrees.to_radians());
        self.near = near;
        self.far = far;
        if !can_interpolate {
            self.view.invalidate_prev();
            self.fov.invalidate_prev();
        }
    }

    /// Sets the view matrix for this tick. A singular matrix keeps an
    /// identity inverse.
    pub fn set_view(&mut self, view: Matrix4) {
        self.view.set_new(view);
        self.inv_view = view.inverse().unwrap_or(Matrix4::IDENTITY);
    }

    /// Inverse of this tick's view matrix.
    #[inline]
    #[must_use]
    pub const fn inverse_view(&self) -> &Matrix4 {
        &self.inv_view
    }

    /// Returns true if frames blend from the previous tick.
    #[inline]
    #[must_use]
    pub const fn prev_valid(&self) -> bool {
        self.view.prev_valid()
    }

    /// Camera at weight `t`.
    #[must_use]
    pub fn sample(&self, t: f32) -> Camera {
        Camera {
            view: self.view.sample(t),
            fov_radians: self.fov.sample(t),
            near: self.near,
            far: self.far,
        }
    }

    /// Folds this tick's camera into the previous one.
    pub fn commit(&mut self) {
        self.view.commit();
        self.fov.commit();
    }
}

impl Default for CameraTrack {
    fn default() -> Self {
        Self::new()
    }
}

/// How many frames one tick produces and at which weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSchedule {
    count: u32,
}

impl FrameSchedule {
    /// `target_fps / tick_rate` frames, at least one.
    #[must_use]
    pub fn new(target_fps: u32, tick_rate: u32) -> Self {
        Self {
            count: target_fps.checked_div(tick_rate).unwrap_or(1).max(1),
        }
    }

    /// Frames per tick.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Weight of frame `frame` (1-based).
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn weight(&self, frame: u32) -> f32 {
        frame as f32 / self.count as f32
    }

    /// Weights of every frame in order; the last is 1.
    pub fn weights(&self) -> impl Iterator<Item = f32> + '_ {
        (1..=self.count).map(|frame| self.weight(frame))
    }
}

impl Default for FrameSchedule {
    fn default() -> Self {
        Self { count: 1 }
    }
}

/// State shared by every sub-frame of a tick.
pub struct SubFrameInputs<'a> {
    /// Cached draws.
    pub cache: &'a DisplayListCache,
    /// Camera.
    pub camera: &'a CameraTrack,
    /// Dynamic lights added this tick.
    pub dynamic_lights: &'a DynamicLights,
    /// Present interval passed to `draw`.
    pub present_interval: u32,
}

/// Renders sub-frames.
#[derive(Debug, Default)]
pub struct FrameInterpolator {
    scratch: Vec<f32>,
}

impl FrameInterpolator {
    /// Creates an interpolator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the state at weight `t` and draws one frame.
    pub fn render<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        inputs: &SubFrameInputs<'_>,
        scene_lights: &mut SceneLights,
        t: f32,
    ) {
        let camera = inputs.camera.sample(t);
        backend.set_view_perspective(&camera.view, camera.fov_radians, camera.near, camera.far);

        for list in inputs.cache.drawable() {
            for slot in list.instances() {
                backend.set_instance_desc(slot.instance(), &slot.sample(t));
            }
            for mesh in list.meshes().iter().filter(|mesh| mesh.is_staged()) {
                mesh.sample_into(t, &mut self.scratch);
                let format = mesh.format();
                backend.set_mesh(
                    mesh.mesh(),
                    &self.scratch,
                    format.vertex_count,
                    format.vertex_stride,
                    format.index_count,
                );
            }
        }

        scene_lights.interpolate(inputs.dynamic_lights, t);
        backend.set_scene_lights(scene_lights.as_slice());
        backend.draw(inputs.present_interval);
    }
}
