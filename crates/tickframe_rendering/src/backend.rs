//! # Backend Capability Interface
//!
//! The engine never links a graphics API. It drives whatever implements
//! [`RenderBackend`]: create and destroy meshes, instances, shader
//! variants and textures, push instance descriptions, lights and the
//! camera, then draw.
//!
//! Handles are opaque integers; `0` is the null handle and backends never
//! issue it. A backend that fails an allocation returns the null handle
//! and the engine carries it through unchanged.
//!
//! [`HeadlessBackend`] records every call in memory. It is what tests,
//! benchmarks and replay tools drive.

use std::collections::HashMap;

use tickframe_shared::{Matrix4, Rect};

use crate::light::Light;
use crate::material::Material;
use crate::shader::ShaderFlags;
use crate::texture::SamplerState;

macro_rules! backend_handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Null handle.
            pub const NULL: Self = Self(0);

            /// Wraps a backend-issued value.
            #[inline]
            #[must_use]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw value.
            #[inline]
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }

            /// Checks if this handle is null.
            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

backend_handle!(
    /// Backend mesh (vertex + index data).
    MeshHandle
);
backend_handle!(
    /// Backend scene instance.
    InstanceHandle
);
backend_handle!(
    /// Backend shader variant.
    ShaderHandle
);
backend_handle!(
    /// Backend texture.
    TextureHandle
);

/// Per-instance raster flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct InstanceFlags(u32);

impl InstanceFlags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Drawn behind everything (orthographic backgrounds).
    pub const RASTER_BACKGROUND: Self = Self(1 << 0);
    /// Both faces visible.
    pub const DISABLE_BACKFACE_CULLING: Self = Self(1 << 1);

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl std::ops::BitOrAssign for InstanceFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Everything the backend needs to draw one instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceDesc {
    /// Geometry.
    pub mesh: MeshHandle,
    /// Shader variant.
    pub shader: ShaderHandle,
    /// Diffuse texture (the blank texture when untextured).
    pub diffuse_texture: TextureHandle,
    /// Normal map, or NULL.
    pub normal_texture: TextureHandle,
    /// Specular map, or NULL.
    pub specular_texture: TextureHandle,
    /// Surface description.
    pub material: Material,
    /// Object-to-world transform.
    pub transform: Matrix4,
    /// Scissor region.
    pub scissor: Rect,
    /// Viewport region.
    pub viewport: Rect,
    /// Raster flags.
    pub flags: InstanceFlags,
}

impl Default for InstanceDesc {
    fn default() -> Self {
        Self {
            mesh: MeshHandle::NULL,
            shader: ShaderHandle::NULL,
            diffuse_texture: TextureHandle::NULL,
            normal_texture: TextureHandle::NULL,
            specular_texture: TextureHandle::NULL,
            material: Material::DEFAULT,
            transform: Matrix4::IDENTITY,
            scissor: Rect::default(),
            viewport: Rect::default(),
            flags: InstanceFlags::NONE,
        }
    }
}

/// Capabilities the engine consumes.
pub trait RenderBackend {
    /// Creates an empty mesh. Raytraced meshes must accept repeated updates.
    fn create_mesh(&mut self, raytrace: bool) -> MeshHandle;

    /// Destroys a mesh.
    fn destroy_mesh(&mut self, mesh: MeshHandle);

    /// Replaces a mesh's vertices. Indices are the sequential triangle
    /// list `0..index_count`.
    fn set_mesh(&mut self, mesh: MeshHandle, vertices: &[f32], vertex_count: u32, vertex_stride: u32, index_count: u32);

    /// Creates a scene instance.
    fn create_instance(&mut self) -> InstanceHandle;

    /// Destroys a scene instance.
    fn destroy_instance(&mut self, instance: InstanceHandle);

    /// Sets what an instance draws.
    fn set_instance_desc(&mut self, instance: InstanceHandle, desc: &InstanceDesc);

    /// Compiles a shader variant of a legacy program.
    fn create_shader(&mut self, program_id: u32, sampler: SamplerState, flags: ShaderFlags) -> ShaderHandle;

    /// Destroys a shader variant.
    fn destroy_shader(&mut self, shader: ShaderHandle);

    /// Creates a texture from tightly packed RGBA8 pixels.
    fn create_texture_rgba8(&mut self, pixels: &[u8], width: u32, height: u32) -> TextureHandle;

    /// Sets the camera.
    fn set_view_perspective(&mut self, view: &Matrix4, fov_radians: f32, near: f32, far: f32);

    /// Replaces the scene's light list.
    fn set_scene_lights(&mut self, lights: &[Light]);

    /// Sets or clears the sky plane texture.
    fn set_sky_plane(&mut self, texture: Option<TextureHandle>);

    /// Renders and presents one frame.
    fn draw(&mut self, present_interval: u32);

    /// Raytraced instance under a screen position, if any.
    fn raytraced_instance_at(&mut self, x: i32, y: i32) -> Option<InstanceHandle>;
}

/// Stored state of one headless mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessMesh {
    /// Created with raytracing enabled.
    pub raytrace: bool,
    /// Last uploaded vertices.
    pub vertices: Vec<f32>,
    /// Last uploaded vertex count.
    pub vertex_count: u32,
    /// Last uploaded stride in bytes.
    pub vertex_stride: u32,
    /// Last uploaded index count.
    pub index_count: u32,
    /// Number of uploads.
    pub uploads: u32,
}

/// Stored state of one headless shader variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessShader {
    /// Legacy program id.
    pub program_id: u32,
    /// Sampler state.
    pub sampler: SamplerState,
    /// Creation flags.
    pub flags: ShaderFlags,
}

/// What one `draw` call saw.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCapture {
    /// Camera view matrix.
    pub view: Matrix4,
    /// Camera field of view.
    pub fov_radians: f32,
    /// Light list.
    pub lights: Vec<Light>,
    /// Every live instance description, sorted by handle.
    pub instances: Vec<(InstanceHandle, InstanceDesc)>,
    /// Vertices of every live mesh, sorted by handle.
    pub meshes: Vec<(MeshHandle, Vec<f32>)>,
}

/// Counters over the backend's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessCounters {
    /// Meshes created.
    pub meshes_created: u32,
    /// Meshes destroyed.
    pub meshes_destroyed: u32,
    /// Mesh uploads.
    pub mesh_uploads: u32,
    /// Instances created.
    pub instances_created: u32,
    /// Instances destroyed.
    pub instances_destroyed: u32,
    /// Shader variants created.
    pub shaders_created: u32,
    /// Textures created.
    pub textures_created: u32,
    /// Frames drawn.
    pub draws: u32,
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    meshes: HashMap<MeshHandle, HeadlessMesh>,
    instances: HashMap<InstanceHandle, Option<InstanceDesc>>,
    shaders: HashMap<ShaderHandle, HeadlessShader>,
    textures: HashMap<TextureHandle, (u32, u32)>,
    view: Matrix4,
    fov_radians: f32,
    near: f32,
    far: f32,
    lights: Vec<Light>,
    sky_plane: Option<TextureHandle>,
    pick_result: Option<InstanceHandle>,
    last_pick_query: Option<(i32, i32)>,
    frames: Vec<FrameCapture>,
    counters: HeadlessCounters,
}

impl HeadlessBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Live mesh state.
    #[must_use]
    pub fn mesh(&self, mesh: MeshHandle) -> Option<&HeadlessMesh> {
        self.meshes.get(&mesh)
    }

    /// Last description set on a live instance.
    #[must_use]
    pub fn instance(&self, instance: InstanceHandle) -> Option<&InstanceDesc> {
        self.instances.get(&instance).and_then(Option::as_ref)
    }

    /// Live shader variant state.
    #[must_use]
    pub fn shader(&self, shader: ShaderHandle) -> Option<&HeadlessShader> {
        self.shaders.get(&shader)
    }

    /// Number of live meshes.
    #[must_use]
    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Number of live instances.
    #[must_use]
    pub fn live_instances(&self) -> usize {
        self.instances.len()
    }

    /// Number of live shader variants.
    #[must_use]
    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    /// Number of live textures.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Current light list.
    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Current camera: view, fov, near, far.
    #[must_use]
    pub fn camera(&self) -> (Matrix4, f32, f32, f32) {
        (self.view, self.fov_radians, self.near, self.far)
    }

    /// Current sky plane.
    #[must_use]
    pub fn sky_plane(&self) -> Option<TextureHandle> {
        self.sky_plane
    }

    /// Lifetime counters.
    #[must_use]
    pub fn counters(&self) -> HeadlessCounters {
        self.counters
    }

    /// Frames drawn since the last [`take_frames`](Self::take_frames).
    #[must_use]
    pub fn frames(&self) -> &[FrameCapture] {
        &self.frames
    }

    /// Drains captured frames.
    pub fn take_frames(&mut self) -> Vec<FrameCapture> {
        std::mem::take(&mut self.frames)
    }

    /// Sets what the next pick query returns.
    pub fn set_pick_result(&mut self, instance: Option<InstanceHandle>) {
        self.pick_result = instance;
    }

    /// Coordinates of the last pick query.
    #[must_use]
    pub fn last_pick_query(&self) -> Option<(i32, i32)> {
        self.last_pick_query
    }

    fn capture(&self) -> FrameCapture {
        let mut instances: Vec<(InstanceHandle, InstanceDesc)> = self
            .instances
            .iter()
            .filter_map(|(&handle, desc)| desc.map(|d| (handle, d)))
            .collect();
        instances.sort_by_key(|(handle, _)| *handle);

        let mut meshes: Vec<(MeshHandle, Vec<f32>)> = self
            .meshes
            .iter()
            .map(|(&handle, mesh)| (handle, mesh.vertices.clone()))
            .collect();
        meshes.sort_by_key(|(handle, _)| *handle);

        FrameCapture {
            view: self.view,
            fov_radians: self.fov_radians,
            lights: self.lights.clone(),
            instances,
            meshes,
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_mesh(&mut self, raytrace: bool) -> MeshHandle {
        let handle = MeshHandle::from_raw(self.issue());
        self.meshes.insert(
            handle,
            HeadlessMesh {
                raytrace,
                ..HeadlessMesh::default()
            },
        );
        self.counters.meshes_created += 1;
        handle
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) {
        if self.meshes.remove(&mesh).is_some() {
            self.counters.meshes_destroyed += 1;
        }
    }

    fn set_mesh(&mut self, mesh: MeshHandle, vertices: &[f32], vertex_count: u32, vertex_stride: u32, index_count: u32) {
        if let Some(stored) = self.meshes.get_mut(&mesh) {
            stored.vertices.clear();
            stored.vertices.extend_from_slice(vertices);
            stored.vertex_count = vertex_count;
            stored.vertex_stride = vertex_stride;
            stored.index_count = index_count;
            stored.uploads += 1;
            self.counters.mesh_uploads += 1;
        }
    }

    fn create_instance(&mut self) -> InstanceHandle {
        let handle = InstanceHandle::from_raw(self.issue());
        self.instances.insert(handle, None);
        self.counters.instances_created += 1;
        handle
    }

    fn destroy_instance(&mut self, instance: InstanceHandle) {
        if self.instances.remove(&instance).is_some() {
            self.counters.instances_destroyed += 1;
        }
    }

    fn set_instance_desc(&mut self, instance: InstanceHandle, desc: &InstanceDesc) {
        if let Some(stored) = self.instances.get_mut(&instance) {
            *stored = Some(*desc);
        }
    }

    fn create_shader(&mut self, program_id: u32, sampler: SamplerState, flags: ShaderFlags) -> ShaderHandle {
        let handle = ShaderHandle::from_raw(self.issue());
        self.shaders.insert(
            handle,
            HeadlessShader {
                program_id,
                sampler,
                flags,
            },
        );
        self.counters.shaders_created += 1;
        handle
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
    }

    fn create_texture_rgba8(&mut self, pixels: &[u8], width: u32, height: u32) -> TextureHandle {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        let handle = TextureHandle::from_raw(self.issue());
        self.textures.insert(handle, (width, height));
        self.counters.textures_created += 1;
        handle
    }

    fn set_view_perspective(&mut self, view: &Matrix4, fov_radians: f32, near: f32, far: f32) {
        self.view = *view;
        self.fov_radians = fov_radians;
        self.near = near;
        self.far = far;
    }

    fn set_scene_lights(&mut self, lights: &[Light]) {
        self.lights.clear();
        self.lights.extend_from_slice(lights);
    }

    fn set_sky_plane(&mut self, texture: Option<TextureHandle>) {
        self.sky_plane = texture;
    }

    fn draw(&mut self, _present_interval: u32) {
        self.counters.draws += 1;
        let frame = self.capture();
        self.frames.push(frame);
    }

    fn raytraced_instance_at(&mut self, x: i32, y: i32) -> Option<InstanceHandle> {
        self.last_pick_query = Some((x, y));
        self.pick_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_never_null() {
        let mut backend = HeadlessBackend::new();
        let mesh = backend.create_mesh(false);
        let instance = backend.create_instance();
        assert!(!mesh.is_null());
        assert!(!instance.is_null());
        assert_ne!(mesh.raw(), instance.raw());
    }

    #[test]
    fn test_mesh_lifecycle_counts() {
        let mut backend = HeadlessBackend::new();
        let mesh = backend.create_mesh(true);
        backend.set_mesh(mesh, &[1.0, 2.0], 1, 8, 0);
        assert_eq!(backend.mesh(mesh).unwrap().uploads, 1);
        assert!(backend.mesh(mesh).unwrap().raytrace);

        backend.destroy_mesh(mesh);
        backend.destroy_mesh(mesh);
        let counters = backend.counters();
        assert_eq!(counters.meshes_created, 1);
        assert_eq!(counters.meshes_destroyed, 1);
        assert_eq!(backend.live_meshes(), 0);
    }

    #[test]
    fn test_draw_captures_instances() {
        let mut backend = HeadlessBackend::new();
        let instance = backend.create_instance();
        backend.draw(1);
        assert!(backend.frames()[0].instances.is_empty());

        backend.set_instance_desc(instance, &InstanceDesc::default());
        backend.draw(1);
        let frames = backend.take_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].instances.len(), 1);
        assert!(backend.frames().is_empty());
    }

    #[test]
    fn test_instance_flags() {
        let mut flags = InstanceFlags::NONE;
        flags |= InstanceFlags::RASTER_BACKGROUND;
        assert!(flags.contains(InstanceFlags::RASTER_BACKGROUND));
        assert!(!flags.contains(InstanceFlags::DISABLE_BACKFACE_CULLING));
    }
}
