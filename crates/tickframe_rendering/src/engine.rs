//! # Frame Engine
//!
//! The host-facing surface. A host drives one logic tick like this:
//!
//! ```text
//!   begin_frame
//!     ├── camera, fog, viewport, scissor, textures, shader binds
//!     ├── register / build / set graph node mods
//!     └── draw_triangles_ortho / draw_triangles_persp  × many
//!   end_frame
//!     ├── scene lights = area statics + dynamic lights
//!     ├── settle
//!     ├── sub-frame × (target fps / tick rate)
//!     ├── pick resolve
//!     └── advance
//! ```
//!
//! The engine owns its backend by value. Everything is single-threaded and
//! strictly phased; nothing here locks.

use tickframe_core::{ContentHasher, GeoLayout, GraphNode, Handle, XxContentHasher};
use tickframe_shared::constants::BLANK_TEXTURE_SIZE;
use tickframe_shared::{Matrix4, Rect, Vec3};
use tracing::{debug, info, warn};

use crate::backend::{InstanceDesc, InstanceFlags, RenderBackend, TextureHandle};
use crate::commit;
use crate::config::EngineConfig;
use crate::display_list::DisplayListCache;
use crate::error::RenderResult;
use crate::interpolator::{CameraTrack, FrameInterpolator, FrameSchedule, SubFrameInputs};
use crate::light::{DynamicLights, LevelLights, SceneLights};
use crate::mesh::{process_mesh, MeshDecision, VertexFormat, VertexLayout};
use crate::mods::{apply_mod, Mod, ModRegistry, ModTarget};
use crate::overrides::{self, GeoLayoutModsDocument, LevelLightsDocument, TextureModsDocument};
use crate::picking::TexturePicker;
use crate::shader::{ProgramInfo, ShaderCache, VariantParams};
use crate::stats::TickStats;
use crate::texture::{SamplerState, TextureRegistry};

/// Raster state set by the host between draws.
#[derive(Debug, Clone, Copy)]
struct DrawState {
    viewport: Rect,
    scissor: Rect,
    fog_color: Vec3,
    fog_mul: f32,
    fog_offset: f32,
    /// True until the first perspective draw of the frame.
    background: bool,
    graph_node_mod: Option<Handle<GraphNode>>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            viewport: Rect::default(),
            scissor: Rect::default(),
            fog_color: Vec3::ONE,
            fog_mul: 0.0,
            fog_offset: 0.0,
            background: true,
            graph_node_mod: None,
        }
    }
}

/// Retained-mode draw cache and interpolating frame driver.
pub struct FrameEngine<B: RenderBackend, H: ContentHasher = XxContentHasher> {
    backend: B,
    hasher: H,
    config: EngineConfig,
    schedule: FrameSchedule,
    layout: VertexLayout,
    textures: TextureRegistry,
    shaders: ShaderCache,
    mods: ModRegistry,
    cache: DisplayListCache,
    camera: CameraTrack,
    dynamic_lights: DynamicLights,
    level_lights: LevelLights,
    scene_lights: SceneLights,
    interpolator: FrameInterpolator,
    picker: TexturePicker,
    blank_texture: TextureHandle,
    state: DrawState,
    level: usize,
    area: usize,
    stats: TickStats,
}

impl<B: RenderBackend> FrameEngine<B> {
    /// Creates an engine hashing vertex buffers with XXH64.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(backend: B, config: EngineConfig) -> RenderResult<Self> {
        Self::with_hasher(backend, config, XxContentHasher)
    }
}

impl<B: RenderBackend, H: ContentHasher> FrameEngine<B, H> {
    /// Creates an engine with a custom content hasher.
    ///
    /// Creates the blank diffuse texture and every preloaded shader variant.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn with_hasher(mut backend: B, config: EngineConfig, hasher: H) -> RenderResult<Self> {
        config.validate()?;

        let blank_pixels = vec![0xFF_u8; (BLANK_TEXTURE_SIZE * BLANK_TEXTURE_SIZE * 4) as usize];
        let blank_texture = backend.create_texture_rgba8(&blank_pixels, BLANK_TEXTURE_SIZE, BLANK_TEXTURE_SIZE);

        let mut shaders = ShaderCache::new();
        for preload in &config.preload_shaders {
            shaders.preload(&mut backend, preload);
        }

        let schedule = config.schedule();
        info!(
            target_fps = config.target_fps,
            tick_rate = config.logic_tick_rate,
            sub_frames = schedule.count(),
            preloaded_variants = shaders.variant_count(),
            "frame engine ready"
        );

        Ok(Self {
            dynamic_lights: DynamicLights::with_capacity(config.dynamic_light_capacity),
            backend,
            hasher,
            schedule,
            layout: VertexLayout::LEGACY,
            textures: TextureRegistry::new(),
            shaders,
            mods: ModRegistry::new(),
            cache: DisplayListCache::new(),
            camera: CameraTrack::new(),
            level_lights: LevelLights::new(),
            scene_lights: SceneLights::new(),
            interpolator: FrameInterpolator::new(),
            picker: TexturePicker::new(),
            blank_texture,
            state: DrawState::default(),
            level: 0,
            area: 0,
            stats: TickStats::default(),
            config,
        })
    }

    // =========================================================================
    // FRAME BRACKETS
    // =========================================================================

    /// Starts a logic tick.
    ///
    /// Clears the dynamic lights, the sky plane and the graph-node mod, and
    /// marks subsequent draws as background until the first perspective
    /// draw.
    pub fn begin_frame(&mut self) {
        self.backend.set_sky_plane(None);
        self.dynamic_lights.clear();
        self.state.background = true;
        self.state.graph_node_mod = None;
        self.stats = TickStats::default();
    }

    /// Ends a logic tick: settles, renders every sub-frame, answers a
    /// pending pick and advances the cache to the next tick.
    ///
    /// # Panics
    ///
    /// Panics if the area's static lights plus this tick's dynamic lights
    /// exceed the scene light limit.
    pub fn end_frame(&mut self) -> TickStats {
        let statics = self.level_lights.get(self.level, self.area).unwrap_or_default();
        self.scene_lights.build(statics, &self.dynamic_lights);

        self.stats.settle = commit::settle(&mut self.cache, &mut self.backend, &self.layout);

        let inputs = SubFrameInputs {
            cache: &self.cache,
            camera: &self.camera,
            dynamic_lights: &self.dynamic_lights,
            present_interval: self.config.present_interval,
        };
        for t in self.schedule.weights() {
            self.interpolator.render(&mut self.backend, &inputs, &mut self.scene_lights, t);
            self.stats.sub_frames += 1;
        }

        if let Some(picked) = self.picker.resolve(&mut self.backend) {
            debug!(texture = picked, name = ?self.textures.names().name_of(picked), "texture picked");
        }
        if self.picker.picked() != 0 {
            self.mods.ensure_material_mod(self.picker.picked());
        }

        self.stats.advance = commit::advance(&mut self.cache, &mut self.backend, &mut self.camera);
        self.stats.dynamic_lights = self.dynamic_lights.len();
        self.stats.scene_lights = self.scene_lights.len();
        self.stats
    }

    /// Releases every cached resource and hands the backend back.
    pub fn shutdown(mut self) -> B {
        self.cache.release_all(&mut self.backend);
        self.shaders.destroy_all(&mut self.backend);
        self.backend
    }

    // =========================================================================
    // TEXTURES & SHADERS
    // =========================================================================

    /// Registers a texture by name and returns its key.
    pub fn new_texture(&mut self, name: &str) -> u32 {
        self.textures.create(name)
    }

    /// Selects texture `key` into `tile`.
    ///
    /// # Panics
    ///
    /// Panics if `tile` is out of range.
    pub fn select_texture(&mut self, tile: usize, key: u32) {
        self.textures.select(tile, key);
    }

    /// Uploads RGBA8 pixels for the texture selected in the current tile.
    pub fn upload_texture(&mut self, pixels: &[u8], width: u32, height: u32) {
        let handle = self.backend.create_texture_rgba8(pixels, width, height);
        if !self.textures.attach_upload(handle) {
            warn!(width, height, "texture upload with no texture selected");
        }
    }

    /// Stores sampler parameters for the texture selected in `tile`.
    ///
    /// # Panics
    ///
    /// Panics if `tile` is out of range.
    pub fn set_sampler_parameters(&mut self, tile: usize, linear_filter: bool, cms: u32, cmt: u32) {
        self.textures.set_sampler(tile, linear_filter, cms, cmt);
    }

    /// Binds a legacy shader program for subsequent draws.
    pub fn bind_shader(&mut self, program_id: u32) -> ProgramInfo {
        self.shaders.bind(program_id)
    }

    // =========================================================================
    // RASTER STATE & CAMERA
    // =========================================================================

    /// Sets the viewport for subsequent draws.
    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.state.viewport = Rect::new(x, y, width, height);
    }

    /// Sets the scissor for subsequent draws.
    pub fn set_scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.state.scissor = Rect::new(x, y, width, height);
    }

    /// Sets the fog copied into every subsequent material.
    pub fn set_fog(&mut self, r: u8, g: u8, b: u8, fog_mul: i16, fog_offset: i16) {
        self.state.fog_color = Vec3::new(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0);
        self.state.fog_mul = f32::from(fog_mul);
        self.state.fog_offset = f32::from(fog_offset);
    }

    /// Sets the projection. `can_interpolate = false` renders this tick's
    /// frames with the new camera only.
    pub fn set_camera_perspective(&mut self, fov_degrees: f32, near: f32, far: f32, can_interpolate: bool) {
        self.camera.set_perspective(fov_degrees, near, far, can_interpolate);
    }

    /// Sets the view matrix.
    pub fn set_camera_matrix(&mut self, view: Matrix4) {
        self.camera.set_view(view);
    }

    // =========================================================================
    // DRAWS
    // =========================================================================

    /// Submits screen-space triangles. Never raytraced.
    ///
    /// # Panics
    ///
    /// Panics if no program is bound or the triangle count doesn't match
    /// the buffer.
    pub fn draw_triangles_ortho(&mut self, vertices: &[f32], triangle_count: u32, double_sided: bool, uid: u32) {
        self.submit_draw(vertices, triangle_count, Matrix4::IDENTITY, double_sided, false, uid);
    }

    /// Submits world-space triangles under `transform`. Raytraced.
    ///
    /// # Panics
    ///
    /// Panics if no program is bound or the triangle count doesn't match
    /// the buffer.
    pub fn draw_triangles_persp(
        &mut self,
        vertices: &[f32],
        triangle_count: u32,
        transform: &Matrix4,
        double_sided: bool,
        uid: u32,
    ) {
        self.state.background = false;
        self.submit_draw(vertices, triangle_count, *transform, double_sided, true, uid);
    }

    fn submit_draw(
        &mut self,
        vertices: &[f32],
        triangle_count: u32,
        transform: Matrix4,
        double_sided: bool,
        raytrace: bool,
        uid: u32,
    ) {
        let Some(program) = self.shaders.bound() else {
            panic!("draw submitted with no shader program bound");
        };
        let format = VertexFormat::for_program(&program, vertices.len(), triangle_count, raytrace);
        let hash = self.hasher.hash_floats(vertices);

        let Self {
            backend,
            textures,
            shaders,
            mods,
            cache,
            dynamic_lights,
            picker,
            blank_texture,
            state,
            stats,
            ..
        } = self;

        let list = cache.list_mut(uid);
        list.touched = true;
        let index = list.live_count;
        list.instance_at(backend, index);
        let slot = &mut list.instances[index];
        slot.stage(transform, state.scissor, state.viewport);
        let prev_valid = slot.prev_valid();

        let mut diffuse = *blank_texture;
        let mut sampler = SamplerState::default();
        let mut texture_mod = None;
        let mut highlight = false;
        if program.used_textures[0] {
            if let Some(record) = textures.current() {
                sampler = record.sampler();
                if !record.handle.is_null() {
                    diffuse = record.handle;
                }
                texture_mod = mods.resolve_texture_mod(record.hash);
                highlight = picker.should_highlight(record.hash);
                picker.record(slot.instance(), record.hash);
            }
        }

        let interpolate = uid != 0;
        let prev = if prev_valid && interpolate { slot.transform.prev() } else { transform };
        let mut target = ModTarget::new(interpolate);
        if let Some(node_mod) = state.graph_node_mod.and_then(|node| mods.graph_node_mod(node)) {
            apply_mod(&mut target, node_mod, &prev, &transform, None, textures);
        }
        if let Some(texture_mod) = texture_mod {
            apply_mod(&mut target, texture_mod, &prev, &transform, Some(dynamic_lights), textures);
        }
        if !prev_valid || !target.interpolate {
            slot.snap();
        }

        let mut material = target.material;
        if highlight {
            material.highlight();
        }
        material.fog_color = state.fog_color;
        material.fog_mul = state.fog_mul;
        material.fog_offset = state.fog_offset;
        material.fog_enabled = program.uses_fog();

        let params = VariantParams::new(
            raytrace,
            sampler,
            !target.normal_texture.is_null(),
            !target.specular_texture.is_null(),
        );
        let (shader, created) = shaders.variant(backend, program.id, params);
        if created {
            debug!(program = program.id, key = params.key(), "shader variant created on demand");
            stats.shader_variants_created += 1;
        }

        let (mesh, decision) = process_mesh(
            backend,
            &mut list.meshes,
            index,
            vertices,
            hash,
            format,
            prev_valid,
            target.interpolate,
        );
        match decision {
            MeshDecision::Reused => stats.reused_meshes += 1,
            MeshDecision::Staged => stats.staged_meshes += 1,
            MeshDecision::Rebuilt => stats.rebuilt_meshes += 1,
        }

        let mut flags = InstanceFlags::NONE;
        if state.background {
            flags |= InstanceFlags::RASTER_BACKGROUND;
        }
        if double_sided {
            flags |= InstanceFlags::DISABLE_BACKFACE_CULLING;
        }

        list.instances[index].desc = InstanceDesc {
            mesh,
            shader,
            diffuse_texture: diffuse,
            normal_texture: target.normal_texture,
            specular_texture: target.specular_texture,
            material,
            transform,
            scissor: state.scissor,
            viewport: state.viewport,
            flags,
        };
        list.live_count += 1;
        stats.draws += 1;
    }

    // =========================================================================
    // GRAPH NODES & MODS
    // =========================================================================

    /// Issues a graph node handle.
    pub fn new_graph_node(&mut self) -> Handle<GraphNode> {
        self.mods.new_graph_node()
    }

    /// Releases a graph node and its mod.
    pub fn release_graph_node(&mut self, node: Handle<GraphNode>) -> bool {
        if self.state.graph_node_mod == Some(node) {
            self.state.graph_node_mod = None;
        }
        self.mods.release_graph_node(node)
    }

    /// Handle for a named geo layout, issued on first use.
    pub fn geo_layout(&mut self, name: &str) -> Handle<GeoLayout> {
        self.mods.geo_layout(name)
    }

    /// Stores the mod for a geo layout. Returns false for a stale handle.
    pub fn set_geo_layout_mod(&mut self, geo_layout: Handle<GeoLayout>, m: Mod) -> bool {
        self.mods.set_geo_layout_mod(geo_layout, m)
    }

    /// Rebuilds `graph_node`'s mod from `geo_layout`'s.
    pub fn register_layout_graph_node(
        &mut self,
        geo_layout: Option<Handle<GeoLayout>>,
        graph_node: Option<Handle<GraphNode>>,
    ) {
        self.mods.register_graph_node(geo_layout, graph_node);
    }

    /// Emits the node's light (if any) under `modelview` and returns the
    /// handle to pass to [`Self::set_graph_node_mod`], or `None` if the
    /// node has no mod.
    ///
    /// # Panics
    ///
    /// Panics if the dynamic light list is full.
    pub fn build_graph_node_mod(
        &mut self,
        graph_node: Handle<GraphNode>,
        modelview: &Matrix4,
        uid: u32,
    ) -> Option<Handle<GraphNode>> {
        let node_mod = self.mods.graph_node_mod(graph_node)?;
        let (light, interpolation_enabled) = (node_mod.light, node_mod.interpolation_enabled);

        if let Some(light) = light {
            let new = *modelview * *self.camera.inverse_view();
            let mut prev = new;
            if uid != 0 && interpolation_enabled {
                let list = self.cache.list_mut(uid);
                if list.transform().prev_valid() {
                    prev = list.transform().prev();
                }
                list.set_transform(new);
            }
            self.dynamic_lights.add(&light, &prev, &new);
        }
        Some(graph_node)
    }

    /// Selects the graph-node mod applied to subsequent draws.
    pub fn set_graph_node_mod(&mut self, graph_node: Option<Handle<GraphNode>>) {
        self.state.graph_node_mod = graph_node;
    }

    // =========================================================================
    // SCENE
    // =========================================================================

    /// Shows texture `key` on the sky plane for this tick.
    pub fn set_skybox_texture(&mut self, key: u32) {
        let handle = self
            .textures
            .get(key)
            .map(|record| record.handle)
            .filter(|handle| !handle.is_null());
        if handle.is_none() {
            warn!(key, "skybox texture has no upload");
        }
        self.backend.set_sky_plane(handle);
    }

    /// Selects which static light table the scene uses. Out-of-range
    /// indices fall back to level 0, area 0.
    pub fn set_area(&mut self, level: usize, area: usize) {
        if let Err(err) = self.level_lights.get(level, area) {
            warn!(level, area, %err, "falling back to level 0 area 0");
            self.level = 0;
            self.area = 0;
            return;
        }
        self.level = level;
        self.area = area;
    }

    // =========================================================================
    // PICKING
    // =========================================================================

    /// Asks for the texture under `(x, y)` at the end of this tick.
    pub fn request_pick(&mut self, x: i32, y: i32) {
        self.picker.request(x, y);
    }

    /// Toggles highlighting of the picked texture.
    pub fn set_pick_highlight(&mut self, highlight: bool) {
        self.picker.set_highlight(highlight);
    }

    /// Picked texture hash, 0 for none.
    #[must_use]
    pub fn picked_texture(&self) -> u64 {
        self.picker.picked()
    }

    /// Texture mod of the picked texture with a material present, for
    /// editing. `None` if nothing is picked.
    pub fn picked_texture_mod_mut(&mut self) -> Option<&mut Mod> {
        match self.picker.picked() {
            0 => None,
            hash => Some(self.mods.ensure_material_mod(hash)),
        }
    }

    // =========================================================================
    // PERSISTED OVERRIDES
    // =========================================================================

    /// Loads texture mods and aliases. Returns how many mods were stored.
    pub fn import_texture_mods(&mut self, doc: &TextureModsDocument) -> usize {
        overrides::import_texture_mods(doc, &mut self.mods, self.textures.names_mut())
    }

    /// Writes every texture mod out by name.
    #[must_use]
    pub fn export_texture_mods(&self) -> TextureModsDocument {
        overrides::export_texture_mods(&self.mods, self.textures.names())
    }

    /// Loads geo layout mods. Returns how many were stored.
    pub fn import_geo_layout_mods(&mut self, doc: &GeoLayoutModsDocument) -> usize {
        overrides::import_geo_layout_mods(doc, &mut self.mods, self.textures.names_mut())
    }

    /// Writes every geo layout mod out by name.
    #[must_use]
    pub fn export_geo_layout_mods(&self) -> GeoLayoutModsDocument {
        overrides::export_geo_layout_mods(&self.mods, self.textures.names())
    }

    /// Loads static level lights.
    ///
    /// # Errors
    ///
    /// Returns an error for out-of-range ids or an over-full area.
    pub fn import_level_lights(&mut self, doc: &LevelLightsDocument) -> RenderResult<()> {
        overrides::import_level_lights(doc, &mut self.level_lights)
    }

    /// Writes every level's static lights.
    ///
    /// # Errors
    ///
    /// Returns an error if the light table cannot be read back.
    pub fn export_level_lights(&self) -> RenderResult<LevelLightsDocument> {
        overrides::export_level_lights(&self.level_lights)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// The backend.
    #[inline]
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Cached display lists.
    #[inline]
    #[must_use]
    pub const fn cache(&self) -> &DisplayListCache {
        &self.cache
    }

    /// Mod registry.
    #[inline]
    #[must_use]
    pub const fn mods(&self) -> &ModRegistry {
        &self.mods
    }

    /// Mod registry, mutably.
    #[inline]
    pub fn mods_mut(&mut self) -> &mut ModRegistry {
        &mut self.mods
    }

    /// Texture registry.
    #[inline]
    #[must_use]
    pub const fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    /// Shader programs and variants.
    #[inline]
    #[must_use]
    pub const fn shaders(&self) -> &ShaderCache {
        &self.shaders
    }

    /// Camera state.
    #[inline]
    #[must_use]
    pub const fn camera(&self) -> &CameraTrack {
        &self.camera
    }

    /// Dynamic lights emitted so far this tick.
    #[inline]
    #[must_use]
    pub const fn dynamic_lights(&self) -> &DynamicLights {
        &self.dynamic_lights
    }

    /// Static level lights.
    #[inline]
    pub fn level_lights_mut(&mut self) -> &mut LevelLights {
        &mut self.level_lights
    }

    /// Configuration the engine was built with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Blank texture bound to untextured draws.
    #[inline]
    #[must_use]
    pub const fn blank_texture(&self) -> TextureHandle {
        self.blank_texture
    }
}
