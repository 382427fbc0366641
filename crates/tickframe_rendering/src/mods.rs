//! # Mod Resolution
//!
//! Overrides live in three key spaces:
//!
//! ```text
//!   texture hash ──(alias, one hop)──► texture mod ─────────────┐
//!                                                               ├──► apply_mod ──► draw
//!   geo layout ──► geo layout mod ──merge──► graph node mod ────┘
//! ```
//!
//! A graph-node mod is rebuilt from its geo layout each time the node is
//! registered. Draws apply the current graph-node mod first and the texture
//! mod second, so texture overrides win on overlapping attributes.

use std::collections::{BTreeMap, HashMap};

use tickframe_core::{AliasTable, GeoLayout, GraphNode, Handle, HandleAllocator};
use tickframe_shared::Matrix4;

use crate::backend::TextureHandle;
use crate::light::{DynamicLights, Light};
use crate::material::Material;
use crate::texture::TextureRegistry;

/// A sparse override bundle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mod {
    /// Material override; only fields enabled in its mask apply.
    pub material: Option<Material>,
    /// Light emitted at the draw's transform.
    pub light: Option<Light>,
    /// Name hash of the normal map, 0 for none.
    pub normal_map_hash: u64,
    /// Name hash of the specular map, 0 for none.
    pub specular_map_hash: u64,
    /// Cleared to draw without temporal interpolation.
    pub interpolation_enabled: bool,
}

impl Mod {
    /// A mod that changes nothing.
    pub const EMPTY: Self = Self {
        material: None,
        light: None,
        normal_map_hash: 0,
        specular_map_hash: 0,
        interpolation_enabled: true,
    };

    /// Merges `src` over `self`.
    ///
    /// Material masks are unioned with `src` winning per field, a light is
    /// replaced wholesale, map hashes are replaced when non-zero and the
    /// interpolation flag is AND-ed.
    pub fn merge_from(&mut self, src: &Self) {
        if let Some(src_material) = &src.material {
            let material = self.material.get_or_insert_with(Material::empty_mod);
            material.apply_attributes(src_material);
            material.enabled |= src_material.enabled;
        }
        if src.light.is_some() {
            self.light = src.light;
        }
        if src.normal_map_hash != 0 {
            self.normal_map_hash = src.normal_map_hash;
        }
        if src.specular_map_hash != 0 {
            self.specular_map_hash = src.specular_map_hash;
        }
        self.interpolation_enabled &= src.interpolation_enabled;
    }
}

impl Default for Mod {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// The per-draw state a mod writes into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModTarget {
    /// Material being built.
    pub material: Material,
    /// Normal map reference.
    pub normal_texture: TextureHandle,
    /// Specular map reference.
    pub specular_texture: TextureHandle,
    /// Whether the draw still interpolates.
    pub interpolate: bool,
}

impl ModTarget {
    /// Default material, no maps, interpolation as given.
    #[must_use]
    pub const fn new(interpolate: bool) -> Self {
        Self {
            material: Material::DEFAULT,
            normal_texture: TextureHandle::NULL,
            specular_texture: TextureHandle::NULL,
            interpolate,
        }
    }
}

/// Applies `m` to `target`.
///
/// When `lights` is given and the mod carries a light, the light is emitted
/// under `prev` and `new` (both `new` once interpolation is off). Map hashes
/// that don't resolve to an uploaded texture leave the reference alone.
pub fn apply_mod(
    target: &mut ModTarget,
    m: &Mod,
    prev: &Matrix4,
    new: &Matrix4,
    lights: Option<&mut DynamicLights>,
    textures: &TextureRegistry,
) {
    if !m.interpolation_enabled {
        target.interpolate = false;
    }

    if let Some(material) = &m.material {
        target.material.apply_attributes(material);
    }

    if let (Some(lights), Some(light)) = (lights, &m.light) {
        let from = if target.interpolate { prev } else { new };
        lights.add(light, from, new);
    }

    if m.normal_map_hash != 0 {
        if let Some(handle) = textures.handle_for_hash(m.normal_map_hash) {
            target.normal_texture = handle;
        }
    }
    if m.specular_map_hash != 0 {
        if let Some(handle) = textures.handle_for_hash(m.specular_map_hash) {
            target.specular_texture = handle;
        }
    }
}

/// Every mod known to the session.
#[derive(Debug, Default)]
pub struct ModRegistry {
    texture_mods: HashMap<u64, Mod>,
    aliases: AliasTable,
    geo_layouts: HandleAllocator<GeoLayout>,
    geo_layout_by_name: BTreeMap<String, Handle<GeoLayout>>,
    geo_layout_names: HashMap<Handle<GeoLayout>, String>,
    geo_layout_mods: HashMap<Handle<GeoLayout>, Mod>,
    graph_nodes: HandleAllocator<GraphNode>,
    graph_node_mods: HashMap<Handle<GraphNode>, Mod>,
}

impl ModRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Texture mods ===

    /// Texture mod stored directly under `hash`.
    #[must_use]
    pub fn texture_mod(&self, hash: u64) -> Option<&Mod> {
        self.texture_mods.get(&hash)
    }

    /// Mutable texture mod stored directly under `hash`.
    pub fn texture_mod_mut(&mut self, hash: u64) -> Option<&mut Mod> {
        self.texture_mods.get_mut(&hash)
    }

    /// Stores a texture mod, replacing any previous one.
    pub fn set_texture_mod(&mut self, hash: u64, m: Mod) {
        self.texture_mods.insert(hash, m);
    }

    /// Removes a texture mod.
    pub fn remove_texture_mod(&mut self, hash: u64) -> Option<Mod> {
        self.texture_mods.remove(&hash)
    }

    /// Texture mod for a drawn texture, following one alias hop.
    #[must_use]
    pub fn resolve_texture_mod(&self, hash: u64) -> Option<&Mod> {
        self.texture_mods.get(&self.aliases.resolve(hash))
    }

    /// Texture mod for `hash` with a material present, created empty if
    /// needed.
    pub fn ensure_material_mod(&mut self, hash: u64) -> &mut Mod {
        let m = self.texture_mods.entry(hash).or_default();
        m.material.get_or_insert_with(Material::empty_mod);
        m
    }

    /// All texture mods.
    pub fn texture_mods(&self) -> impl Iterator<Item = (u64, &Mod)> {
        self.texture_mods.iter().map(|(&hash, m)| (hash, m))
    }

    /// Number of texture mods.
    #[must_use]
    pub fn texture_mod_count(&self) -> usize {
        self.texture_mods.len()
    }

    /// Texture aliases.
    #[must_use]
    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Mutable texture aliases.
    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    // === Geo layouts ===

    /// Handle for a named geo layout, issued on first use.
    pub fn geo_layout(&mut self, name: &str) -> Handle<GeoLayout> {
        if let Some(&handle) = self.geo_layout_by_name.get(name) {
            return handle;
        }
        let handle = self.geo_layouts.allocate();
        self.geo_layout_by_name.insert(name.to_owned(), handle);
        self.geo_layout_names.insert(handle, name.to_owned());
        handle
    }

    /// Handle for a named geo layout, if registered.
    #[must_use]
    pub fn find_geo_layout(&self, name: &str) -> Option<Handle<GeoLayout>> {
        self.geo_layout_by_name.get(name).copied()
    }

    /// Name a geo layout was registered under.
    #[must_use]
    pub fn geo_layout_name(&self, handle: Handle<GeoLayout>) -> Option<&str> {
        self.geo_layout_names.get(&handle).map(String::as_str)
    }

    /// Registered geo layouts in name order.
    pub fn geo_layouts(&self) -> impl Iterator<Item = (&str, Handle<GeoLayout>)> {
        self.geo_layout_by_name
            .iter()
            .map(|(name, &handle)| (name.as_str(), handle))
    }

    /// Mod for a geo layout.
    #[must_use]
    pub fn geo_layout_mod(&self, handle: Handle<GeoLayout>) -> Option<&Mod> {
        self.geo_layout_mods.get(&handle)
    }

    /// Mutable mod for a geo layout.
    pub fn geo_layout_mod_mut(&mut self, handle: Handle<GeoLayout>) -> Option<&mut Mod> {
        self.geo_layout_mods.get_mut(&handle)
    }

    /// Stores a geo layout mod. Returns false if the handle is stale.
    pub fn set_geo_layout_mod(&mut self, handle: Handle<GeoLayout>, m: Mod) -> bool {
        if !self.geo_layouts.is_live(handle) {
            return false;
        }
        self.geo_layout_mods.insert(handle, m);
        true
    }

    // === Graph nodes ===

    /// Issues a graph node handle.
    pub fn new_graph_node(&mut self) -> Handle<GraphNode> {
        self.graph_nodes.allocate()
    }

    /// Releases a graph node and its mod. Returns false if already stale.
    pub fn release_graph_node(&mut self, node: Handle<GraphNode>) -> bool {
        self.graph_node_mods.remove(&node);
        self.graph_nodes.release(node)
    }

    /// Discards `node`'s mod and rebuilds it from `geo_layout`'s mod.
    ///
    /// Either side may be absent; nothing is built unless both are present
    /// and the geo layout has a mod.
    pub fn register_graph_node(&mut self, geo_layout: Option<Handle<GeoLayout>>, node: Option<Handle<GraphNode>>) {
        let Some(node) = node else {
            return;
        };
        self.graph_node_mods.remove(&node);
        if !self.graph_nodes.is_live(node) {
            return;
        }
        let Some(geo_mod) = geo_layout.and_then(|geo| self.geo_layout_mods.get(&geo)) else {
            return;
        };
        let mut merged = Mod::EMPTY;
        merged.merge_from(geo_mod);
        self.graph_node_mods.insert(node, merged);
    }

    /// Mod built for a graph node.
    #[must_use]
    pub fn graph_node_mod(&self, node: Handle<GraphNode>) -> Option<&Mod> {
        self.graph_node_mods.get(&node)
    }

    /// Merges an extra mod into a node's mod, creating it if needed.
    pub fn merge_into_graph_node(&mut self, node: Handle<GraphNode>, src: &Mod) {
        if !self.graph_nodes.is_live(node) {
            return;
        }
        self.graph_node_mods.entry(node).or_default().merge_from(src);
    }

    /// Number of live graph nodes.
    #[must_use]
    pub fn graph_node_count(&self) -> usize {
        self.graph_nodes.live_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::AttributeMask;
    use tickframe_core::hash_name;
    use tickframe_shared::Vec3;

    fn material_mod(mask: AttributeMask, reflection: f32) -> Mod {
        let mut material = Material::empty_mod();
        material.enabled = mask;
        material.reflection_factor = reflection;
        material.depth_bias = 2.0;
        Mod {
            material: Some(material),
            ..Mod::EMPTY
        }
    }

    #[test]
    fn test_merge_unions_masks_and_ands_interpolation() {
        let mut dst = material_mod(AttributeMask::DEPTH_BIAS, 0.0);
        let src = Mod {
            interpolation_enabled: false,
            normal_map_hash: 7,
            ..material_mod(AttributeMask::REFLECTION_FACTOR, 0.5)
        };
        dst.merge_from(&src);
        let material = dst.material.unwrap();
        assert!(material.enabled.contains(AttributeMask::DEPTH_BIAS));
        assert!(material.enabled.contains(AttributeMask::REFLECTION_FACTOR));
        assert_eq!(material.reflection_factor, 0.5);
        assert_eq!(dst.normal_map_hash, 7);
        assert!(!dst.interpolation_enabled);

        dst.merge_from(&Mod::EMPTY);
        assert!(!dst.interpolation_enabled);
        assert_eq!(dst.normal_map_hash, 7);
    }

    #[test]
    fn test_merge_twice_same_mask() {
        let src = material_mod(AttributeMask::REFLECTION_FACTOR | AttributeMask::SELF_LIGHT, 0.3);
        let mut once = Mod::EMPTY;
        once.merge_from(&src);
        let mut twice = Mod::EMPTY;
        twice.merge_from(&src);
        twice.merge_from(&src);
        assert_eq!(once.material.unwrap().enabled, twice.material.unwrap().enabled);
    }

    #[test]
    fn test_register_discards_previous_mod() {
        let mut registry = ModRegistry::new();
        let geo = registry.geo_layout("mario_head");
        let node = registry.new_graph_node();
        registry.set_geo_layout_mod(geo, material_mod(AttributeMask::DEPTH_BIAS, 0.0));

        registry.register_graph_node(Some(geo), Some(node));
        registry.merge_into_graph_node(node, &Mod { interpolation_enabled: false, ..Mod::EMPTY });
        assert!(!registry.graph_node_mod(node).unwrap().interpolation_enabled);

        registry.register_graph_node(Some(geo), Some(node));
        assert!(registry.graph_node_mod(node).unwrap().interpolation_enabled);

        registry.register_graph_node(None, Some(node));
        assert!(registry.graph_node_mod(node).is_none());
    }

    #[test]
    fn test_released_node_does_not_alias() {
        let mut registry = ModRegistry::new();
        let geo = registry.geo_layout("coin");
        registry.set_geo_layout_mod(geo, material_mod(AttributeMask::DEPTH_BIAS, 0.0));

        let old = registry.new_graph_node();
        registry.register_graph_node(Some(geo), Some(old));
        assert!(registry.release_graph_node(old));

        let fresh = registry.new_graph_node();
        assert_eq!(fresh.index(), old.index());
        assert!(registry.graph_node_mod(fresh).is_none());
        registry.register_graph_node(Some(geo), Some(old));
        assert!(registry.graph_node_mod(old).is_none());
    }

    #[test]
    fn test_geo_layout_names_are_stable() {
        let mut registry = ModRegistry::new();
        let a = registry.geo_layout("a");
        assert_eq!(registry.geo_layout("a"), a);
        assert_eq!(registry.geo_layout_name(a), Some("a"));
        assert_eq!(registry.find_geo_layout("b"), None);
    }

    #[test]
    fn test_resolve_follows_one_alias_hop() {
        let mut registry = ModRegistry::new();
        let canonical = hash_name("canon");
        registry.set_texture_mod(canonical, material_mod(AttributeMask::DEPTH_BIAS, 0.0));
        registry.aliases_mut().insert(hash_name("alias"), canonical);
        assert!(registry.resolve_texture_mod(hash_name("alias")).is_some());
        assert!(registry.resolve_texture_mod(hash_name("other")).is_none());
    }

    #[test]
    fn test_apply_mod_emits_light_and_resolves_maps() {
        let mut textures = TextureRegistry::new();
        let normal = textures.create("normal");
        textures.select(0, normal);
        textures.attach_upload(TextureHandle::from_raw(40));

        let m = Mod {
            light: Some(Light {
                position: Vec3::ZERO,
                attenuation_radius: 10.0,
                ..Light::default()
            }),
            normal_map_hash: hash_name("normal"),
            specular_map_hash: hash_name("missing"),
            ..material_mod(AttributeMask::REFLECTION_FACTOR, 0.25)
        };

        let mut lights = DynamicLights::with_capacity(4);
        let mut target = ModTarget::new(true);
        let prev = Matrix4::translation(1.0, 0.0, 0.0);
        let new = Matrix4::translation(3.0, 0.0, 0.0);
        apply_mod(&mut target, &m, &prev, &new, Some(&mut lights), &textures);

        assert_eq!(target.material.reflection_factor, 0.25);
        assert_eq!(target.normal_texture, TextureHandle::from_raw(40));
        assert!(target.specular_texture.is_null());
        assert_eq!(lights.pairs()[0].prev.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(lights.pairs()[0].new.position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_apply_mod_without_interpolation_snaps_light() {
        let textures = TextureRegistry::new();
        let m = Mod {
            light: Some(Light::default()),
            interpolation_enabled: false,
            ..Mod::EMPTY
        };
        let mut lights = DynamicLights::with_capacity(4);
        let mut target = ModTarget::new(true);
        let prev = Matrix4::translation(1.0, 0.0, 0.0);
        let new = Matrix4::translation(3.0, 0.0, 0.0);
        apply_mod(&mut target, &m, &prev, &new, Some(&mut lights), &textures);

        assert!(!target.interpolate);
        assert_eq!(lights.pairs()[0].prev.position, lights.pairs()[0].new.position);
    }
}
