//! # Shader Programs & Variants
//!
//! A legacy program id packs two four-slot combiner groups, 3 bits per
//! slot, plus option bits:
//!
//! ```text
//!   bits  0..12   color combiner  (4 × 3 bits)
//!   bits 12..24   alpha combiner  (4 × 3 bits)
//!   bit  24       alpha option
//!   bit  25       fog option
//! ```
//!
//! Each program owns a cache of backend shader variants keyed by the
//! sampler state and the map textures a draw ends up with.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tickframe_shared::constants::{
    VERTEX_FIXED_BYTES, VERTEX_INPUT_RGBA_BYTES, VERTEX_INPUT_RGB_BYTES, VERTEX_TEXCOORD_BYTES,
};

use crate::backend::{RenderBackend, ShaderHandle};
use crate::texture::{AddressMode, Filter, SamplerState};

/// Combiner input 1.
pub const SHADER_INPUT_1: u32 = 1;
/// Combiner input 4.
pub const SHADER_INPUT_4: u32 = 4;
/// First texture sample.
pub const SHADER_TEXEL0: u32 = 5;
/// First texture sample, alpha channel.
pub const SHADER_TEXEL0A: u32 = 6;
/// Second texture sample.
pub const SHADER_TEXEL1: u32 = 7;
/// Program blends with per-vertex alpha.
pub const SHADER_OPT_ALPHA: u32 = 1 << 24;
/// Program applies fog.
pub const SHADER_OPT_FOG: u32 = 1 << 25;

/// Backend shader creation flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ShaderFlags(u32);

impl ShaderFlags {
    /// Rasterized variant.
    pub const RASTER: Self = Self(1 << 0);
    /// Raytraced variant.
    pub const RAYTRACE: Self = Self(1 << 1);
    /// Samples a normal map.
    pub const NORMAL_MAP: Self = Self(1 << 2);
    /// Samples a specular map.
    pub const SPECULAR_MAP: Self = Self(1 << 3);

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

impl std::ops::BitOr for ShaderFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Everything that selects one compiled variant of a program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantParams {
    /// Raytraced instead of rasterized.
    pub raytrace: bool,
    /// Texture filter.
    pub filter: Filter,
    /// Horizontal addressing.
    pub h_address: AddressMode,
    /// Vertical addressing.
    pub v_address: AddressMode,
    /// Samples a normal map.
    pub normal_map: bool,
    /// Samples a specular map.
    pub specular_map: bool,
}

impl VariantParams {
    /// Parameters for a draw.
    #[must_use]
    pub const fn new(raytrace: bool, sampler: SamplerState, normal_map: bool, specular_map: bool) -> Self {
        Self {
            raytrace,
            filter: sampler.filter,
            h_address: sampler.h_address,
            v_address: sampler.v_address,
            normal_map,
            specular_map,
        }
    }

    /// Mixed-radix packing: raytrace ×2, filter ×2, addressing ×3 ×3,
    /// normal ×2, specular ×2.
    #[must_use]
    pub const fn key(self) -> u16 {
        let mut key = 0_u16;
        let mut fact = 1_u16;
        if self.raytrace {
            key += fact;
        }
        fact *= 2;
        key += self.filter as u16 * fact;
        fact *= 2;
        key += self.h_address as u16 * fact;
        fact *= 3;
        key += self.v_address as u16 * fact;
        fact *= 3;
        if self.normal_map {
            key += fact;
        }
        fact *= 2;
        if self.specular_map {
            key += fact;
        }
        key
    }

    /// Backend creation flags.
    #[must_use]
    pub fn flags(self) -> ShaderFlags {
        let mut flags = if self.raytrace { ShaderFlags::RAYTRACE } else { ShaderFlags::RASTER };
        if self.normal_map {
            flags = flags | ShaderFlags::NORMAL_MAP;
        }
        if self.specular_map {
            flags = flags | ShaderFlags::SPECULAR_MAP;
        }
        flags
    }

    /// Sampler portion.
    #[must_use]
    pub const fn sampler(self) -> SamplerState {
        SamplerState {
            filter: self.filter,
            h_address: self.h_address,
            v_address: self.v_address,
        }
    }
}

/// A program id paired with variant parameters, for preloading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderPreload {
    /// Legacy program id.
    pub program_id: u32,
    /// Variant to create.
    #[serde(flatten)]
    pub params: VariantParams,
}

/// Decoded facts about a program that drive vertex layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramInfo {
    /// Legacy program id.
    pub id: u32,
    /// Highest combiner input referenced (0..=4).
    pub num_inputs: u8,
    /// Which texture tiles are sampled.
    pub used_textures: [bool; 2],
}

impl ProgramInfo {
    /// Decodes a program id.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(id: u32) -> Self {
        let mut num_inputs = 0_u32;
        let mut used_textures = [false; 2];
        for group in 0..2 {
            for slot in 0..4 {
                let value = (id >> (group * 12 + slot * 3)) & 7;
                if (SHADER_INPUT_1..=SHADER_INPUT_4).contains(&value) {
                    num_inputs = num_inputs.max(value);
                }
                if value == SHADER_TEXEL0 || value == SHADER_TEXEL0A {
                    used_textures[0] = true;
                }
                if value == SHADER_TEXEL1 {
                    used_textures[1] = true;
                }
            }
        }
        Self {
            id,
            num_inputs: num_inputs as u8,
            used_textures,
        }
    }

    /// Samples any texture.
    #[must_use]
    pub const fn uses_texture(&self) -> bool {
        self.used_textures[0] || self.used_textures[1]
    }

    /// Alpha option bit.
    #[must_use]
    pub const fn uses_alpha(&self) -> bool {
        self.id & SHADER_OPT_ALPHA != 0
    }

    /// Fog option bit.
    #[must_use]
    pub const fn uses_fog(&self) -> bool {
        self.id & SHADER_OPT_FOG != 0
    }

    /// Bytes per vertex for buffers drawn with this program.
    #[must_use]
    pub const fn vertex_stride(&self) -> u32 {
        let texcoord = if self.uses_texture() { VERTEX_TEXCOORD_BYTES } else { 0 };
        let per_input = if self.uses_alpha() { VERTEX_INPUT_RGBA_BYTES } else { VERTEX_INPUT_RGB_BYTES };
        VERTEX_FIXED_BYTES + texcoord + self.num_inputs as u32 * per_input
    }
}

/// A program and the variants created for it.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    info: ProgramInfo,
    variants: HashMap<u16, ShaderHandle>,
}

impl ShaderProgram {
    /// Decodes `id` into a program with no variants.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self {
            info: ProgramInfo::decode(id),
            variants: HashMap::new(),
        }
    }

    /// Decoded program facts.
    #[must_use]
    pub const fn info(&self) -> ProgramInfo {
        self.info
    }

    /// Variant for `params`, if created.
    #[must_use]
    pub fn variant(&self, params: VariantParams) -> Option<ShaderHandle> {
        self.variants.get(&params.key()).copied()
    }

    /// Number of variants created.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }
}

/// All programs seen this session and the one currently bound.
#[derive(Debug, Default)]
pub struct ShaderCache {
    programs: HashMap<u32, ShaderProgram>,
    bound: Option<u32>,
}

impl ShaderCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Program for `id`, if it has been created.
    #[must_use]
    pub fn lookup(&self, id: u32) -> Option<&ShaderProgram> {
        self.programs.get(&id)
    }

    /// Binds `id`, decoding it first if needed.
    pub fn bind(&mut self, id: u32) -> ProgramInfo {
        let program = self.programs.entry(id).or_insert_with(|| ShaderProgram::new(id));
        self.bound = Some(id);
        program.info
    }

    /// The bound program.
    #[must_use]
    pub fn bound(&self) -> Option<ProgramInfo> {
        self.bound
            .and_then(|id| self.programs.get(&id))
            .map(ShaderProgram::info)
    }

    /// Variant of program `id` for `params`, created through `backend` if
    /// missing. The flag is true when a new variant was created.
    pub fn variant<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        id: u32,
        params: VariantParams,
    ) -> (ShaderHandle, bool) {
        let program = self.programs.entry(id).or_insert_with(|| ShaderProgram::new(id));
        let key = params.key();
        if let Some(&handle) = program.variants.get(&key) {
            return (handle, false);
        }
        let handle = backend.create_shader(id, params.sampler(), params.flags());
        program.variants.insert(key, handle);
        (handle, true)
    }

    /// Creates the variant named by `preload` without binding anything.
    pub fn preload<B: RenderBackend>(&mut self, backend: &mut B, preload: &ShaderPreload) {
        let _ = self.variant(backend, preload.program_id, preload.params);
    }

    /// Destroys every variant and forgets every program.
    pub fn destroy_all<B: RenderBackend>(&mut self, backend: &mut B) {
        for program in self.programs.values_mut() {
            for (_, handle) in program.variants.drain() {
                backend.destroy_shader(handle);
            }
        }
        self.programs.clear();
        self.bound = None;
    }

    /// Total variants across all programs.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.programs.values().map(ShaderProgram::variant_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_key_packing() {
        let base = VariantParams::default();
        assert_eq!(base.key(), 0);
        assert_eq!(VariantParams { raytrace: true, ..base }.key(), 1);
        assert_eq!(VariantParams { filter: Filter::Linear, ..base }.key(), 2);
        assert_eq!(VariantParams { h_address: AddressMode::Clamp, ..base }.key(), 8);
        assert_eq!(VariantParams { v_address: AddressMode::Mirror, ..base }.key(), 12);
        assert_eq!(VariantParams { normal_map: true, ..base }.key(), 36);
        assert_eq!(VariantParams { specular_map: true, ..base }.key(), 72);

        let all = VariantParams {
            raytrace: true,
            filter: Filter::Linear,
            h_address: AddressMode::Clamp,
            v_address: AddressMode::Clamp,
            normal_map: true,
            specular_map: true,
        };
        assert_eq!(all.key(), 1 + 2 + 8 + 24 + 36 + 72);
    }

    #[test]
    fn test_decode_texel_and_inputs() {
        // Slot 0 = TEXEL0, slot 1 = INPUT_2, alpha group slot 0 = INPUT_1.
        let id = SHADER_TEXEL0 | (2 << 3) | (1 << 12);
        let info = ProgramInfo::decode(id);
        assert_eq!(info.num_inputs, 2);
        assert_eq!(info.used_textures, [true, false]);
        assert!(!info.uses_alpha());
        assert_eq!(info.vertex_stride(), 28 + 8 + 2 * 12);
    }

    #[test]
    fn test_decode_options() {
        let id = SHADER_TEXEL1 | SHADER_OPT_ALPHA | SHADER_OPT_FOG | (4 << 15);
        let info = ProgramInfo::decode(id);
        assert_eq!(info.used_textures, [false, true]);
        assert!(info.uses_alpha());
        assert!(info.uses_fog());
        assert_eq!(info.num_inputs, 4);
        assert_eq!(info.vertex_stride(), 28 + 8 + 4 * 16);
    }

    #[test]
    fn test_flags() {
        let params = VariantParams { normal_map: true, ..VariantParams::default() };
        let flags = params.flags();
        assert!(flags.contains(ShaderFlags::RASTER));
        assert!(flags.contains(ShaderFlags::NORMAL_MAP));
        assert!(!flags.contains(ShaderFlags::RAYTRACE));
    }
}
